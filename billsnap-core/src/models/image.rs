use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

const FILE_SCHEME: &str = "file://";

/// Handle to an image file, in `file://` URI form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageUri(String);

impl ImageUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn from_path(path: &Path) -> Self {
        Self(format!("{FILE_SCHEME}{}", path.display()))
    }

    /// Local filesystem path behind the URI. Bare paths are accepted as-is.
    pub fn to_path(&self) -> PathBuf {
        PathBuf::from(self.0.strip_prefix(FILE_SCHEME).unwrap_or(&self.0))
    }

    /// Last path segment, if any.
    pub fn file_name(&self) -> Option<String> {
        self.to_path()
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .filter(|name| !name.is_empty())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ImageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A freshly captured (or picked) photo, still in volatile storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoDescriptor {
    pub uri: ImageUri,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,
}
