use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::capture::crop::PixelRect;
use crate::models::{ImageUri, PhotoDescriptor};

/// Outcome of a camera permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Platform camera.
#[async_trait]
pub trait Camera: Send + Sync {
    /// Prompts for (or re-checks) camera access.
    async fn request_permission(&self) -> PermissionStatus;

    /// Takes one still picture at `quality` (0.0 to 1.0).
    async fn capture(&self, quality: f32) -> Result<PhotoDescriptor, String>;
}

/// Platform photo library picker.
#[async_trait]
pub trait PhotoLibrary: Send + Sync {
    /// Lets the user pick one image. `Ok(None)` means the picker was cancelled.
    async fn pick(&self, quality: f32) -> Result<Option<PhotoDescriptor>, String>;
}

/// Crops and re-encodes images.
#[async_trait]
pub trait ImageEditor: Send + Sync {
    /// Writes `source` cropped to `rect` as a JPEG at `quality` (0.0 to 1.0)
    /// into volatile storage and returns its URI.
    async fn crop_and_compress(
        &self,
        source: &ImageUri,
        rect: PixelRect,
        quality: f32,
    ) -> io::Result<ImageUri>;
}

/// App-owned image storage.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Copies a volatile image into durable storage.
    ///
    /// An image that is already in durable storage is returned unchanged.
    async fn persist(&self, volatile: &ImageUri) -> io::Result<ImageUri>;

    /// Best-effort removal of an image that is no longer referenced.
    async fn release(&self, uri: &ImageUri);
}

/// [`ImageEditor`] backed by the `image` crate.
///
/// Cropped files are written to `cache_dir` with a random name.
#[derive(Debug, Clone)]
pub struct JpegImageEditor {
    cache_dir: PathBuf,
}

impl JpegImageEditor {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }
}

#[async_trait]
impl ImageEditor for JpegImageEditor {
    async fn crop_and_compress(
        &self,
        source: &ImageUri,
        rect: PixelRect,
        quality: f32,
    ) -> io::Result<ImageUri> {
        let source_path = source.to_path();
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let target = self.cache_dir.join(format!("crop_{}.jpg", Uuid::new_v4()));
        let jpeg_quality = (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8;

        let written = target.clone();
        let job = move || crop_to_jpeg(&source_path, &written, rect, jpeg_quality);
        tokio::task::spawn_blocking(job)
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;

        Ok(ImageUri::from_path(&target))
    }
}

fn crop_to_jpeg(source: &Path, target: &Path, rect: PixelRect, quality: u8) -> io::Result<()> {
    let image = image::open(source).map_err(to_io_error)?;
    if rect.width == 0
        || rect.height == 0
        || rect.x + rect.width > image.width()
        || rect.y + rect.height > image.height()
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "crop {}x{}+{}+{} outside {}x{} image",
                rect.width,
                rect.height,
                rect.x,
                rect.y,
                image.width(),
                image.height()
            ),
        ));
    }

    let cropped = image.crop_imm(rect.x, rect.y, rect.width, rect.height);
    let rgb = image::DynamicImage::ImageRgb8(cropped.to_rgb8());

    let file = std::fs::File::create(target)?;
    let mut writer = BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    rgb.write_with_encoder(encoder).map_err(to_io_error)?;
    writer.flush()
}

fn to_io_error(err: image::ImageError) -> io::Error {
    match err {
        image::ImageError::IoError(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

/// [`FileStore`] that copies images into a local directory.
///
/// Releasing only ever deletes files under the configured volatile (cache)
/// directory or under the durable directory itself; anything else is left
/// alone.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    durable_dir: PathBuf,
    volatile_dir: PathBuf,
}

impl LocalFileStore {
    pub fn new(durable_dir: impl Into<PathBuf>, volatile_dir: impl Into<PathBuf>) -> Self {
        Self {
            durable_dir: durable_dir.into(),
            volatile_dir: volatile_dir.into(),
        }
    }

    pub fn durable_dir(&self) -> &Path {
        &self.durable_dir
    }

    fn is_durable(&self, path: &Path) -> bool {
        !has_parent_dir(path) && path.starts_with(&self.durable_dir)
    }

    fn owns(&self, path: &Path) -> bool {
        self.is_durable(path) || (!has_parent_dir(path) && path.starts_with(&self.volatile_dir))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn persist(&self, volatile: &ImageUri) -> io::Result<ImageUri> {
        let source = volatile.to_path();
        if !tokio::fs::try_exists(&source).await? {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("image not found: {}", source.display()),
            ));
        }

        if self.is_durable(&source) {
            return Ok(volatile.clone());
        }

        tokio::fs::create_dir_all(&self.durable_dir).await?;

        let file_name = volatile
            .file_name()
            .unwrap_or_else(|| format!("image_{}.jpg", chrono::Utc::now().timestamp_millis()));
        let target = unique_target(&self.durable_dir, &file_name).await?;

        tokio::fs::copy(&source, &target).await?;
        info!("Image copied to: {}", target.display());
        Ok(ImageUri::from_path(&target))
    }

    async fn release(&self, uri: &ImageUri) {
        let path = uri.to_path();
        if !self.owns(&path) {
            return;
        }
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Could not remove {}: {}", path.display(), e);
            }
        }
    }
}

fn has_parent_dir(path: &Path) -> bool {
    path.components().any(|c| c == Component::ParentDir)
}

/// `dir/name.ext`, or `dir/name_<n>.ext` for the first free `n`.
async fn unique_target(dir: &Path, file_name: &str) -> io::Result<PathBuf> {
    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());
    let ext = name
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "jpg".to_string());

    let mut candidate = dir.join(format!("{stem}.{ext}"));
    let mut counter = 1;
    while tokio::fs::try_exists(&candidate).await? {
        candidate = dir.join(format!("{stem}_{counter}.{ext}"));
        counter += 1;
    }
    Ok(candidate)
}
