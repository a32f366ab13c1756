use thiserror::Error;

use crate::capture::state_machine::CaptureState;
use crate::draft::FieldError;

/// Errors raised by the capture workflow.
///
/// Every variant is recoverable from the UI's point of view: the session keeps
/// its current state (photo, crop rectangle, draft) and the triggering control
/// is simply offered again.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Camera access was refused. The session is blocked until the user retries.
    #[error("camera permission denied")]
    PermissionDenied,

    /// The requested operation is not available in the current workflow state.
    #[error("operation `{operation}` not allowed in state {state}")]
    InvalidState {
        operation: &'static str,
        state: CaptureState,
    },

    /// The platform camera failed to produce a photo.
    #[error("camera capture failed: {0}")]
    Camera(String),

    /// The photo library failed while picking an image.
    #[error("photo library failed: {0}")]
    Library(String),

    /// Cropping or compressing the source image failed.
    #[error("crop failed: {0}")]
    Crop(#[source] std::io::Error),

    /// Copying the image into durable storage failed.
    #[error("could not persist image: {0}")]
    Persist(#[source] std::io::Error),
}

/// Why a draft could not be committed from the capture workflow.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// One or more fields failed validation; the draft keeps its values.
    #[error("bill draft has {} invalid field(s)", .0.len())]
    Invalid(Vec<FieldError>),

    #[error(transparent)]
    Workflow(#[from] CaptureError),
}

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
