use std::sync::Arc;
use tracing::{error, info, warn};

use crate::capture::services::{Camera, PermissionStatus};
use crate::error::CaptureError;
use crate::models::PhotoDescriptor;

/// Quality passed to the camera for bill photos.
pub const CAPTURE_QUALITY: f32 = 0.5;

/// Camera access as last reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraAccess {
    Unknown,
    Granted,
    Denied,
}

/// Mediates camera access and holds the most recent photo.
///
/// Nothing here is persisted; the photo stays in volatile storage until the
/// crop is confirmed.
pub struct CaptureController {
    camera: Arc<dyn Camera>,
    access: CameraAccess,
    photo: Option<PhotoDescriptor>,
}

impl CaptureController {
    pub fn new(camera: Arc<dyn Camera>) -> Self {
        Self {
            camera,
            access: CameraAccess::Unknown,
            photo: None,
        }
    }

    pub fn access(&self) -> CameraAccess {
        self.access
    }

    pub fn photo(&self) -> Option<&PhotoDescriptor> {
        self.photo.as_ref()
    }

    /// Asks the platform for camera access.
    ///
    /// A grant is remembered for the controller's lifetime, so later scans do
    /// not prompt again. A denial is never retried automatically.
    pub async fn request_access(&mut self) -> PermissionStatus {
        if self.access == CameraAccess::Granted {
            return PermissionStatus::Granted;
        }

        let status = self.camera.request_permission().await;
        self.access = match status {
            PermissionStatus::Granted => {
                info!("Camera permission granted");
                CameraAccess::Granted
            }
            PermissionStatus::Denied => {
                warn!("Camera permission denied");
                CameraAccess::Denied
            }
        };
        status
    }

    /// Takes a still photo at [`CAPTURE_QUALITY`].
    ///
    /// # Errors
    ///
    /// Returns `CaptureError::PermissionDenied` without touching the camera if
    /// access was not granted, and `CaptureError::Camera` if the platform
    /// call fails. In both cases any previous photo is kept as it was.
    pub async fn capture(&mut self) -> Result<&PhotoDescriptor, CaptureError> {
        if self.access != CameraAccess::Granted {
            return Err(CaptureError::PermissionDenied);
        }

        match self.camera.capture(CAPTURE_QUALITY).await {
            Ok(photo) => {
                info!("Captured photo {} ({}x{})", photo.uri, photo.width, photo.height);
                Ok(&*self.photo.insert(photo))
            }
            Err(e) => {
                error!("Error taking photo: {}", e);
                Err(CaptureError::Camera(e))
            }
        }
    }

    /// Drops the current photo and hands it back so its file can be released.
    pub fn retake(&mut self) -> Option<PhotoDescriptor> {
        self.photo.take()
    }
}
