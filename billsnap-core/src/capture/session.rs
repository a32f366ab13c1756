use std::sync::Arc;
use tracing::{error, info, warn};

use crate::capture::controller::CaptureController;
use crate::capture::crop::{CropRegion, DisplaySize};
use crate::capture::services::{Camera, FileStore, ImageEditor, PermissionStatus, PhotoLibrary};
use crate::capture::state_machine::{CaptureEvent, CaptureState, CaptureStateMachine, Transition};
use crate::draft::{BillDraft, SubmitOutcome};
use crate::error::{CaptureError, SubmitError};
use crate::models::{Bill, ImageUri};
use crate::store::BillCollection;

/// Quality requested from the photo library picker.
pub const UPLOAD_QUALITY: f32 = 0.7;

/// Platform services used by a capture session.
#[derive(Clone)]
pub struct CapturePlatform {
    pub camera: Arc<dyn Camera>,
    pub library: Arc<dyn PhotoLibrary>,
    pub editor: Arc<dyn ImageEditor>,
    pub files: Arc<dyn FileStore>,
}

/// Which controls the UI should offer right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub scan: bool,
    pub upload: bool,
    pub retry_permission: bool,
    pub capture: bool,
    pub retake: bool,
    pub confirm: bool,
    pub submit: bool,
}

/// One bill capture, from "Scan Bill" (or "Upload Bill") to a committed bill.
///
/// Async steps take `&mut self`, so a second capture or confirm cannot start
/// while one is in flight. Failures leave the session in the state it was in
/// before the step, ready for a manual retry. [`CaptureSession::cancel`] is the
/// only teardown path.
pub struct CaptureSession {
    platform: CapturePlatform,
    state: CaptureState,
    display: DisplaySize,
    controller: CaptureController,
    crop: Option<CropRegion>,
    draft: Option<BillDraft>,
    /// Durable copy made for a new bill that has not been committed yet
    pending_image: Option<ImageUri>,
}

impl CaptureSession {
    /// Creates an idle session for a photo shown in `display`.
    pub fn new(platform: CapturePlatform, display: DisplaySize) -> Self {
        let controller = CaptureController::new(platform.camera.clone());
        Self {
            platform,
            state: CaptureStateMachine::initial_state(),
            display,
            controller,
            crop: None,
            draft: None,
            pending_image: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn controller(&self) -> &CaptureController {
        &self.controller
    }

    pub fn controls(&self) -> Controls {
        let state = self.state;
        Controls {
            scan: matches!(state, CaptureState::Idle | CaptureState::PermissionDenied),
            upload: state == CaptureState::Idle,
            retry_permission: state == CaptureState::PermissionDenied,
            capture: state == CaptureState::LivePreview,
            retake: state == CaptureState::Cropping,
            confirm: state == CaptureState::Cropping,
            submit: state == CaptureState::DraftEditing,
        }
    }

    /// Display size changed (e.g. rotation); an active crop starts over.
    pub fn set_display(&mut self, display: DisplaySize) {
        self.display = display;
        if let Some(crop) = self.crop.as_mut() {
            *crop = CropRegion::new(display);
        }
    }

    /// Starts a scan: prompts for camera access and opens the live preview.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError::PermissionDenied` when access is refused; the
    /// session is then blocked in `PermissionDenied` until
    /// [`CaptureSession::retry_permission`] succeeds.
    pub async fn start_scan(&mut self) -> Result<CaptureState, CaptureError> {
        self.apply(CaptureEvent::ScanRequested, "start_scan")?;

        match self.controller.request_access().await {
            PermissionStatus::Granted => self.apply(CaptureEvent::PermissionGranted, "start_scan"),
            PermissionStatus::Denied => {
                self.apply(CaptureEvent::PermissionDenied, "start_scan")?;
                Err(CaptureError::PermissionDenied)
            }
        }
    }

    /// Retry affordance shown while blocked on a denied permission.
    pub async fn retry_permission(&mut self) -> Result<CaptureState, CaptureError> {
        self.ensure(CaptureEvent::ScanRequested, "retry_permission")?;
        if self.state != CaptureState::PermissionDenied {
            return Err(self.invalid("retry_permission"));
        }
        self.start_scan().await
    }

    /// Takes a photo and places the default crop rectangle over it.
    ///
    /// On failure the session stays in live preview.
    pub async fn capture(&mut self) -> Result<CaptureState, CaptureError> {
        self.ensure(CaptureEvent::PhotoCaptured, "capture")?;

        self.controller.capture().await?;
        self.apply(CaptureEvent::PhotoCaptured, "capture")?;

        self.crop = Some(CropRegion::new(self.display));
        self.apply(CaptureEvent::CropReady, "capture")
    }

    /// Discards the photo and its crop rectangle, back to live preview.
    pub async fn retake(&mut self) -> Result<CaptureState, CaptureError> {
        self.ensure(CaptureEvent::Retake, "retake")?;

        self.crop = None;
        if let Some(photo) = self.controller.retake() {
            self.platform.files.release(&photo.uri).await;
        }
        self.apply(CaptureEvent::Retake, "retake")
    }

    /// Crop rectangle to drive with pointer events while cropping.
    pub fn crop_mut(&mut self) -> Option<&mut CropRegion> {
        if self.state != CaptureState::Cropping {
            return None;
        }
        self.crop.as_mut()
    }

    pub fn crop(&self) -> Option<&CropRegion> {
        self.crop.as_ref()
    }

    /// Crops the photo, stores it durably and opens a draft around it.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError::Crop` or `CaptureError::Persist` when a step
    /// fails; the session goes back to `Cropping` with photo and rectangle
    /// intact.
    pub async fn confirm_crop(&mut self) -> Result<ImageUri, CaptureError> {
        self.ensure(CaptureEvent::CropConfirmed, "confirm_crop")?;
        let photo = self.controller.photo().cloned();
        let (Some(photo), Some(region)) = (photo, self.crop.clone()) else {
            return Err(self.invalid("confirm_crop"));
        };

        self.apply(CaptureEvent::CropConfirmed, "confirm_crop")?;
        let result = region
            .confirm(&photo, self.platform.editor.as_ref(), self.platform.files.as_ref())
            .await;

        match result {
            Ok(durable) => {
                self.apply(CaptureEvent::SaveSucceeded, "confirm_crop")?;
                self.crop = None;
                self.controller.retake();
                self.platform.files.release(&photo.uri).await;
                self.pending_image = Some(durable.clone());
                self.draft = Some(BillDraft::with_image(durable.clone()));
                Ok(durable)
            }
            Err(e) => {
                error!("Error during cropping process: {}", e);
                self.apply(CaptureEvent::SaveFailed, "confirm_crop")?;
                Err(e)
            }
        }
    }

    /// Picks an image from the library, stores it durably and opens a draft.
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if the user closed the picker; the session stays idle.
    pub async fn upload(&mut self) -> Result<Option<ImageUri>, CaptureError> {
        self.ensure(CaptureEvent::UploadPicked, "upload")?;

        let picked = self.platform.library.pick(UPLOAD_QUALITY).await.map_err(|e| {
            error!("Error during image upload: {}", e);
            CaptureError::Library(e)
        })?;
        let Some(photo) = picked else {
            info!("Image picker cancelled");
            return Ok(None);
        };

        let durable = self.platform.files.persist(&photo.uri).await.map_err(|e| {
            error!("Failed to copy image to persistent storage: {}", e);
            CaptureError::Persist(e)
        })?;

        self.apply(CaptureEvent::UploadPicked, "upload")?;
        self.pending_image = Some(durable.clone());
        self.draft = Some(BillDraft::with_image(durable.clone()));
        Ok(Some(durable))
    }

    /// Opens an edit draft for an existing bill.
    pub fn edit_existing(&mut self, bill: &Bill) -> Result<CaptureState, CaptureError> {
        self.ensure(CaptureEvent::EditRequested, "edit_existing")?;
        self.pending_image = None;
        self.draft = Some(BillDraft::from_bill(bill));
        self.apply(CaptureEvent::EditRequested, "edit_existing")
    }

    pub fn draft(&self) -> Option<&BillDraft> {
        self.draft.as_ref()
    }

    /// Draft to fill in while in `DraftEditing`.
    pub fn draft_mut(&mut self) -> Option<&mut BillDraft> {
        if self.state != CaptureState::DraftEditing {
            return None;
        }
        self.draft.as_mut()
    }

    /// Validates the draft and commits it into `bills`.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError::Invalid` with every failing field; the draft and
    /// the collection are unchanged and the session stays in `DraftEditing`.
    pub fn submit(&mut self, bills: &mut BillCollection) -> Result<SubmitOutcome, SubmitError> {
        self.ensure(CaptureEvent::Submitted, "submit")?;
        let draft = self.draft.as_mut().ok_or_else(|| CaptureError::InvalidState {
            operation: "submit",
            state: self.state,
        })?;

        let outcome = draft.submit(bills).map_err(SubmitError::Invalid)?;

        self.apply(CaptureEvent::Submitted, "submit")?;
        self.draft = None;
        self.pending_image = None;
        Ok(outcome)
    }

    /// Abandons the session from any state.
    ///
    /// Drops photo, crop rectangle and draft, and releases every image file
    /// no bill refers to.
    pub async fn cancel(&mut self) {
        self.crop = None;
        self.draft = None;
        if let Some(photo) = self.controller.retake() {
            self.platform.files.release(&photo.uri).await;
        }
        if let Some(image) = self.pending_image.take() {
            self.platform.files.release(&image).await;
        }

        if self.state != CaptureState::Idle {
            info!("Capture session cancelled in state {}", self.state);
        }
        self.state = CaptureState::Idle;
    }

    fn ensure(
        &self,
        event: CaptureEvent,
        operation: &'static str,
    ) -> Result<CaptureState, CaptureError> {
        CaptureStateMachine::transition(self.state, event).ok_or_else(|| self.invalid(operation))
    }

    fn apply(
        &mut self,
        event: CaptureEvent,
        operation: &'static str,
    ) -> Result<CaptureState, CaptureError> {
        let next = self.ensure(event, operation)?;
        info!("Capture session: {} -> {} ({})", self.state, next, event);
        self.state = next;
        Ok(next)
    }

    fn invalid(&self, operation: &'static str) -> CaptureError {
        warn!("{} rejected in state {}", operation, self.state);
        CaptureError::InvalidState {
            operation,
            state: self.state,
        }
    }
}
