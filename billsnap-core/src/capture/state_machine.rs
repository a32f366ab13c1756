use serde::{Deserialize, Serialize};
use std::fmt;

/// Capture workflow state enumeration.
///
/// The workflow progresses through these states:
/// - Idle: no session in progress
/// - PermissionPending: waiting for the camera permission prompt
/// - PermissionDenied: access refused, blocked until the user retries
/// - LivePreview: camera preview is showing, capture is possible
/// - PhotoCaptured: a photo was taken (immediately moves on to cropping)
/// - Cropping: the crop rectangle is being adjusted
/// - Saving: crop + durable copy in flight
/// - DraftEditing: the user fills in bill fields
/// - Committed: the bill was saved (terminal for the session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    PermissionPending,
    PermissionDenied,
    LivePreview,
    PhotoCaptured,
    Cropping,
    Saving,
    DraftEditing,
    Committed,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureState::Idle => write!(f, "idle"),
            CaptureState::PermissionPending => write!(f, "permission_pending"),
            CaptureState::PermissionDenied => write!(f, "permission_denied"),
            CaptureState::LivePreview => write!(f, "live_preview"),
            CaptureState::PhotoCaptured => write!(f, "photo_captured"),
            CaptureState::Cropping => write!(f, "cropping"),
            CaptureState::Saving => write!(f, "saving"),
            CaptureState::DraftEditing => write!(f, "draft_editing"),
            CaptureState::Committed => write!(f, "committed"),
        }
    }
}

/// Events driving the capture workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    /// User tapped "Scan Bill"
    ScanRequested,

    PermissionGranted,

    PermissionDenied,

    /// Camera returned a photo
    PhotoCaptured,

    /// Default crop rectangle has been placed
    CropReady,

    /// User confirmed the crop rectangle
    CropConfirmed,

    /// Cropped image is in durable storage
    SaveSucceeded,

    /// Crop or copy failed
    SaveFailed,

    /// Photo discarded, back to the camera
    Retake,

    /// Image picked from the library and persisted
    UploadPicked,

    /// Existing bill opened for editing
    EditRequested,

    /// Draft passed validation and was committed
    Submitted,

    /// Back/close from anywhere
    Cancelled,
}

impl fmt::Display for CaptureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureEvent::ScanRequested => write!(f, "scan_requested"),
            CaptureEvent::PermissionGranted => write!(f, "permission_granted"),
            CaptureEvent::PermissionDenied => write!(f, "permission_denied"),
            CaptureEvent::PhotoCaptured => write!(f, "photo_captured"),
            CaptureEvent::CropReady => write!(f, "crop_ready"),
            CaptureEvent::CropConfirmed => write!(f, "crop_confirmed"),
            CaptureEvent::SaveSucceeded => write!(f, "save_succeeded"),
            CaptureEvent::SaveFailed => write!(f, "save_failed"),
            CaptureEvent::Retake => write!(f, "retake"),
            CaptureEvent::UploadPicked => write!(f, "upload_picked"),
            CaptureEvent::EditRequested => write!(f, "edit_requested"),
            CaptureEvent::Submitted => write!(f, "submitted"),
            CaptureEvent::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Trait for state transitions in the capture workflow.
pub trait Transition {
    /// Determines the next state for `event` in `current`.
    ///
    /// # Returns
    ///
    /// Returns `None` when the event is not accepted in that state.
    fn transition(current: CaptureState, event: CaptureEvent) -> Option<CaptureState>;

    /// State a fresh session starts in.
    fn initial_state() -> CaptureState {
        CaptureState::Idle
    }
}

/// Default transition table for the bill capture workflow.
///
/// - Idle -> PermissionPending (scan) or DraftEditing (upload / edit)
/// - PermissionPending -> LivePreview or PermissionDenied
/// - PermissionDenied -> PermissionPending (retry) or LivePreview (granted later)
/// - LivePreview -> PhotoCaptured -> Cropping
/// - Cropping -> Saving -> DraftEditing, or back to Cropping on failure
/// - Cropping -> LivePreview on retake
/// - DraftEditing -> Committed
/// - Any state -> Idle on cancel
pub struct CaptureStateMachine;

impl Transition for CaptureStateMachine {
    fn transition(current: CaptureState, event: CaptureEvent) -> Option<CaptureState> {
        use CaptureEvent as E;
        use CaptureState as S;

        if event == E::Cancelled {
            return Some(S::Idle);
        }

        match (current, event) {
            (S::Idle, E::ScanRequested) => Some(S::PermissionPending),
            (S::Idle, E::UploadPicked) => Some(S::DraftEditing),
            (S::Idle, E::EditRequested) => Some(S::DraftEditing),
            (S::PermissionPending, E::PermissionGranted) => Some(S::LivePreview),
            (S::PermissionPending, E::PermissionDenied) => Some(S::PermissionDenied),
            (S::PermissionDenied, E::ScanRequested) => Some(S::PermissionPending),
            (S::PermissionDenied, E::PermissionGranted) => Some(S::LivePreview),
            (S::LivePreview, E::PhotoCaptured) => Some(S::PhotoCaptured),
            (S::PhotoCaptured, E::CropReady) => Some(S::Cropping),
            (S::PhotoCaptured, E::Retake) => Some(S::LivePreview),
            (S::Cropping, E::Retake) => Some(S::LivePreview),
            (S::Cropping, E::CropConfirmed) => Some(S::Saving),
            (S::Saving, E::SaveSucceeded) => Some(S::DraftEditing),
            (S::Saving, E::SaveFailed) => Some(S::Cropping),
            (S::DraftEditing, E::Submitted) => Some(S::Committed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn next(state: CaptureState, event: CaptureEvent) -> Option<CaptureState> {
        CaptureStateMachine::transition(state, event)
    }

    #[test]
    fn test_happy_path_scan_to_commit() {
        let mut state = CaptureStateMachine::initial_state();
        for event in [
            CaptureEvent::ScanRequested,
            CaptureEvent::PermissionGranted,
            CaptureEvent::PhotoCaptured,
            CaptureEvent::CropReady,
            CaptureEvent::CropConfirmed,
            CaptureEvent::SaveSucceeded,
            CaptureEvent::Submitted,
        ] {
            state = next(state, event).unwrap_or_else(|| panic!("{event} rejected in {state}"));
        }
        assert_eq!(state, CaptureState::Committed);
    }

    #[test]
    fn test_denied_permission_can_be_granted_later() {
        let denied = next(CaptureState::PermissionPending, CaptureEvent::PermissionDenied);
        assert_eq!(denied, Some(CaptureState::PermissionDenied));
        assert!(next(CaptureState::PermissionDenied, CaptureEvent::PhotoCaptured).is_none());
        assert_eq!(
            next(CaptureState::PermissionDenied, CaptureEvent::PermissionGranted),
            Some(CaptureState::LivePreview)
        );
    }

    #[test]
    fn test_save_failure_returns_to_cropping() {
        assert_eq!(
            next(CaptureState::Saving, CaptureEvent::SaveFailed),
            Some(CaptureState::Cropping)
        );
    }

    #[test]
    fn test_cancel_from_every_state_goes_idle() {
        for state in [
            CaptureState::Idle,
            CaptureState::PermissionPending,
            CaptureState::PermissionDenied,
            CaptureState::LivePreview,
            CaptureState::PhotoCaptured,
            CaptureState::Cropping,
            CaptureState::Saving,
            CaptureState::DraftEditing,
            CaptureState::Committed,
        ] {
            assert_eq!(next(state, CaptureEvent::Cancelled), Some(CaptureState::Idle));
        }
    }

    #[test]
    fn test_committed_is_terminal() {
        assert!(next(CaptureState::Committed, CaptureEvent::Submitted).is_none());
        assert!(next(CaptureState::Committed, CaptureEvent::ScanRequested).is_none());
    }
}
