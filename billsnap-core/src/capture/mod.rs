//! Bill capture workflow.
//!
//! Camera access and photo capture, the interactive crop rectangle, image
//! services, and the session that drives a capture from "Scan Bill" to a
//! committed bill.

pub mod controller;
pub mod crop;
pub mod services;
pub mod session;
pub mod state_machine;

pub use controller::{CameraAccess, CaptureController};
pub use crop::{
    CropRect, CropRegion, DisplaySize, DragHandle, Edge, PixelRect, Point, PointerEvent,
};
pub use services::{
    Camera, FileStore, ImageEditor, JpegImageEditor, LocalFileStore, PermissionStatus, PhotoLibrary,
};
pub use session::{CapturePlatform, CaptureSession, Controls};
pub use state_machine::{CaptureEvent, CaptureState, CaptureStateMachine, Transition};
