//! BillSnap core: capture, crop and record bills.
//!
//! The capture workflow lives in [`capture`], uncommitted form state in
//! [`draft`], and the committed bills in [`store`]. [`api`] exposes the
//! collection to a UI shell over HTTP and [`sync`] mirrors it to a remote
//! Postgres database.

pub mod api;
pub mod capture;
pub mod config;
pub mod dates;
pub mod db;
pub mod draft;
pub mod error;
pub mod models;
pub mod store;
pub mod sync;

pub use capture::{CapturePlatform, CaptureSession, CaptureState};
pub use draft::{BillDraft, DraftField, FieldError, SubmitOutcome};
pub use error::{CaptureError, ConfigError, SubmitError};
pub use models::{Bill, Category, CategoryKind, ImageUri, PhotoDescriptor};
pub use store::{BillCollection, SpendSummary};
