use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::capture::{CropRect, CropRegion, DisplaySize, FileStore, ImageEditor};
use crate::draft::{BillDraft, DraftField, FieldError, SubmitOutcome};
use crate::error::CaptureError;
use crate::models::{Bill, ImageUri, PhotoDescriptor};
use crate::store::{BillCollection, CategoryTotal, SpendSummary};
use crate::sync::{spawn_upsert, RemoteBills};

/// Remote mirror used after each commit.
#[derive(Clone)]
pub struct RemoteMirror {
    pub bills: Arc<dyn RemoteBills>,
    pub merchant_id: String,
}

/// Application state shared by the route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Committed bills for this session
    pub bills: Arc<RwLock<BillCollection>>,

    pub monthly_budget: Decimal,

    /// Durable image storage; every committed bill points into it
    pub files: Arc<dyn FileStore>,

    pub editor: Arc<dyn ImageEditor>,

    /// `None` when remote sync is not configured
    pub remote: Option<RemoteMirror>,
}

impl AppState {
    pub fn new(
        bills: Arc<RwLock<BillCollection>>,
        monthly_budget: Decimal,
        files: Arc<dyn FileStore>,
        editor: Arc<dyn ImageEditor>,
    ) -> Self {
        Self {
            bills,
            monthly_budget,
            files,
            editor,
            remote: None,
        }
    }

    pub fn with_remote(mut self, remote: RemoteMirror) -> Self {
        self.remote = Some(remote);
        self
    }

    fn mirror(&self, bill: &Bill) {
        if let Some(remote) = &self.remote {
            spawn_upsert(remote.bills.clone(), remote.merchant_id.clone(), bill.clone());
        }
    }

    /// Moves the image named by `input` into durable storage.
    ///
    /// On success `input.image_uri` points at the durable file. A file that
    /// does not exist is cleared from `input`, so validation reports it as a
    /// missing image together with any other bad field.
    ///
    /// # Returns
    ///
    /// Returns the new copy, or `None` when no copy was made.
    async fn durable_image(&self, input: &mut DraftInput) -> Result<Option<ImageUri>, ApiError> {
        let Some(raw) = input.image_uri.as_deref().map(str::trim) else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }

        let source = ImageUri::new(raw);
        match self.files.persist(&source).await {
            Ok(durable) if durable == source => Ok(None),
            Ok(durable) => {
                input.image_uri = Some(durable.to_string());
                Ok(Some(durable))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Bill image {} does not exist", source);
                input.image_uri = Some(String::new());
                Ok(None)
            }
            Err(e) => {
                error!("Failed to copy {} to durable storage: {}", source, e);
                Err(ApiError::Storage(e.to_string()))
            }
        }
    }

    async fn discard(&self, copy: Option<ImageUri>) {
        if let Some(copy) = copy {
            self.files.release(&copy).await;
        }
    }
}

/// Form fields as sent by the UI shell.
///
/// Values are raw input and go through the same draft as an on-device form.
/// A missing field is empty for a new bill and unchanged for an edit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftInput {
    pub image_uri: Option<String>,
    pub store_name: Option<String>,
    pub date: Option<String>,
    pub category: Option<String>,
    pub other_category: Option<String>,
    pub tax_paid: Option<String>,
    pub total: Option<String>,
}

impl DraftInput {
    fn apply(&self, draft: &mut BillDraft) {
        let fields = [
            (DraftField::Image, &self.image_uri),
            (DraftField::StoreName, &self.store_name),
            (DraftField::Date, &self.date),
            (DraftField::Category, &self.category),
            (DraftField::OtherCategory, &self.other_category),
            (DraftField::TaxPaid, &self.tax_paid),
            (DraftField::Total, &self.total),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                draft.set_field(field, value);
            }
        }
    }
}

/// One entry of a 422 response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldErrorBody {
    pub field: DraftField,
    pub error: FieldError,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub summary: SpendSummary,
    pub by_category: Vec<CategoryTotal>,
}

/// Body of `POST /api/images/crop`.
#[derive(Debug, Clone, Deserialize)]
pub struct CropRequest {
    pub photo: PhotoDescriptor,
    /// Area the photo was shown in while the user adjusted `rect`
    pub display: DisplaySize,
    pub rect: CropRect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropResponse {
    pub image_uri: ImageUri,
}

/// Failures surfaced by the bill routes.
#[derive(Debug)]
pub enum ApiError {
    NotFound(Uuid),
    Invalid(Vec<FieldError>),
    /// The request named an image or crop that cannot be used
    Unprocessable(String),
    Storage(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(id) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": format!("bill {} not found", id) })),
            )
                .into_response(),
            ApiError::Invalid(errors) => {
                let errors: Vec<FieldErrorBody> = errors
                    .into_iter()
                    .map(|error| FieldErrorBody {
                        field: error.field(),
                        error,
                        message: error.message().to_string(),
                    })
                    .collect();
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(serde_json::json!({ "errors": errors })),
                )
                    .into_response()
            }
            ApiError::Unprocessable(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({ "error": message })),
            )
                .into_response(),
            ApiError::Storage(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": message })),
            )
                .into_response(),
        }
    }
}

impl From<CaptureError> for ApiError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::Crop(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound
                        | io::ErrorKind::InvalidInput
                        | io::ErrorKind::InvalidData
                ) =>
            {
                ApiError::Unprocessable(format!("crop failed: {}", e))
            }
            other => ApiError::Storage(other.to_string()),
        }
    }
}

/// Health check endpoint.
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "billsnap-core",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Lists committed bills, newest first.
async fn list_bills(State(state): State<AppState>) -> Json<Vec<Bill>> {
    Json(state.bills.read().await.sorted_by_date_desc())
}

async fn get_bill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Bill>, ApiError> {
    state
        .bills
        .read()
        .await
        .get(id)
        .cloned()
        .map(Json)
        .ok_or(ApiError::NotFound(id))
}

/// Validates a new bill and commits it.
///
/// The image is copied into durable storage first unless it already lives
/// there.
///
/// # Returns
///
/// Returns `201 Created` with the bill, or `422` listing every failing field.
async fn create_bill(
    State(state): State<AppState>,
    Json(mut input): Json<DraftInput>,
) -> Result<(StatusCode, Json<Bill>), ApiError> {
    let copy = state.durable_image(&mut input).await?;

    let mut draft = BillDraft::new();
    input.apply(&mut draft);

    let submitted = {
        let mut bills = state.bills.write().await;
        draft.submit(&mut bills)
    };
    let outcome = match submitted {
        Ok(outcome) => outcome,
        Err(errors) => {
            state.discard(copy).await;
            return Err(ApiError::Invalid(errors));
        }
    };

    let bill = outcome.into_bill();
    info!("Created bill {} via HTTP", bill.id);
    state.mirror(&bill);
    Ok((StatusCode::CREATED, Json(bill)))
}

/// Applies an edit draft to an existing bill.
///
/// A replaced image is released once the edit is committed.
async fn update_bill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut input): Json<DraftInput>,
) -> Result<Json<Bill>, ApiError> {
    if state.bills.read().await.get(id).is_none() {
        return Err(ApiError::NotFound(id));
    }
    let copy = state.durable_image(&mut input).await?;

    let mut bills = state.bills.write().await;
    let Some(existing) = bills.get(id) else {
        drop(bills);
        state.discard(copy).await;
        return Err(ApiError::NotFound(id));
    };
    let previous_image = existing.image_uri.clone();

    let mut draft = BillDraft::from_bill(existing);
    input.apply(&mut draft);
    let submitted = draft.submit(&mut bills);
    drop(bills);

    match submitted {
        Ok(SubmitOutcome::Updated(bill)) => {
            if bill.image_uri != previous_image {
                state.files.release(&previous_image).await;
            }
            state.mirror(&bill);
            Ok(Json(bill))
        }
        Ok(outcome) => {
            warn!("Edit of bill {} did not update it", outcome.bill().id);
            state.discard(copy).await;
            Err(ApiError::NotFound(id))
        }
        Err(errors) => {
            state.discard(copy).await;
            Err(ApiError::Invalid(errors))
        }
    }
}

/// Crops a captured photo and stores the result durably.
///
/// The UI shell drives the crop rectangle and sends the final one here. The
/// returned URI goes into the `image_uri` of a new bill.
///
/// # Returns
///
/// Returns `201 Created` with the durable image URI, or `422` when the
/// rectangle or photo cannot be used.
async fn crop_image(
    State(state): State<AppState>,
    Json(request): Json<CropRequest>,
) -> Result<(StatusCode, Json<CropResponse>), ApiError> {
    let region = CropRegion::with_rect(request.display, request.rect).ok_or_else(|| {
        ApiError::Unprocessable("crop rectangle must lie inside the display".to_string())
    })?;

    let image_uri = region
        .confirm(&request.photo, state.editor.as_ref(), state.files.as_ref())
        .await?;
    state.files.release(&request.photo.uri).await;

    Ok((StatusCode::CREATED, Json(CropResponse { image_uri })))
}

async fn delete_bill(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    if state.bills.write().await.remove(id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Budget card figures plus per-category totals.
async fn summary(State(state): State<AppState>) -> Json<SummaryResponse> {
    let bills = state.bills.read().await;
    Json(SummaryResponse {
        summary: bills.summary(state.monthly_budget),
        by_category: bills.totals_by_category(),
    })
}

/// Creates the application router.
///
/// # Arguments
///
/// * `state` - Shared bill collection, image services and optional remote mirror
///
/// # Returns
///
/// Returns a configured Axum Router with tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/bills", get(list_bills).post(create_bill))
        .route("/api/bills/:id", get(get_bill).put(update_bill).delete(delete_bill))
        .route("/api/images/crop", post(crop_image))
        .route("/api/summary", get(summary))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
