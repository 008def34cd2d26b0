//! Food licence and licence batch handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    CreateBatchRequest, CreateLicenceRequest, LicenceQuery, LicenceTransitionRequest,
};
use crate::app_state::AppState;
use crate::domain::{FoodLicence, FoodLicenceBatch, LicenceBatchId, LicenceId};
use crate::error::{ErrorResponse, FairError};

/// `POST /licences`: Request a food licence.
///
/// # Errors
///
/// Returns [`FairError::InvalidRequest`] if the registration does not sell
/// food.
#[utoipa::path(
    post,
    path = "/api/v1/licences",
    tag = "Food Licences",
    summary = "Request a food licence",
    request_body = CreateLicenceRequest,
    responses(
        (status = 201, description = "Licence requested", body = FoodLicence),
        (status = 400, description = "Registration does not sell food", body = ErrorResponse),
        (status = 404, description = "Registration not found", body = ErrorResponse),
    )
)]
pub async fn create_licence(
    State(state): State<AppState>,
    Json(req): Json<CreateLicenceRequest>,
) -> Result<impl IntoResponse, FairError> {
    let licence = state
        .registration_service
        .create_licence(req.registration_id)
        .await?;
    Ok((StatusCode::CREATED, Json(licence)))
}

/// `GET /licences`: List food licences.
#[utoipa::path(
    get,
    path = "/api/v1/licences",
    tag = "Food Licences",
    summary = "List food licences",
    params(LicenceQuery),
    responses(
        (status = 200, description = "Matching licences", body = Vec<FoodLicence>),
    )
)]
pub async fn list_licences(
    State(state): State<AppState>,
    Query(query): Query<LicenceQuery>,
) -> impl IntoResponse {
    Json(state.registration_service.list_licences(query.status).await)
}

/// `GET /licences/{id}`: Get one licence.
///
/// # Errors
///
/// Returns [`FairError::NotFound`] for an unknown licence.
#[utoipa::path(
    get,
    path = "/api/v1/licences/{id}",
    tag = "Food Licences",
    summary = "Get a food licence",
    params(("id" = uuid::Uuid, Path, description = "Licence UUID")),
    responses(
        (status = 200, description = "Licence", body = FoodLicence),
        (status = 404, description = "Licence not found", body = ErrorResponse),
    )
)]
pub async fn get_licence(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, FairError> {
    let licence = state
        .registration_service
        .get_licence(LicenceId::from_uuid(id))
        .await?;
    Ok(Json(licence))
}

/// `POST /licences/{id}/transitions`: Move a licence.
///
/// # Errors
///
/// Returns [`FairError::InvalidTransition`] for an edge the licence
/// machine does not have.
#[utoipa::path(
    post,
    path = "/api/v1/licences/{id}/transitions",
    tag = "Food Licences",
    summary = "Transition a food licence",
    description = "Applies a named licence transition. Approval tries to book the registration.",
    params(("id" = uuid::Uuid, Path, description = "Licence UUID")),
    request_body = LicenceTransitionRequest,
    responses(
        (status = 200, description = "Transition applied", body = FoodLicence),
        (status = 404, description = "Licence not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed", body = ErrorResponse),
    )
)]
pub async fn transition_licence(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<LicenceTransitionRequest>,
) -> Result<impl IntoResponse, FairError> {
    let licence = state
        .registration_service
        .transition_licence(LicenceId::from_uuid(id), req.transition)
        .await?;
    Ok(Json(licence))
}

/// `POST /licence-batches`: Batch every created licence.
///
/// # Errors
///
/// Returns [`FairError::InvalidRequest`] for a malformed address or when
/// no licence is waiting.
#[utoipa::path(
    post,
    path = "/api/v1/licence-batches",
    tag = "Food Licences",
    summary = "Create a licence batch",
    request_body = CreateBatchRequest,
    responses(
        (status = 201, description = "Batch created", body = FoodLicenceBatch),
        (status = 400, description = "Invalid address or nothing to batch", body = ErrorResponse),
    )
)]
pub async fn create_batch(
    State(state): State<AppState>,
    Json(req): Json<CreateBatchRequest>,
) -> Result<impl IntoResponse, FairError> {
    let batch = state
        .registration_service
        .batch_licences(req.recipient_email)
        .await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

/// `GET /licence-batches`: List licence batches.
#[utoipa::path(
    get,
    path = "/api/v1/licence-batches",
    tag = "Food Licences",
    summary = "List licence batches",
    responses(
        (status = 200, description = "All batches", body = Vec<FoodLicenceBatch>),
    )
)]
pub async fn list_batches(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registration_service.list_batches().await)
}

/// `POST /licence-batches/{id}/submit`: Send a batch to the council.
///
/// # Errors
///
/// Returns [`FairError::NotFound`] for an unknown batch and
/// [`FairError::InvalidRequest`] if it was already sent.
#[utoipa::path(
    post,
    path = "/api/v1/licence-batches/{id}/submit",
    tag = "Food Licences",
    summary = "Submit a licence batch",
    params(("id" = uuid::Uuid, Path, description = "Batch UUID")),
    responses(
        (status = 200, description = "Batch submitted", body = FoodLicenceBatch),
        (status = 400, description = "Batch already sent", body = ErrorResponse),
        (status = 404, description = "Batch not found", body = ErrorResponse),
    )
)]
pub async fn submit_batch(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, FairError> {
    let batch = state
        .registration_service
        .submit_batch(LicenceBatchId::from_uuid(id))
        .await?;
    Ok(Json(batch))
}

/// Food licence routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/licences", post(create_licence).get(list_licences))
        .route("/licences/{id}", get(get_licence))
        .route("/licences/{id}/transitions", post(transition_licence))
        .route("/licence-batches", post(create_batch).get(list_batches))
        .route("/licence-batches/{id}/submit", post(submit_batch))
}
