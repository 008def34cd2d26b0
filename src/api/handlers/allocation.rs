//! Allocation handlers: manual allocation, the history-driven run, and
//! cleanup of unregistered allocations.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    AllocationQuery, CandidateQuery, CreateAllocationRequest, DeleteAllocationQuery, Paginated,
    PaginationParams, RunAllocationRequest, UpdateAllocationRequest,
};
use crate::app_state::AppState;
use crate::domain::{
    AllocationId, AllocationReport, AllocationRequest, Candidate, CleanupReport, SiteAllocation,
};
use crate::error::{ErrorResponse, FairError};
use crate::service::AllocationFilter;

const MANUAL_CREATOR: &str = "admin";

/// `POST /allocations`: Allocate an event site to a stallholder.
///
/// # Errors
///
/// Returns [`FairError`] if the event site is missing, not available, or
/// already allocated to this stallholder.
#[utoipa::path(
    post,
    path = "/api/v1/allocations",
    tag = "Allocations",
    summary = "Allocate a site",
    description = "Creates the allocation and moves the event site to `allocated` in one step.",
    request_body = CreateAllocationRequest,
    responses(
        (status = 201, description = "Allocation created", body = SiteAllocation),
        (status = 404, description = "Event site not found", body = ErrorResponse),
        (status = 409, description = "Site not available or already allocated", body = ErrorResponse),
    )
)]
pub async fn create_allocation(
    State(state): State<AppState>,
    Json(req): Json<CreateAllocationRequest>,
) -> Result<impl IntoResponse, FairError> {
    let allocation = state
        .allocation_service
        .allocate(AllocationRequest {
            event_site_id: req.event_site_id,
            stallholder_id: req.stallholder_id,
            registration_id: req.registration_id,
            on_hold: req.on_hold,
            created_by: req.created_by.unwrap_or_else(|| MANUAL_CREATOR.to_string()),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(allocation)))
}

/// `GET /allocations`: List allocations with pagination and filters.
#[utoipa::path(
    get,
    path = "/api/v1/allocations",
    tag = "Allocations",
    summary = "List allocations",
    params(AllocationQuery, PaginationParams),
    responses(
        (status = 200, description = "Paginated allocations", body = Paginated<SiteAllocation>),
    )
)]
pub async fn list_allocations(
    State(state): State<AppState>,
    Query(query): Query<AllocationQuery>,
    Query(page): Query<PaginationParams>,
) -> impl IntoResponse {
    let allocations = state
        .allocation_service
        .list_allocations(AllocationFilter {
            stallholder_id: query.stallholder_id,
            event_id: query.event_id,
            unregistered: query.unregistered,
        })
        .await;
    Json(Paginated::from_items(allocations, &page))
}

/// `GET /allocations/{id}`: Get one allocation.
///
/// # Errors
///
/// Returns [`FairError::NotFound`] for an unknown allocation.
#[utoipa::path(
    get,
    path = "/api/v1/allocations/{id}",
    tag = "Allocations",
    summary = "Get an allocation",
    params(("id" = uuid::Uuid, Path, description = "Allocation UUID")),
    responses(
        (status = 200, description = "Allocation", body = SiteAllocation),
        (status = 404, description = "Allocation not found", body = ErrorResponse),
    )
)]
pub async fn get_allocation(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, FairError> {
    let allocation = state
        .allocation_service
        .get_allocation(AllocationId::from_uuid(id))
        .await?;
    Ok(Json(allocation))
}

/// `PATCH /allocations/{id}`: Toggle the hold flag or link a registration.
///
/// # Errors
///
/// Returns [`FairError`] for an unknown allocation or a registration that
/// belongs to another stallholder.
#[utoipa::path(
    patch,
    path = "/api/v1/allocations/{id}",
    tag = "Allocations",
    summary = "Update an allocation",
    params(("id" = uuid::Uuid, Path, description = "Allocation UUID")),
    request_body = UpdateAllocationRequest,
    responses(
        (status = 200, description = "Allocation updated", body = SiteAllocation),
        (status = 400, description = "Registration belongs to another stallholder", body = ErrorResponse),
        (status = 404, description = "Allocation or registration not found", body = ErrorResponse),
    )
)]
pub async fn update_allocation(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<UpdateAllocationRequest>,
) -> Result<impl IntoResponse, FairError> {
    let allocation = state
        .allocation_service
        .update_allocation(AllocationId::from_uuid(id), req.on_hold, req.registration_id)
        .await?;
    Ok(Json(allocation))
}

/// `DELETE /allocations/{id}`: Remove an allocation.
///
/// # Errors
///
/// Returns [`FairError::DeleteBlocked`] unless the event site is still
/// `allocated` or `force` is set.
#[utoipa::path(
    delete,
    path = "/api/v1/allocations/{id}",
    tag = "Allocations",
    summary = "Remove an allocation",
    description = "Deletes the allocation and returns its event site to `available`. Sites past `allocated` need `force=true`.",
    params(
        ("id" = uuid::Uuid, Path, description = "Allocation UUID"),
        DeleteAllocationQuery,
    ),
    responses(
        (status = 200, description = "Removed allocation", body = SiteAllocation),
        (status = 404, description = "Allocation not found", body = ErrorResponse),
        (status = 409, description = "Event site is past allocation", body = ErrorResponse),
    )
)]
pub async fn delete_allocation(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Query(query): Query<DeleteAllocationQuery>,
) -> Result<impl IntoResponse, FairError> {
    let removed = state
        .allocation_service
        .deallocate(AllocationId::from_uuid(id), query.force)
        .await?;
    Ok(Json(removed))
}

/// `POST /allocations/run`: Allocate upcoming events from site history.
///
/// # Errors
///
/// Returns [`FairError::InvalidRequest`] for a zero lookback.
#[utoipa::path(
    post,
    path = "/api/v1/allocations/run",
    tag = "Allocations",
    summary = "Run the history-driven allocation",
    description = "Ranks stallholders by how many of the lookback years they held each site, then allocates every upcoming event in date order. Candidates that cannot be placed are reported as skipped.",
    request_body = RunAllocationRequest,
    responses(
        (status = 200, description = "Run report", body = AllocationReport),
        (status = 400, description = "Invalid lookback", body = ErrorResponse),
    )
)]
pub async fn run_allocation(
    State(state): State<AppState>,
    Json(req): Json<RunAllocationRequest>,
) -> Result<impl IntoResponse, FairError> {
    let report = state
        .allocation_service
        .run_allocation(req.as_of, req.lookback_years)
        .await?;
    Ok(Json(report))
}

/// `GET /allocations/candidates`: Preview the ranked candidates.
///
/// # Errors
///
/// Returns [`FairError::InvalidRequest`] for a zero lookback.
#[utoipa::path(
    get,
    path = "/api/v1/allocations/candidates",
    tag = "Allocations",
    summary = "Preview allocation candidates",
    params(CandidateQuery),
    responses(
        (status = 200, description = "Candidates in allocation order", body = Vec<Candidate>),
        (status = 400, description = "Invalid lookback", body = ErrorResponse),
    )
)]
pub async fn list_candidates(
    State(state): State<AppState>,
    Query(query): Query<CandidateQuery>,
) -> Result<impl IntoResponse, FairError> {
    let candidates = state
        .allocation_service
        .preview_candidates(query.as_of, query.lookback_years)
        .await?;
    Ok(Json(candidates))
}

/// `POST /allocations/cleanup`: Delete allocations without a registration.
///
/// # Errors
///
/// Returns [`FairError`] if the store rejects the command.
#[utoipa::path(
    post,
    path = "/api/v1/allocations/cleanup",
    tag = "Allocations",
    summary = "Delete unregistered allocations",
    description = "Removes every allocation with no linked registration whose event site is still `allocated`. Others are reported as failed.",
    responses(
        (status = 200, description = "Cleanup report", body = CleanupReport),
    )
)]
pub async fn cleanup_allocations(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, FairError> {
    let report = state.allocation_service.cleanup_unregistered().await?;
    Ok(Json(report))
}

/// Allocation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/allocations", post(create_allocation).get(list_allocations))
        .route("/allocations/run", post(run_allocation))
        .route("/allocations/candidates", get(list_candidates))
        .route("/allocations/cleanup", post(cleanup_allocations))
        .route(
            "/allocations/{id}",
            get(get_allocation)
                .patch(update_allocation)
                .delete(delete_allocation),
        )
}
