//! Inventory handlers: zones, sites, fairs, events, event sites, and site
//! history.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    CreateEventRequest, CreateEventSiteRequest, CreateFairRequest, CreateSiteRequest,
    CreateZoneRequest, EventQuery, EventSiteDetail, EventSiteQuery, HistoryQuery, Paginated,
    PaginationParams, RebuildHistoryRequest, RecordHistoryRequest, SiteQuery,
    SiteTransitionRequest,
};
use crate::app_state::AppState;
use crate::domain::machine::available;
use crate::domain::{
    Event, EventId, EventSite, EventSiteId, Fair, HistoryRebuild, HistoryRecord, Site,
    SiteHistory, SiteTransition, Zone,
};
use crate::error::{ErrorResponse, FairError};
use crate::service::EventSiteFilter;

/// `POST /zones`: Create a zone.
///
/// # Errors
///
/// Returns [`FairError::InvalidRequest`] for an empty name.
#[utoipa::path(
    post,
    path = "/api/v1/zones",
    tag = "Inventory",
    summary = "Create a zone",
    request_body = CreateZoneRequest,
    responses(
        (status = 201, description = "Zone created", body = Zone),
        (status = 400, description = "Invalid request", body = ErrorResponse),
    )
)]
pub async fn create_zone(
    State(state): State<AppState>,
    Json(req): Json<CreateZoneRequest>,
) -> Result<impl IntoResponse, FairError> {
    let zone = state.allocation_service.create_zone(&req.name).await?;
    Ok((StatusCode::CREATED, Json(zone)))
}

/// `GET /zones`: List zones.
#[utoipa::path(
    get,
    path = "/api/v1/zones",
    tag = "Inventory",
    summary = "List zones",
    responses(
        (status = 200, description = "All zones", body = Vec<Zone>),
    )
)]
pub async fn list_zones(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.allocation_service.list_zones().await)
}

/// `POST /sites`: Create a site.
///
/// # Errors
///
/// Returns [`FairError`] for an empty name or unknown zone.
#[utoipa::path(
    post,
    path = "/api/v1/sites",
    tag = "Inventory",
    summary = "Create a site",
    request_body = CreateSiteRequest,
    responses(
        (status = 201, description = "Site created", body = Site),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Zone not found", body = ErrorResponse),
    )
)]
pub async fn create_site(
    State(state): State<AppState>,
    Json(req): Json<CreateSiteRequest>,
) -> Result<impl IntoResponse, FairError> {
    let site = state
        .allocation_service
        .create_site(&req.name, req.zone_id, req.size)
        .await?;
    Ok((StatusCode::CREATED, Json(site)))
}

/// `GET /sites`: List sites.
#[utoipa::path(
    get,
    path = "/api/v1/sites",
    tag = "Inventory",
    summary = "List sites",
    params(SiteQuery),
    responses(
        (status = 200, description = "Matching sites", body = Vec<Site>),
    )
)]
pub async fn list_sites(
    State(state): State<AppState>,
    Query(query): Query<SiteQuery>,
) -> impl IntoResponse {
    Json(state.allocation_service.list_sites(query.zone_id).await)
}

/// `POST /fairs`: Create a fair season.
///
/// # Errors
///
/// Returns [`FairError::InvalidRequest`] for an empty name.
#[utoipa::path(
    post,
    path = "/api/v1/fairs",
    tag = "Inventory",
    summary = "Create a fair",
    request_body = CreateFairRequest,
    responses(
        (status = 201, description = "Fair created", body = Fair),
        (status = 400, description = "Invalid request", body = ErrorResponse),
    )
)]
pub async fn create_fair(
    State(state): State<AppState>,
    Json(req): Json<CreateFairRequest>,
) -> Result<impl IntoResponse, FairError> {
    let fair = state
        .allocation_service
        .create_fair(req.year, &req.name, req.is_activated)
        .await?;
    Ok((StatusCode::CREATED, Json(fair)))
}

/// `GET /fairs`: List fairs.
#[utoipa::path(
    get,
    path = "/api/v1/fairs",
    tag = "Inventory",
    summary = "List fairs",
    responses(
        (status = 200, description = "All fairs", body = Vec<Fair>),
    )
)]
pub async fn list_fairs(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.allocation_service.list_fairs().await)
}

/// `POST /events`: Create an event day, optionally with its event sites.
///
/// # Errors
///
/// Returns [`FairError`] for an empty name or unknown fair.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Inventory",
    summary = "Create an event",
    description = "Creates an event day. With `generate_event_sites` set, one available event site is created per active site.",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Fair not found", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, FairError> {
    let event = state
        .allocation_service
        .create_event(req.fair_id, &req.name, req.date, req.sequence)
        .await?;
    if req.generate_event_sites {
        state.allocation_service.generate_event_sites(event.id).await?;
    }
    Ok((StatusCode::CREATED, Json(event)))
}

/// `GET /events`: List events in date order.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Inventory",
    summary = "List events",
    params(EventQuery),
    responses(
        (status = 200, description = "Matching events", body = Vec<Event>),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> impl IntoResponse {
    Json(state.allocation_service.list_events(query.fair_id).await)
}

/// `POST /events/{id}/cancel`: Cancel an event.
///
/// # Errors
///
/// Returns [`FairError::NotFound`] for an unknown event.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/cancel",
    tag = "Inventory",
    summary = "Cancel an event",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Event cancelled", body = Event),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn cancel_event(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, FairError> {
    let event = state
        .allocation_service
        .cancel_event(EventId::from_uuid(id))
        .await?;
    Ok(Json(event))
}

/// `POST /events/{id}/event-sites`: Generate the missing event sites.
///
/// # Errors
///
/// Returns [`FairError::NotFound`] for an unknown event.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/event-sites",
    tag = "Inventory",
    summary = "Generate event sites",
    description = "Creates one available event site per active site that does not have one for this event yet.",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 201, description = "Event sites created", body = Vec<EventSite>),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn generate_event_sites(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, FairError> {
    let created = state
        .allocation_service
        .generate_event_sites(EventId::from_uuid(id))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `POST /event-sites`: Create one event site.
///
/// # Errors
///
/// Returns [`FairError`] for unknown references or a duplicate pair.
#[utoipa::path(
    post,
    path = "/api/v1/event-sites",
    tag = "Event Sites",
    summary = "Create an event site",
    request_body = CreateEventSiteRequest,
    responses(
        (status = 201, description = "Event site created", body = EventSite),
        (status = 404, description = "Event or site not found", body = ErrorResponse),
        (status = 409, description = "Pair already exists", body = ErrorResponse),
    )
)]
pub async fn create_event_site(
    State(state): State<AppState>,
    Json(req): Json<CreateEventSiteRequest>,
) -> Result<impl IntoResponse, FairError> {
    let event_site = state
        .allocation_service
        .create_event_site(req.event_id, req.site_id)
        .await?;
    Ok((StatusCode::CREATED, Json(event_site)))
}

/// `GET /event-sites`: List event sites with pagination and filters.
#[utoipa::path(
    get,
    path = "/api/v1/event-sites",
    tag = "Event Sites",
    summary = "List event sites",
    params(EventSiteQuery, PaginationParams),
    responses(
        (status = 200, description = "Paginated event sites", body = Paginated<EventSite>),
    )
)]
pub async fn list_event_sites(
    State(state): State<AppState>,
    Query(query): Query<EventSiteQuery>,
    Query(page): Query<PaginationParams>,
) -> impl IntoResponse {
    let event_sites = state
        .allocation_service
        .list_event_sites(EventSiteFilter {
            event_id: query.event_id,
            status: query.status,
        })
        .await;
    Json(Paginated::from_items(event_sites, &page))
}

/// `GET /event-sites/{id}`: Event site with its open transitions.
///
/// # Errors
///
/// Returns [`FairError::NotFound`] for an unknown event site.
#[utoipa::path(
    get,
    path = "/api/v1/event-sites/{id}",
    tag = "Event Sites",
    summary = "Get an event site",
    params(("id" = uuid::Uuid, Path, description = "Event site UUID")),
    responses(
        (status = 200, description = "Event site", body = EventSiteDetail),
        (status = 404, description = "Event site not found", body = ErrorResponse),
    )
)]
pub async fn get_event_site(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, FairError> {
    let event_site = state
        .allocation_service
        .get_event_site(EventSiteId::from_uuid(id))
        .await?;
    Ok(Json(event_site_detail(event_site)))
}

/// `POST /event-sites/{id}/transitions`: Change an event site's status.
///
/// # Errors
///
/// Returns [`FairError`] when the transition is not allowed or would
/// contradict the site's allocations.
#[utoipa::path(
    post,
    path = "/api/v1/event-sites/{id}/transitions",
    tag = "Event Sites",
    summary = "Transition an event site",
    description = "Applies a named status transition. Allocation goes through `POST /allocations`; releasing an allocated site goes through `DELETE /allocations/{id}`.",
    params(("id" = uuid::Uuid, Path, description = "Event site UUID")),
    request_body = SiteTransitionRequest,
    responses(
        (status = 200, description = "Transition applied", body = EventSiteDetail),
        (status = 404, description = "Event site not found", body = ErrorResponse),
        (status = 409, description = "Transition refused", body = ErrorResponse),
    )
)]
pub async fn transition_event_site(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<SiteTransitionRequest>,
) -> Result<impl IntoResponse, FairError> {
    let event_site = state
        .allocation_service
        .transition_event_site(EventSiteId::from_uuid(id), req.transition)
        .await?;
    Ok(Json(event_site_detail(event_site)))
}

fn event_site_detail(event_site: EventSite) -> EventSiteDetail {
    let available_transitions = available(event_site.status, &SiteTransition::ALL);
    EventSiteDetail {
        event_site,
        available_transitions,
    }
}

/// `POST /site-history`: Record or update one history row.
///
/// # Errors
///
/// Returns [`FairError::NotFound`] for an unknown site.
#[utoipa::path(
    post,
    path = "/api/v1/site-history",
    tag = "Site History",
    summary = "Record site history",
    description = "Inserts the row for (stallholder, site, year), or updates it if it exists.",
    request_body = RecordHistoryRequest,
    responses(
        (status = 201, description = "Row recorded", body = SiteHistory),
        (status = 404, description = "Site not found", body = ErrorResponse),
    )
)]
pub async fn record_site_history(
    State(state): State<AppState>,
    Json(req): Json<RecordHistoryRequest>,
) -> Result<impl IntoResponse, FairError> {
    let row = state
        .allocation_service
        .record_site_history(HistoryRecord {
            stallholder_id: req.stallholder_id,
            site_id: req.site_id,
            year: req.year,
            number_events: req.number_events,
            is_skipped: req.is_skipped,
            site_size: req.site_size,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /site-history`: List history rows.
#[utoipa::path(
    get,
    path = "/api/v1/site-history",
    tag = "Site History",
    summary = "List site history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Matching rows", body = Vec<SiteHistory>),
    )
)]
pub async fn list_site_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    Json(
        state
            .allocation_service
            .list_site_history(query.stallholder_id, query.year)
            .await,
    )
}

/// `POST /site-history/rebuild`: Rebuild a fair year from booked
/// allocations.
///
/// # Errors
///
/// Returns [`FairError::NotFound`] for an unknown fair.
#[utoipa::path(
    post,
    path = "/api/v1/site-history/rebuild",
    tag = "Site History",
    summary = "Rebuild site history",
    description = "Counts booked events per stallholder and site for the fair, upserts those rows for the fair year, and removes that year's rows without a booked source.",
    request_body = RebuildHistoryRequest,
    responses(
        (status = 200, description = "History rebuilt", body = HistoryRebuild),
        (status = 404, description = "Fair not found", body = ErrorResponse),
    )
)]
pub async fn rebuild_site_history(
    State(state): State<AppState>,
    Json(req): Json<RebuildHistoryRequest>,
) -> Result<impl IntoResponse, FairError> {
    let rebuild = state
        .allocation_service
        .rebuild_site_history(req.fair_id)
        .await?;
    Ok(Json(rebuild))
}

/// Inventory routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/zones", post(create_zone).get(list_zones))
        .route("/sites", post(create_site).get(list_sites))
        .route("/fairs", post(create_fair).get(list_fairs))
        .route("/events", post(create_event).get(list_events))
        .route("/events/{id}/cancel", post(cancel_event))
        .route("/events/{id}/event-sites", post(generate_event_sites))
        .route("/event-sites", post(create_event_site).get(list_event_sites))
        .route("/event-sites/{id}", get(get_event_site))
        .route("/event-sites/{id}/transitions", post(transition_event_site))
        .route("/site-history", post(record_site_history).get(list_site_history))
        .route("/site-history/rebuild", post(rebuild_site_history))
}
