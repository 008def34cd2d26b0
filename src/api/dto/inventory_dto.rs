//! Inventory DTOs: zones, sites, fairs, events, event sites, site history.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    EventId, EventSite, FairId, SiteId, SiteSize, SiteStatus, SiteTransition, StallholderId,
    ZoneId,
};

/// Request body for `POST /zones`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateZoneRequest {
    /// Display name.
    pub name: String,
}

/// Request body for `POST /sites`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSiteRequest {
    /// Site label (e.g. `"A12"`).
    pub name: String,
    /// Zone the site belongs to.
    pub zone_id: ZoneId,
    /// Size classification.
    pub size: SiteSize,
}

/// Query for `GET /sites`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SiteQuery {
    /// Only sites of this zone.
    pub zone_id: Option<ZoneId>,
}

/// Request body for `POST /fairs`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFairRequest {
    /// Calendar year of the season.
    pub year: i32,
    /// Display name.
    pub name: String,
    /// Open for registrations. Defaults to `true`.
    #[serde(default = "default_true")]
    pub is_activated: bool,
}

/// Request body for `POST /events`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    /// Owning fair.
    pub fair_id: FairId,
    /// Display name.
    pub name: String,
    /// Event date.
    pub date: NaiveDate,
    /// Order within the season.
    pub sequence: u8,
    /// Also create one event site per active site.
    #[serde(default)]
    pub generate_event_sites: bool,
}

/// Query for `GET /events`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventQuery {
    /// Only events of this fair.
    pub fair_id: Option<FairId>,
}

/// Request body for `POST /event-sites`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEventSiteRequest {
    /// Event.
    pub event_id: EventId,
    /// Site.
    pub site_id: SiteId,
}

/// Query for `GET /event-sites`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventSiteQuery {
    /// Only event sites of this event.
    pub event_id: Option<EventId>,
    /// Only event sites in this status.
    pub status: Option<SiteStatus>,
}

/// Request body for `POST /event-sites/{id}/transitions`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SiteTransitionRequest {
    /// Transition to apply.
    pub transition: SiteTransition,
}

/// An event site with the transitions currently open to it.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventSiteDetail {
    /// The event site.
    #[serde(flatten)]
    pub event_site: EventSite,
    /// Transitions its status allows.
    pub available_transitions: Vec<SiteTransition>,
}

/// Request body for `POST /site-history`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordHistoryRequest {
    /// Stallholder.
    pub stallholder_id: StallholderId,
    /// Site occupied.
    pub site_id: SiteId,
    /// Fair year.
    pub year: i32,
    /// Events attended.
    pub number_events: u32,
    /// Site skipped that year.
    #[serde(default)]
    pub is_skipped: bool,
    /// Size booked that year.
    #[serde(default)]
    pub site_size: Option<SiteSize>,
}

/// Query for `GET /site-history`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Only rows of this stallholder.
    pub stallholder_id: Option<StallholderId>,
    /// Only rows of this year.
    pub year: Option<i32>,
}

/// Request body for `POST /site-history/rebuild`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RebuildHistoryRequest {
    /// Fair whose year is rebuilt.
    pub fair_id: FairId,
}

fn default_true() -> bool {
    true
}
