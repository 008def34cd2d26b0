//! Allocation DTOs.

use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::domain::{EventId, EventSiteId, RegistrationId, StallholderId};

/// Request body for `POST /allocations`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAllocationRequest {
    /// Event site to allocate.
    pub event_site_id: EventSiteId,
    /// Stallholder receiving it.
    pub stallholder_id: StallholderId,
    /// Registration confirming the allocation.
    #[serde(default)]
    pub registration_id: Option<RegistrationId>,
    /// Protect from the cleanup job.
    #[serde(default)]
    pub on_hold: bool,
    /// Creator tag. Defaults to `"admin"`.
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Request body for `PATCH /allocations/{id}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAllocationRequest {
    /// New hold flag.
    #[serde(default)]
    pub on_hold: Option<bool>,
    /// Registration to link.
    #[serde(default)]
    pub registration_id: Option<RegistrationId>,
}

/// Query for `DELETE /allocations/{id}`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteAllocationQuery {
    /// Delete even when the event site is past allocated.
    #[serde(default)]
    pub force: bool,
}

/// Query for `GET /allocations`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AllocationQuery {
    /// Only allocations of this stallholder.
    pub stallholder_id: Option<StallholderId>,
    /// Only allocations for this event.
    pub event_id: Option<EventId>,
    /// Only allocations without a registration.
    #[serde(default)]
    pub unregistered: bool,
}

/// Request body for `POST /allocations/run`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RunAllocationRequest {
    /// Reference date. Defaults to today.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    /// Years of history to consider. Defaults to the configured lookback.
    #[serde(default)]
    pub lookback_years: Option<u32>,
}

/// Query for `GET /allocations/candidates`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CandidateQuery {
    /// Reference date. Defaults to today.
    pub as_of: Option<NaiveDate>,
    /// Years of history to consider.
    pub lookback_years: Option<u32>,
}
