//! Fair entities.
//!
//! Plain data records. All cross-entity rules live in
//! [`super::FairState`], which owns every record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::booking_status::BookingStatus;
use super::ids::{
    AllocationId, EventId, EventSiteId, FairId, LicenceBatchId, LicenceId, PaymentId,
    RegistrationId, SiteHistoryId, SiteId, StallholderId, ZoneId,
};
use super::licence_status::LicenceStatus;
use super::payment_status::PaymentStatus;
use super::site_status::SiteStatus;

/// Physical size class of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SiteSize {
    /// Full size fair site.
    Full,
    /// Half size fair site.
    Half,
}

/// Named area of the fair grounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Zone {
    /// Zone identifier.
    pub id: ZoneId,
    /// Display name.
    pub name: String,
}

/// A physical location a stall can occupy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Site {
    /// Site identifier.
    pub id: SiteId,
    /// Site label as painted on the ground (e.g. `"A12"`).
    pub name: String,
    /// Zone the site belongs to.
    pub zone_id: ZoneId,
    /// Size classification.
    pub size: SiteSize,
    /// Inactive sites are skipped when generating event sites.
    pub is_active: bool,
}

/// One season of the fair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Fair {
    /// Fair identifier.
    pub id: FairId,
    /// Calendar year of the season.
    pub year: i32,
    /// Display name.
    pub name: String,
    /// Registrations open once activated.
    pub is_activated: bool,
}

/// A single fair day within a season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Event {
    /// Event identifier.
    pub id: EventId,
    /// Owning fair.
    pub fair_id: FairId,
    /// Display name.
    pub name: String,
    /// Scheduled date (after any postponement).
    pub date: NaiveDate,
    /// Order within the season (1 = first event).
    pub sequence: u8,
    /// Cancelled events are never allocated.
    pub is_cancelled: bool,
}

/// A site's booking state for one event. Unique per (event, site).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EventSite {
    /// Event-site identifier.
    pub id: EventSiteId,
    /// Event.
    pub event_id: EventId,
    /// Site.
    pub site_id: SiteId,
    /// Current status.
    pub status: SiteStatus,
}

/// Assignment of a stallholder to an event site.
///
/// Unique per (stallholder, event site). An allocation without a
/// registration is a pre-booking offer that the cleanup job removes unless
/// it is on hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SiteAllocation {
    /// Allocation identifier.
    pub id: AllocationId,
    /// Allocated stallholder.
    pub stallholder_id: StallholderId,
    /// Allocated event site.
    pub event_site_id: EventSiteId,
    /// Registration confirming the allocation, once the stallholder applies.
    pub registration_id: Option<RegistrationId>,
    /// Protects the allocation from the cleanup job.
    pub on_hold: bool,
    /// Who or what created the allocation.
    pub created_by: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// One year of a stallholder's occupancy of a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SiteHistory {
    /// Row identifier.
    pub id: SiteHistoryId,
    /// Stallholder.
    pub stallholder_id: StallholderId,
    /// Occupied site.
    pub site_id: SiteId,
    /// Fair year.
    pub year: i32,
    /// Number of events attended on this site that year.
    pub number_events: u32,
    /// The stallholder skipped the site that year.
    pub is_skipped: bool,
    /// Size booked that year, when known.
    pub site_size: Option<SiteSize>,
}

/// A stallholder's application to a fair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StallRegistration {
    /// Registration identifier.
    pub id: RegistrationId,
    /// Fair applied to.
    pub fair_id: FairId,
    /// Applicant.
    pub stallholder_id: StallholderId,
    /// Booking state.
    pub booking_status: BookingStatus,
    /// Requested site size.
    pub site_size: Option<SiteSize>,
    /// Food stalls need a food licence.
    pub selling_food: bool,
    /// Invoice total in cents.
    pub total_charge_cents: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A payment expected or received against a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaymentHistory {
    /// Payment identifier.
    pub id: PaymentId,
    /// Registration being paid for.
    pub registration_id: RegistrationId,
    /// Outstanding amount in cents.
    pub amount_to_pay_cents: i64,
    /// Amount received so far in cents.
    pub amount_paid_cents: i64,
    /// Payment state.
    pub status: PaymentStatus,
    /// Creation timestamp.
    pub date_created: DateTime<Utc>,
    /// Last change timestamp.
    pub date_updated: DateTime<Utc>,
}

/// A food licence request passed to the district council.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FoodLicence {
    /// Licence identifier.
    pub id: LicenceId,
    /// Registration selling food.
    pub registration_id: RegistrationId,
    /// Licence state.
    pub status: LicenceStatus,
    /// Batch the request was sent in.
    pub batch_id: Option<LicenceBatchId>,
    /// When the request was recorded.
    pub date_requested: DateTime<Utc>,
    /// When the council decided. Set on approval or rejection.
    pub date_completed: Option<DateTime<Utc>>,
}

/// A set of licence requests sent to the council together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FoodLicenceBatch {
    /// Batch identifier.
    pub id: LicenceBatchId,
    /// Council address the batch goes to.
    pub recipient_email: String,
    /// Licences in the batch.
    pub licence_ids: Vec<LicenceId>,
    /// Creation timestamp.
    pub date_created: DateTime<Utc>,
    /// Dispatch timestamp, set when the batch is submitted.
    pub date_sent: Option<DateTime<Utc>>,
}
