//! Domain layer: fair records, state machines, and the allocation engine.
//!
//! [`FairState`] owns every record and exposes the commands that keep them
//! consistent. [`FairStore`] shares it between request handlers. The status
//! machines live in their own modules and share the [`machine::Transition`]
//! shape. Every change is reported as an [`Activity`] on the
//! [`ActivityBus`].

pub mod activity;
pub mod activity_bus;
pub mod allocation;
pub mod booking_status;
pub mod cleanup;
pub mod fair_state;
pub mod fair_store;
pub mod ids;
pub mod licence_status;
pub mod machine;
pub mod model;
pub mod payment_status;
pub mod site_history;
pub mod site_status;

pub use activity::{Activity, ActivityCategory};
pub use activity_bus::ActivityBus;
pub use allocation::{AllocationReport, Candidate, SkipReason, SkippedCandidate};
pub use booking_status::{BookingStatus, BookingTransition};
pub use cleanup::{CleanupFailure, CleanupReport};
pub use fair_state::{AllocationRequest, FairState, HistoryRecord, RegistrationRequest};
pub use fair_store::FairStore;
pub use ids::{
    AllocationId, EventId, EventSiteId, FairId, LicenceBatchId, LicenceId, PaymentId,
    RegistrationId, SiteHistoryId, SiteId, StallholderId, ZoneId,
};
pub use licence_status::{LicenceStatus, LicenceTransition};
pub use model::{
    Event, EventSite, Fair, FoodLicence, FoodLicenceBatch, PaymentHistory, Site, SiteAllocation,
    SiteHistory, SiteSize, StallRegistration, Zone,
};
pub use payment_status::{PaymentStatus, PaymentTransition};
pub use site_history::HistoryRebuild;
pub use site_status::{SiteStatus, SiteTransition};
