//! Activities recorded after every state change.
//!
//! Every command on [`super::FairState`] records one or more [`Activity`]
//! values. They are broadcast over the [`super::ActivityBus`] to WebSocket
//! subscribers and appended to the persistent activity log, which is the
//! administrator's audit trail of allocation runs and status changes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::allocation::SkipReason;
use super::booking_status::BookingStatus;
use super::ids::{
    AllocationId, EventId, EventSiteId, LicenceBatchId, LicenceId, PaymentId, RegistrationId,
    SiteId, StallholderId,
};
use super::licence_status::LicenceStatus;
use super::payment_status::PaymentStatus;
use super::site_status::SiteStatus;

/// Category tag of an activity, used for log filtering and subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    /// Allocation runs, allocation create/remove, cleanup.
    SiteAllocation,
    /// Event-site status changes.
    SiteStatus,
    /// Registration booking status.
    Booking,
    /// Payment records.
    Payment,
    /// Food licences and batches.
    FoodLicence,
    /// Site history maintenance.
    SiteHistory,
}

impl ActivityCategory {
    /// String tag as stored in the activity log.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SiteAllocation => "site_allocation",
            Self::SiteStatus => "site_status",
            Self::Booking => "booking",
            Self::Payment => "payment",
            Self::FoodLicence => "food_licence",
            Self::SiteHistory => "site_history",
        }
    }
}

impl fmt::Display for ActivityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "site_allocation" => Ok(Self::SiteAllocation),
            "site_status" => Ok(Self::SiteStatus),
            "booking" => Ok(Self::Booking),
            "payment" => Ok(Self::Payment),
            "food_licence" => Ok(Self::FoodLicence),
            "site_history" => Ok(Self::SiteHistory),
            other => Err(format!("unknown activity category: {other}")),
        }
    }
}

/// A recorded state change.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Activity {
    /// A stallholder was allocated an event site.
    AllocationCreated {
        /// New allocation.
        allocation_id: AllocationId,
        /// Stallholder.
        stallholder_id: StallholderId,
        /// Event site.
        event_site_id: EventSiteId,
        /// Event of the event site.
        event_id: EventId,
        /// Site of the event site.
        site_id: SiteId,
        /// Creator tag.
        created_by: String,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The allocation run passed over a candidate.
    AllocationSkipped {
        /// Stallholder.
        stallholder_id: StallholderId,
        /// Preferred site.
        site_id: SiteId,
        /// Event considered.
        event_id: EventId,
        /// Why the allocation was not made.
        reason: SkipReason,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An allocation was deleted and its event site released.
    AllocationRemoved {
        /// Deleted allocation.
        allocation_id: AllocationId,
        /// Stallholder.
        stallholder_id: StallholderId,
        /// Released event site.
        event_site_id: EventSiteId,
        /// Whether the status guard was overridden.
        forced: bool,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Hold flag or registration link of an allocation changed.
    AllocationUpdated {
        /// Allocation.
        allocation_id: AllocationId,
        /// New hold flag.
        on_hold: bool,
        /// Linked registration.
        registration_id: Option<RegistrationId>,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A history-driven allocation run finished.
    AllocationRunCompleted {
        /// Reference date of the run.
        as_of: NaiveDate,
        /// Allocations created.
        created: usize,
        /// Candidates skipped.
        skipped: usize,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The unregistered-allocation cleanup finished.
    CleanupCompleted {
        /// Allocations deleted.
        deleted: usize,
        /// Allocations that could not be deleted.
        failed: usize,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The cleanup could not delete an allocation.
    CleanupFailed {
        /// Allocation kept.
        allocation_id: AllocationId,
        /// Error message.
        reason: String,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An event site changed status.
    SiteStatusChanged {
        /// Event site.
        event_site_id: EventSiteId,
        /// Previous status.
        from: SiteStatus,
        /// New status.
        to: SiteStatus,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A registration changed booking status.
    BookingStatusChanged {
        /// Registration.
        registration_id: RegistrationId,
        /// Previous status.
        from: BookingStatus,
        /// New status.
        to: BookingStatus,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A payment record changed status.
    PaymentStatusChanged {
        /// Payment.
        payment_id: PaymentId,
        /// Previous status.
        from: PaymentStatus,
        /// New status.
        to: PaymentStatus,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Money was received against a payment record.
    PaymentReceived {
        /// Payment.
        payment_id: PaymentId,
        /// Amount received in cents.
        amount_cents: i64,
        /// Amount still owed in cents.
        outstanding_cents: i64,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A food licence changed status.
    LicenceStatusChanged {
        /// Licence.
        licence_id: LicenceId,
        /// Previous status.
        from: LicenceStatus,
        /// New status.
        to: LicenceStatus,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Created licences were grouped into a batch.
    LicenceBatchCreated {
        /// Batch.
        batch_id: LicenceBatchId,
        /// Number of licences in the batch.
        licence_count: usize,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Site history for a fair year was rebuilt from booked allocations.
    SiteHistoryRebuilt {
        /// Fair year.
        year: i32,
        /// Rows inserted or updated.
        upserted: usize,
        /// Stale rows removed.
        removed: usize,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A follow-up effect was not applied.
    Warning {
        /// Area the warning belongs to.
        category: ActivityCategory,
        /// Description.
        message: String,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl Activity {
    /// Returns the category tag of this activity.
    #[must_use]
    pub const fn category(&self) -> ActivityCategory {
        match self {
            Self::AllocationCreated { .. }
            | Self::AllocationSkipped { .. }
            | Self::AllocationRemoved { .. }
            | Self::AllocationUpdated { .. }
            | Self::AllocationRunCompleted { .. }
            | Self::CleanupCompleted { .. }
            | Self::CleanupFailed { .. } => ActivityCategory::SiteAllocation,
            Self::SiteStatusChanged { .. } => ActivityCategory::SiteStatus,
            Self::BookingStatusChanged { .. } => ActivityCategory::Booking,
            Self::PaymentStatusChanged { .. } | Self::PaymentReceived { .. } => {
                ActivityCategory::Payment
            }
            Self::LicenceStatusChanged { .. } | Self::LicenceBatchCreated { .. } => {
                ActivityCategory::FoodLicence
            }
            Self::SiteHistoryRebuilt { .. } => ActivityCategory::SiteHistory,
            Self::Warning { category, .. } => *category,
        }
    }

    /// Returns the activity kind as a static string slice.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AllocationCreated { .. } => "allocation_created",
            Self::AllocationSkipped { .. } => "allocation_skipped",
            Self::AllocationRemoved { .. } => "allocation_removed",
            Self::AllocationUpdated { .. } => "allocation_updated",
            Self::AllocationRunCompleted { .. } => "allocation_run_completed",
            Self::CleanupCompleted { .. } => "cleanup_completed",
            Self::CleanupFailed { .. } => "cleanup_failed",
            Self::SiteStatusChanged { .. } => "site_status_changed",
            Self::BookingStatusChanged { .. } => "booking_status_changed",
            Self::PaymentStatusChanged { .. } => "payment_status_changed",
            Self::PaymentReceived { .. } => "payment_received",
            Self::LicenceStatusChanged { .. } => "licence_status_changed",
            Self::LicenceBatchCreated { .. } => "licence_batch_created",
            Self::SiteHistoryRebuilt { .. } => "site_history_rebuilt",
            Self::Warning { .. } => "warning",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_str() {
        for category in [
            ActivityCategory::SiteAllocation,
            ActivityCategory::SiteStatus,
            ActivityCategory::Booking,
            ActivityCategory::Payment,
            ActivityCategory::FoodLicence,
            ActivityCategory::SiteHistory,
        ] {
            assert_eq!(category.as_str().parse::<ActivityCategory>(), Ok(category));
        }
        assert!("nonsense".parse::<ActivityCategory>().is_err());
    }

    #[test]
    fn skipped_activity_serializes_reason() {
        let activity = Activity::AllocationSkipped {
            stallholder_id: StallholderId::new(),
            site_id: SiteId::new(),
            event_id: EventId::new(),
            reason: SkipReason::SiteTaken {
                status: SiteStatus::Booked,
            },
            timestamp: Utc::now(),
        };
        assert_eq!(activity.category(), ActivityCategory::SiteAllocation);
        let Ok(json) = serde_json::to_value(&activity) else {
            panic!("serialization failed");
        };
        assert_eq!(json["kind"], "allocation_skipped");
        assert_eq!(json["reason"]["reason"], "site_taken");
        assert_eq!(json["reason"]["status"], "booked");
    }

    #[test]
    fn warning_carries_its_category() {
        let activity = Activity::Warning {
            category: ActivityCategory::FoodLicence,
            message: "registration not bookable".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(activity.category(), ActivityCategory::FoodLicence);
        assert_eq!(activity.kind(), "warning");
    }
}
