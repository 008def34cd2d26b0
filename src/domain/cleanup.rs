//! Removal of allocations nobody registered for.

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use super::activity::Activity;
use super::fair_state::FairState;
use super::ids::AllocationId;

/// An allocation the cleanup could not delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CleanupFailure {
    /// Allocation kept.
    pub allocation_id: AllocationId,
    /// Error message.
    pub reason: String,
}

/// Outcome of [`delete_unregistered_allocations`].
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct CleanupReport {
    /// Deleted allocations.
    pub deleted: Vec<AllocationId>,
    /// Allocations left in place.
    pub failed: Vec<CleanupFailure>,
}

/// Deletes every allocation with no registration that is not on hold.
///
/// Deletion is not forced, so an allocation whose event site has moved past
/// allocated stays and is reported as a failure. Failures are not retried.
pub fn delete_unregistered_allocations(state: &mut FairState) -> CleanupReport {
    let targets: Vec<AllocationId> = state
        .allocations()
        .filter(|a| a.registration_id.is_none() && !a.on_hold)
        .map(|a| a.id)
        .collect();

    let mut report = CleanupReport::default();
    for allocation_id in targets {
        match state.deallocate(allocation_id, false) {
            Ok(_) => report.deleted.push(allocation_id),
            Err(err) => {
                tracing::warn!(
                    %allocation_id,
                    error = %err,
                    "failed to delete unregistered allocation"
                );
                let reason = err.to_string();
                state.record(Activity::CleanupFailed {
                    allocation_id,
                    reason: reason.clone(),
                    timestamp: Utc::now(),
                });
                report.failed.push(CleanupFailure {
                    allocation_id,
                    reason,
                });
            }
        }
    }

    state.record(Activity::CleanupCompleted {
        deleted: report.deleted.len(),
        failed: report.failed.len(),
        timestamp: Utc::now(),
    });
    tracing::info!(
        deleted = report.deleted.len(),
        failed = report.failed.len(),
        "unregistered allocation cleanup finished"
    );
    report
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::fair_state::tests::{Fixture, fixture};
    use crate::domain::fair_state::{AllocationRequest, RegistrationRequest};
    use crate::domain::ids::{EventSiteId, RegistrationId, StallholderId};
    use crate::domain::site_status::{SiteStatus, SiteTransition};

    fn event_site(fx: &Fixture, idx: usize) -> EventSiteId {
        let Some(site) = fx.sites.get(idx) else {
            panic!("no site {idx}");
        };
        let Some(event_site) = fx.state.find_event_site(fx.event, *site) else {
            panic!("no event site");
        };
        event_site.id
    }

    fn allocate(
        fx: &mut Fixture,
        idx: usize,
        stallholder_id: StallholderId,
        registration_id: Option<RegistrationId>,
        on_hold: bool,
    ) -> AllocationId {
        let event_site_id = event_site(fx, idx);
        let Ok(allocation) = fx.state.allocate(AllocationRequest {
            event_site_id,
            stallholder_id,
            registration_id,
            on_hold,
            created_by: "test".to_string(),
        }) else {
            panic!("allocation failed");
        };
        allocation.id
    }

    #[test]
    fn deletes_only_unregistered_and_not_on_hold() {
        let mut fx = fixture(3);
        let registered_holder = StallholderId::new();
        let Ok(registration) = fx.state.add_registration(RegistrationRequest {
            fair_id: fx.fair,
            stallholder_id: registered_holder,
            site_size: None,
            selling_food: false,
            total_charge_cents: 0,
        }) else {
            panic!("registration failed");
        };

        let orphan = allocate(&mut fx, 0, StallholderId::new(), None, false);
        let held = allocate(&mut fx, 1, StallholderId::new(), None, true);
        let registered = allocate(&mut fx, 2, registered_holder, Some(registration.id), false);

        let report = delete_unregistered_allocations(&mut fx.state);
        assert_eq!(report.deleted, vec![orphan]);
        assert!(report.failed.is_empty());

        let remaining: Vec<AllocationId> = fx.state.allocations().map(|a| a.id).collect();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.contains(&held));
        assert!(remaining.contains(&registered));

        let Ok(freed) = fx.state.event_site(event_site(&fx, 0)) else {
            panic!("event site missing");
        };
        assert_eq!(freed.status, SiteStatus::Available);
    }

    #[test]
    fn blocked_allocation_is_reported_and_kept() {
        let mut fx = fixture(1);
        let allocation = allocate(&mut fx, 0, StallholderId::new(), None, false);
        let Ok(_) = fx
            .state
            .transition_event_site(event_site(&fx, 0), SiteTransition::HoldPending)
        else {
            panic!("pending transition failed");
        };
        fx.state.drain_activities();

        let report = delete_unregistered_allocations(&mut fx.state);
        assert!(report.deleted.is_empty());
        let Some(failure) = report.failed.first() else {
            panic!("expected a failure");
        };
        assert_eq!(failure.allocation_id, allocation);
        assert_eq!(fx.state.allocations().count(), 1);

        let kinds: Vec<&str> = fx.state.drain_activities().iter().map(Activity::kind).collect();
        assert_eq!(kinds, vec!["cleanup_failed", "cleanup_completed"]);
    }
}
