//! Site history maintenance.
//!
//! At the end of a season the booked allocations become next year's
//! history. The rebuild is idempotent for a fair: it can run any number of
//! times and always leaves exactly one row per (stallholder, site) that had
//! a booked allocation that year.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use super::activity::Activity;
use super::booking_status::BookingStatus;
use super::fair_state::{FairState, HistoryRecord};
use super::ids::{EventId, FairId, SiteHistoryId, SiteId, StallholderId};
use super::model::SiteSize;
use crate::error::FairError;

/// Outcome of [`rebuild_site_history`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct HistoryRebuild {
    /// Fair year rebuilt.
    pub year: i32,
    /// Rows inserted or updated.
    pub upserted: usize,
    /// Stale rows removed.
    pub removed: usize,
}

/// Rewrites the fair year's site history from booked allocations.
///
/// # Errors
///
/// Returns [`FairError::NotFound`] if the fair does not exist.
pub fn rebuild_site_history(
    state: &mut FairState,
    fair_id: FairId,
) -> Result<HistoryRebuild, FairError> {
    let year = state.fair(fair_id)?.year;

    let mut attended: BTreeMap<(StallholderId, SiteId), (BTreeSet<EventId>, Option<SiteSize>)> =
        BTreeMap::new();
    for allocation in state.allocations() {
        let Some(registration) = allocation
            .registration_id
            .and_then(|id| state.registration(id).ok())
        else {
            continue;
        };
        if registration.fair_id != fair_id || registration.booking_status != BookingStatus::Booked {
            continue;
        }
        let Ok(event_site) = state.event_site(allocation.event_site_id) else {
            continue;
        };
        let entry = attended
            .entry((allocation.stallholder_id, event_site.site_id))
            .or_insert_with(|| (BTreeSet::new(), registration.site_size));
        entry.0.insert(event_site.event_id);
    }

    let stale: Vec<SiteHistoryId> = state
        .site_history()
        .filter(|h| h.year == year && !attended.contains_key(&(h.stallholder_id, h.site_id)))
        .map(|h| h.id)
        .collect();
    for id in &stale {
        state.remove_site_history(*id);
    }

    let upserted = attended.len();
    for ((stallholder_id, site_id), (events, site_size)) in attended {
        state.record_site_history(HistoryRecord {
            stallholder_id,
            site_id,
            year,
            number_events: u32::try_from(events.len()).unwrap_or(u32::MAX),
            is_skipped: false,
            site_size,
        })?;
    }

    let rebuild = HistoryRebuild {
        year,
        upserted,
        removed: stale.len(),
    };
    state.record(Activity::SiteHistoryRebuilt {
        year,
        upserted: rebuild.upserted,
        removed: rebuild.removed,
        timestamp: Utc::now(),
    });
    tracing::info!(%fair_id, year, upserted, removed = rebuild.removed, "site history rebuilt");
    Ok(rebuild)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::booking_status::BookingTransition;
    use crate::domain::fair_state::tests::fixture;
    use crate::domain::fair_state::{AllocationRequest, RegistrationRequest};

    #[test]
    fn rebuild_counts_booked_events_and_drops_stale_rows() {
        let mut fx = fixture(1);
        let Some(site_id) = fx.sites.first().copied() else {
            panic!("no site");
        };
        let Some(date) = NaiveDate::from_ymd_opt(2026, 11, 14) else {
            panic!("valid date");
        };
        let Ok(second_event) = fx
            .state
            .add_event(fx.fair, "Second Saturday".to_string(), date, 2)
        else {
            panic!("event creation failed");
        };
        let Ok(_) = fx.state.generate_event_sites(second_event.id) else {
            panic!("event site generation failed");
        };

        let holder = StallholderId::new();
        let Ok(registration) = fx.state.add_registration(RegistrationRequest {
            fair_id: fx.fair,
            stallholder_id: holder,
            site_size: Some(SiteSize::Full),
            selling_food: false,
            total_charge_cents: 0,
        }) else {
            panic!("registration failed");
        };
        for event_id in [fx.event, second_event.id] {
            let Some(event_site_id) = fx.state.find_event_site(event_id, site_id).map(|e| e.id)
            else {
                panic!("event site missing");
            };
            let Ok(_) = fx.state.allocate(AllocationRequest {
                event_site_id,
                stallholder_id: holder,
                registration_id: Some(registration.id),
                on_hold: false,
                created_by: "test".to_string(),
            }) else {
                panic!("allocation failed");
            };
        }
        for t in [
            BookingTransition::Submit,
            BookingTransition::Invoice,
            BookingTransition::CompletePayment,
            BookingTransition::Book,
        ] {
            let Ok(_) = fx.state.transition_registration(registration.id, t) else {
                panic!("{t:?} failed");
            };
        }

        let stale_holder = StallholderId::new();
        let Ok(_) = fx.state.record_site_history(HistoryRecord {
            stallholder_id: stale_holder,
            site_id,
            year: 2026,
            number_events: 3,
            is_skipped: false,
            site_size: None,
        }) else {
            panic!("history insert failed");
        };
        let Ok(_) = fx.state.record_site_history(HistoryRecord {
            stallholder_id: stale_holder,
            site_id,
            year: 2025,
            number_events: 3,
            is_skipped: false,
            site_size: None,
        }) else {
            panic!("history insert failed");
        };

        let Ok(rebuild) = rebuild_site_history(&mut fx.state, fx.fair) else {
            panic!("rebuild failed");
        };
        assert_eq!(rebuild.upserted, 1);
        assert_eq!(rebuild.removed, 1);

        let rows: Vec<_> = fx.state.site_history().filter(|h| h.year == 2026).collect();
        assert_eq!(rows.len(), 1);
        let Some(row) = rows.first() else {
            panic!("no row");
        };
        assert_eq!(row.stallholder_id, holder);
        assert_eq!(row.number_events, 2);
        assert_eq!(row.site_size, Some(SiteSize::Full));
        assert_eq!(fx.state.site_history().filter(|h| h.year == 2025).count(), 1);

        let Ok(again) = rebuild_site_history(&mut fx.state, fx.fair) else {
            panic!("second rebuild failed");
        };
        assert_eq!(again.removed, 0);
        assert_eq!(fx.state.site_history().count(), 2);
    }

    #[test]
    fn rebuild_unknown_fair_fails() {
        let mut fx = fixture(0);
        assert!(matches!(
            rebuild_site_history(&mut fx.state, FairId::new()),
            Err(FairError::NotFound { .. })
        ));
    }
}
