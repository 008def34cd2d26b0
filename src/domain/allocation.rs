//! History-driven site allocation.
//!
//! Stallholders who have come back to the same site year after year get
//! that site again. [`plan_candidates`] turns site history into one or more
//! preferred sites per stallholder. [`run_allocation`] then walks the
//! lookback thresholds from the longest run of years down to a single year
//! and allocates each candidate's site for every upcoming event, so a
//! four-year regular always wins a contested site over a one-year visitor.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::activity::Activity;
use super::fair_state::{AllocationRequest, FairState};
use super::ids::{EventId, SiteId, StallholderId};
use super::model::{SiteAllocation, SiteHistory, SiteSize};
use super::site_status::SiteStatus;
use crate::error::FairError;

/// Why the allocation run did not allocate a candidate's site for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The event has no event site for the preferred site.
    EventSiteMissing,
    /// The event site is in use or withdrawn.
    SiteTaken {
        /// Status found on the event site.
        status: SiteStatus,
    },
    /// The stallholder already holds this event site.
    AlreadyAllocated,
    /// The stallholder last booked a different size than the site offers.
    SizeMismatch {
        /// Size of the site.
        site: SiteSize,
        /// Size recorded in history.
        history: SiteSize,
    },
}

/// A stallholder's claim on a site, derived from history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Candidate {
    /// Stallholder.
    pub stallholder_id: StallholderId,
    /// Preferred site.
    pub site_id: SiteId,
    /// Years on the site inside the window.
    pub years: u32,
    /// Most recent year on the site.
    pub last_year: i32,
    /// Events attended on the site inside the window.
    pub total_events: u32,
    /// Size booked in the most recent year, if recorded.
    pub site_size: Option<SiteSize>,
}

/// A candidate/event pair the run passed over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SkippedCandidate {
    /// Stallholder.
    pub stallholder_id: StallholderId,
    /// Preferred site.
    pub site_id: SiteId,
    /// Event considered.
    pub event_id: EventId,
    /// Why no allocation was made.
    pub reason: SkipReason,
}

/// Outcome of [`run_allocation`].
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct AllocationReport {
    /// Allocations made, in the order they were made.
    pub created: Vec<SiteAllocation>,
    /// Candidate/event pairs skipped.
    pub skipped: Vec<SkippedCandidate>,
}

/// Derives preferred sites from history.
///
/// Only rows inside the window `(as_of_year - lookback_years, as_of_year]`
/// that were not skipped count. Per stallholder, sites held for two or more
/// years win over one-off sites, and among the remaining sites only those
/// seen most recently are kept.
///
/// The result is ordered by stallholder, then site.
pub fn plan_candidates<'a>(
    history: impl IntoIterator<Item = &'a SiteHistory>,
    as_of_year: i32,
    lookback_years: u32,
) -> Vec<Candidate> {
    let window_start = as_of_year.saturating_sub(i32::try_from(lookback_years).unwrap_or(i32::MAX));

    let mut grouped: BTreeMap<(StallholderId, SiteId), Candidate> = BTreeMap::new();
    for row in history {
        if row.is_skipped || row.year <= window_start || row.year > as_of_year {
            continue;
        }
        let entry = grouped
            .entry((row.stallholder_id, row.site_id))
            .or_insert_with(|| Candidate {
                stallholder_id: row.stallholder_id,
                site_id: row.site_id,
                years: 0,
                last_year: row.year,
                total_events: 0,
                site_size: row.site_size,
            });
        entry.years += 1;
        entry.total_events = entry.total_events.saturating_add(row.number_events);
        if row.year >= entry.last_year {
            entry.last_year = row.year;
            entry.site_size = row.site_size;
        }
    }

    let mut by_stallholder: BTreeMap<StallholderId, Vec<Candidate>> = BTreeMap::new();
    for candidate in grouped.into_values() {
        by_stallholder
            .entry(candidate.stallholder_id)
            .or_default()
            .push(candidate);
    }

    let mut planned = Vec::new();
    for mut sites in by_stallholder.into_values() {
        if sites.iter().any(|c| c.years >= 2) {
            sites.retain(|c| c.years >= 2);
        }
        let Some(latest) = sites.iter().map(|c| c.last_year).max() else {
            continue;
        };
        planned.extend(sites.into_iter().filter(|c| c.last_year == latest));
    }
    planned
}

/// Puts candidates in the order an allocation run processes them.
///
/// Years held count up to `lookback`, longest first. Within the same
/// count the most recent and busiest stallholders go first; stallholder
/// and site ids break any remaining tie.
pub fn rank_candidates(candidates: &mut [Candidate], lookback: u32) {
    candidates.sort_by_key(|c| {
        (
            Reverse(c.years.min(lookback)),
            Reverse(c.last_year),
            Reverse(c.total_events),
            c.stallholder_id,
            c.site_id,
        )
    });
}

/// Allocates candidates' sites for every upcoming event.
///
/// Upcoming events are those on or after `as_of` that are not cancelled,
/// taken in (date, sequence) order. Candidates are processed in
/// [`rank_candidates`] order, from `lookback_years` years down to one.
///
/// Running it again with the same inputs creates nothing new.
pub fn run_allocation(
    state: &mut FairState,
    as_of: NaiveDate,
    lookback_years: u32,
    created_by: &str,
) -> AllocationReport {
    let lookback = lookback_years.max(1);
    let mut candidates = plan_candidates(state.site_history(), as_of.year(), lookback);
    rank_candidates(&mut candidates, lookback);

    let mut events: Vec<(NaiveDate, u8, EventId)> = state
        .events()
        .filter(|e| !e.is_cancelled && e.date >= as_of)
        .map(|e| (e.date, e.sequence, e.id))
        .collect();
    events.sort_unstable();

    let mut report = AllocationReport::default();
    for candidate in &candidates {
        for &(_, _, event_id) in &events {
            match try_allocate(state, candidate, event_id, created_by) {
                Ok(allocation) => report.created.push(allocation),
                Err(reason) => {
                    state.record(Activity::AllocationSkipped {
                        stallholder_id: candidate.stallholder_id,
                        site_id: candidate.site_id,
                        event_id,
                        reason,
                        timestamp: Utc::now(),
                    });
                    report.skipped.push(SkippedCandidate {
                        stallholder_id: candidate.stallholder_id,
                        site_id: candidate.site_id,
                        event_id,
                        reason,
                    });
                }
            }
        }
    }

    state.record(Activity::AllocationRunCompleted {
        as_of,
        created: report.created.len(),
        skipped: report.skipped.len(),
        timestamp: Utc::now(),
    });
    tracing::info!(
        %as_of,
        candidates = candidates.len(),
        events = events.len(),
        created = report.created.len(),
        skipped = report.skipped.len(),
        "allocation run finished"
    );
    report
}

fn try_allocate(
    state: &mut FairState,
    candidate: &Candidate,
    event_id: EventId,
    created_by: &str,
) -> Result<SiteAllocation, SkipReason> {
    let (event_site_id, status) = state
        .find_event_site(event_id, candidate.site_id)
        .map(|e| (e.id, e.status))
        .ok_or(SkipReason::EventSiteMissing)?;
    if state.has_allocation(candidate.stallholder_id, event_site_id) {
        return Err(SkipReason::AlreadyAllocated);
    }
    if let (Some(history), Ok(site)) = (candidate.site_size, state.site(candidate.site_id)) {
        if history != site.size {
            return Err(SkipReason::SizeMismatch {
                site: site.size,
                history,
            });
        }
    }
    if status != SiteStatus::Available {
        return Err(SkipReason::SiteTaken { status });
    }

    state
        .allocate(AllocationRequest {
            event_site_id,
            stallholder_id: candidate.stallholder_id,
            registration_id: None,
            on_hold: false,
            created_by: created_by.to_string(),
        })
        .map_err(|err| match err {
            FairError::SiteNotAvailable { status, .. } => SkipReason::SiteTaken { status },
            FairError::DuplicateAllocation { .. } => SkipReason::AlreadyAllocated,
            _ => SkipReason::EventSiteMissing,
        })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::fair_state::HistoryRecord;
    use crate::domain::fair_state::tests::{Fixture, fixture};
    use crate::domain::ids::SiteHistoryId;
    use crate::domain::site_status::SiteTransition;

    fn as_of() -> NaiveDate {
        let Some(date) = NaiveDate::from_ymd_opt(2026, 10, 1) else {
            panic!("valid date");
        };
        date
    }

    fn site(fx: &Fixture, idx: usize) -> SiteId {
        let Some(site) = fx.sites.get(idx) else {
            panic!("no site {idx}");
        };
        *site
    }

    fn history(fx: &mut Fixture, holder: StallholderId, site_id: SiteId, years: &[i32]) {
        for &year in years {
            let Ok(_) = fx.state.record_site_history(HistoryRecord {
                stallholder_id: holder,
                site_id,
                year,
                number_events: 2,
                is_skipped: false,
                site_size: None,
            }) else {
                panic!("history insert failed");
            };
        }
    }

    fn row(holder: StallholderId, site_id: SiteId, year: i32, is_skipped: bool) -> SiteHistory {
        SiteHistory {
            id: SiteHistoryId::new(),
            stallholder_id: holder,
            site_id,
            year,
            number_events: 1,
            is_skipped,
            site_size: None,
        }
    }

    #[test]
    fn plan_prefers_repeated_sites() {
        let holder = StallholderId::new();
        let habitual = SiteId::new();
        let one_off = SiteId::new();
        let rows = vec![
            row(holder, habitual, 2023, false),
            row(holder, habitual, 2024, false),
            row(holder, one_off, 2025, false),
        ];

        let planned = plan_candidates(&rows, 2026, 4);
        assert_eq!(planned.len(), 1);
        let Some(candidate) = planned.first() else {
            panic!("no candidate");
        };
        assert_eq!(candidate.site_id, habitual);
        assert_eq!(candidate.years, 2);
        assert_eq!(candidate.last_year, 2024);
    }

    #[test]
    fn plan_ignores_rows_outside_window_and_skipped() {
        let holder = StallholderId::new();
        let site_id = SiteId::new();
        let rows = vec![
            row(holder, site_id, 2020, false),
            row(holder, site_id, 2022, false),
            row(holder, site_id, 2025, true),
        ];
        assert!(plan_candidates(&rows, 2026, 4).is_empty());

        let rows = vec![row(holder, site_id, 2023, false)];
        let planned = plan_candidates(&rows, 2026, 4);
        assert_eq!(planned.len(), 1);
    }

    #[test]
    fn plan_keeps_latest_of_single_year_sites() {
        let holder = StallholderId::new();
        let older = SiteId::new();
        let newer = SiteId::new();
        let rows = vec![row(holder, older, 2024, false), row(holder, newer, 2025, false)];

        let planned = plan_candidates(&rows, 2026, 4);
        let sites: Vec<SiteId> = planned.iter().map(|c| c.site_id).collect();
        assert_eq!(sites, vec![newer]);
    }

    #[test]
    fn ranking_puts_longest_history_first() {
        let early_id = StallholderId::from_uuid(uuid::Uuid::from_u128(1));
        let late_id = StallholderId::from_uuid(uuid::Uuid::from_u128(2));
        let two_year_site = SiteId::new();
        let four_year_site = SiteId::new();
        let mut rows = vec![
            row(early_id, two_year_site, 2024, false),
            row(early_id, two_year_site, 2025, false),
        ];
        for year in 2022..=2025 {
            rows.push(row(late_id, four_year_site, year, false));
        }

        let mut planned = plan_candidates(&rows, 2026, 4);
        rank_candidates(&mut planned, 4);
        let order: Vec<StallholderId> = planned.iter().map(|c| c.stallholder_id).collect();
        assert_eq!(order, vec![late_id, early_id]);
    }

    #[test]
    fn run_allocates_habitual_site() {
        let mut fx = fixture(2);
        let holder = StallholderId::new();
        let target = site(&fx, 0);
        history(&mut fx, holder, target, &[2024, 2025]);

        let report = run_allocation(&mut fx.state, as_of(), 4, "site-allocation");
        assert_eq!(report.created.len(), 1);
        assert!(report.skipped.is_empty());

        let Some(event_site) = fx.state.find_event_site(fx.event, target) else {
            panic!("event site missing");
        };
        assert_eq!(event_site.status, SiteStatus::Allocated);
        assert!(fx.state.inconsistent_event_sites().is_empty());
    }

    #[test]
    fn rerun_is_idempotent() {
        let mut fx = fixture(1);
        let holder = StallholderId::new();
        let target = site(&fx, 0);
        history(&mut fx, holder, target, &[2023, 2024, 2025]);

        let first = run_allocation(&mut fx.state, as_of(), 4, "site-allocation");
        assert_eq!(first.created.len(), 1);

        let second = run_allocation(&mut fx.state, as_of(), 4, "site-allocation");
        assert!(second.created.is_empty());
        assert_eq!(
            second.skipped.first().map(|s| s.reason),
            Some(SkipReason::AlreadyAllocated)
        );
        assert_eq!(fx.state.allocations().count(), 1);
    }

    #[test]
    fn longer_history_wins_contested_site() {
        let mut fx = fixture(1);
        let regular = StallholderId::new();
        let newcomer = StallholderId::new();
        let target = site(&fx, 0);
        history(&mut fx, regular, target, &[2022, 2023, 2024, 2025]);
        history(&mut fx, newcomer, target, &[2024, 2025]);

        let report = run_allocation(&mut fx.state, as_of(), 4, "site-allocation");
        let holders: Vec<StallholderId> = report.created.iter().map(|a| a.stallholder_id).collect();
        assert_eq!(holders, vec![regular]);

        let Some(skip) = report.skipped.first() else {
            panic!("newcomer should be skipped");
        };
        assert_eq!(skip.stallholder_id, newcomer);
        assert_eq!(
            skip.reason,
            SkipReason::SiteTaken {
                status: SiteStatus::Allocated
            }
        );
    }

    #[test]
    fn size_mismatch_is_skipped() {
        let mut fx = fixture(1);
        let holder = StallholderId::new();
        let target = site(&fx, 0);
        let Ok(_) = fx.state.record_site_history(HistoryRecord {
            stallholder_id: holder,
            site_id: target,
            year: 2025,
            number_events: 2,
            is_skipped: false,
            site_size: Some(SiteSize::Half),
        }) else {
            panic!("history insert failed");
        };

        let report = run_allocation(&mut fx.state, as_of(), 4, "site-allocation");
        assert!(report.created.is_empty());
        assert_eq!(
            report.skipped.first().map(|s| s.reason),
            Some(SkipReason::SizeMismatch {
                site: SiteSize::Full,
                history: SiteSize::Half,
            })
        );
    }

    #[test]
    fn past_and_cancelled_events_are_ignored() {
        let mut fx = fixture(1);
        let holder = StallholderId::new();
        let target = site(&fx, 0);
        history(&mut fx, holder, target, &[2025]);

        let Ok(_) = fx.state.cancel_event(fx.event) else {
            panic!("cancel failed");
        };
        let report = run_allocation(&mut fx.state, as_of(), 4, "site-allocation");
        assert!(report.created.is_empty());
        assert!(report.skipped.is_empty());

        let mut fx = fixture(1);
        let target = site(&fx, 0);
        history(&mut fx, holder, target, &[2025]);
        let Some(later) = NaiveDate::from_ymd_opt(2026, 12, 31) else {
            panic!("valid date");
        };
        let report = run_allocation(&mut fx.state, later, 4, "site-allocation");
        assert!(report.created.is_empty());
    }

    #[test]
    fn run_records_skip_and_summary_activities() {
        let mut fx = fixture(1);
        let holder = StallholderId::new();
        let target = site(&fx, 0);
        history(&mut fx, holder, target, &[2025]);
        let Some(event_site) = fx.state.find_event_site(fx.event, target).map(|e| e.id) else {
            panic!("event site missing");
        };
        let Ok(_) = fx.state.transition_event_site(event_site, SiteTransition::Withdraw) else {
            panic!("withdraw failed");
        };
        fx.state.drain_activities();

        let _ = run_allocation(&mut fx.state, as_of(), 4, "site-allocation");
        let kinds: Vec<&str> = fx.state.drain_activities().iter().map(Activity::kind).collect();
        assert_eq!(kinds, vec!["allocation_skipped", "allocation_run_completed"]);
    }
}
