//! Allocation service: inventory, allocations, and the allocation engine.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};

use super::execute;
use crate::domain::allocation::{plan_candidates, rank_candidates, run_allocation};
use crate::domain::cleanup::delete_unregistered_allocations;
use crate::domain::site_history::rebuild_site_history;
use crate::domain::{
    ActivityBus, AllocationId, AllocationReport, AllocationRequest, Candidate, CleanupReport,
    Event, EventId, EventSite, EventSiteId, Fair, FairId, FairStore, HistoryRebuild,
    HistoryRecord, RegistrationId, Site, SiteAllocation, SiteHistory, SiteId, SiteSize,
    SiteStatus, SiteTransition, StallholderId, Zone, ZoneId,
};
use crate::error::FairError;

/// Tunables of the allocation run.
#[derive(Debug, Clone)]
pub struct AllocationSettings {
    /// Years of history the run looks back over.
    pub lookback_years: u32,
    /// Creator tag stamped on allocations the run makes.
    pub created_by: String,
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self {
            lookback_years: 4,
            created_by: "site-allocation".to_string(),
        }
    }
}

/// Filters for listing event sites.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventSiteFilter {
    /// Only event sites of this event.
    pub event_id: Option<EventId>,
    /// Only event sites in this status.
    pub status: Option<SiteStatus>,
}

/// Filters for listing allocations.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllocationFilter {
    /// Only allocations of this stallholder.
    pub stallholder_id: Option<StallholderId>,
    /// Only allocations on event sites of this event.
    pub event_id: Option<EventId>,
    /// Only allocations without a registration.
    pub unregistered: bool,
}

/// Orchestration layer for the site allocation engine.
///
/// Owns a reference to the [`FairStore`] for state and an [`ActivityBus`]
/// for activity emission. Every mutation follows the pattern: acquire the
/// write lock → run the command → release → publish activities → log.
#[derive(Debug, Clone)]
pub struct AllocationService {
    store: Arc<FairStore>,
    activity_bus: ActivityBus,
    settings: AllocationSettings,
}

impl AllocationService {
    /// Creates a new `AllocationService`.
    #[must_use]
    pub fn new(
        store: Arc<FairStore>,
        activity_bus: ActivityBus,
        settings: AllocationSettings,
    ) -> Self {
        Self {
            store,
            activity_bus,
            settings,
        }
    }

    /// Returns a reference to the inner [`FairStore`].
    #[must_use]
    pub fn store(&self) -> &Arc<FairStore> {
        &self.store
    }

    /// Returns a reference to the inner [`ActivityBus`].
    #[must_use]
    pub fn activity_bus(&self) -> &ActivityBus {
        &self.activity_bus
    }

    /// Returns the allocation run settings.
    #[must_use]
    pub fn settings(&self) -> &AllocationSettings {
        &self.settings
    }

    // ── Inventory ───────────────────────────────────────────────────────

    /// Creates a zone.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::InvalidRequest`] for an empty name.
    pub async fn create_zone(&self, name: &str) -> Result<Zone, FairError> {
        let name = required_name(name)?;
        let zone = execute(&self.store, &self.activity_bus, |s| Ok(s.add_zone(name))).await?;
        tracing::info!(zone_id = %zone.id, name = %zone.name, "zone created");
        Ok(zone)
    }

    /// Creates a site in a zone.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::InvalidRequest`] for an empty name and
    /// [`FairError::NotFound`] for an unknown zone.
    pub async fn create_site(
        &self,
        name: &str,
        zone_id: ZoneId,
        size: SiteSize,
    ) -> Result<Site, FairError> {
        let name = required_name(name)?;
        let site = execute(&self.store, &self.activity_bus, |s| {
            s.add_site(name, zone_id, size)
        })
        .await?;
        tracing::info!(site_id = %site.id, %zone_id, "site created");
        Ok(site)
    }

    /// Creates a fair season.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::InvalidRequest`] for an empty name.
    pub async fn create_fair(
        &self,
        year: i32,
        name: &str,
        is_activated: bool,
    ) -> Result<Fair, FairError> {
        let name = required_name(name)?;
        let fair = execute(&self.store, &self.activity_bus, |s| {
            Ok(s.add_fair(year, name, is_activated))
        })
        .await?;
        tracing::info!(fair_id = %fair.id, year, "fair created");
        Ok(fair)
    }

    /// Creates an event day.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::InvalidRequest`] for an empty name and
    /// [`FairError::NotFound`] for an unknown fair.
    pub async fn create_event(
        &self,
        fair_id: FairId,
        name: &str,
        date: NaiveDate,
        sequence: u8,
    ) -> Result<Event, FairError> {
        let name = required_name(name)?;
        let event = execute(&self.store, &self.activity_bus, |s| {
            s.add_event(fair_id, name, date, sequence)
        })
        .await?;
        tracing::info!(event_id = %event.id, %fair_id, %date, "event created");
        Ok(event)
    }

    /// Cancels an event.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] for an unknown event.
    pub async fn cancel_event(&self, event_id: EventId) -> Result<Event, FairError> {
        let event = execute(&self.store, &self.activity_bus, |s| s.cancel_event(event_id)).await?;
        tracing::info!(%event_id, "event cancelled");
        Ok(event)
    }

    /// Creates one event site.
    ///
    /// # Errors
    ///
    /// See [`crate::domain::FairState::add_event_site`].
    pub async fn create_event_site(
        &self,
        event_id: EventId,
        site_id: SiteId,
    ) -> Result<EventSite, FairError> {
        let event_site = execute(&self.store, &self.activity_bus, |s| {
            s.add_event_site(event_id, site_id)
        })
        .await?;
        tracing::info!(event_site_id = %event_site.id, %event_id, %site_id, "event site created");
        Ok(event_site)
    }

    /// Creates the missing event sites of an event.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] for an unknown event.
    pub async fn generate_event_sites(
        &self,
        event_id: EventId,
    ) -> Result<Vec<EventSite>, FairError> {
        let created = execute(&self.store, &self.activity_bus, |s| {
            s.generate_event_sites(event_id)
        })
        .await?;
        tracing::info!(%event_id, created = created.len(), "event sites generated");
        Ok(created)
    }

    /// Records one site history row.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] for an unknown site.
    pub async fn record_site_history(
        &self,
        record: HistoryRecord,
    ) -> Result<SiteHistory, FairError> {
        let row = execute(&self.store, &self.activity_bus, |s| {
            s.record_site_history(record)
        })
        .await?;
        tracing::debug!(
            stallholder_id = %row.stallholder_id,
            site_id = %row.site_id,
            year = row.year,
            "site history recorded"
        );
        Ok(row)
    }

    // ── Allocation commands ─────────────────────────────────────────────

    /// Allocates an event site to a stallholder.
    ///
    /// # Errors
    ///
    /// See [`crate::domain::FairState::allocate`].
    pub async fn allocate(&self, request: AllocationRequest) -> Result<SiteAllocation, FairError> {
        let allocation = execute(&self.store, &self.activity_bus, |s| s.allocate(request)).await?;
        tracing::info!(
            allocation_id = %allocation.id,
            stallholder_id = %allocation.stallholder_id,
            event_site_id = %allocation.event_site_id,
            "site allocated"
        );
        Ok(allocation)
    }

    /// Deletes an allocation, optionally overriding the status guard.
    ///
    /// # Errors
    ///
    /// See [`crate::domain::FairState::deallocate`].
    pub async fn deallocate(
        &self,
        allocation_id: AllocationId,
        force: bool,
    ) -> Result<SiteAllocation, FairError> {
        let allocation = execute(&self.store, &self.activity_bus, |s| {
            s.deallocate(allocation_id, force)
        })
        .await?;
        tracing::info!(%allocation_id, force, "allocation removed");
        Ok(allocation)
    }

    /// Changes the hold flag and/or registration of an allocation.
    ///
    /// # Errors
    ///
    /// See [`crate::domain::FairState::update_allocation`].
    pub async fn update_allocation(
        &self,
        allocation_id: AllocationId,
        on_hold: Option<bool>,
        registration_id: Option<RegistrationId>,
    ) -> Result<SiteAllocation, FairError> {
        let allocation = execute(&self.store, &self.activity_bus, |s| {
            s.update_allocation(allocation_id, on_hold, registration_id)
        })
        .await?;
        tracing::info!(%allocation_id, on_hold = allocation.on_hold, "allocation updated");
        Ok(allocation)
    }

    /// Applies a status transition to an event site.
    ///
    /// # Errors
    ///
    /// See [`crate::domain::FairState::transition_event_site`].
    pub async fn transition_event_site(
        &self,
        event_site_id: EventSiteId,
        transition: SiteTransition,
    ) -> Result<EventSite, FairError> {
        let event_site = execute(&self.store, &self.activity_bus, |s| {
            s.transition_event_site(event_site_id, transition)
        })
        .await?;
        tracing::info!(
            %event_site_id,
            ?transition,
            status = %event_site.status,
            "event site transitioned"
        );
        Ok(event_site)
    }

    /// Runs the history-driven allocation for upcoming events.
    ///
    /// `as_of` defaults to today's date and `lookback_years` to the
    /// configured lookback.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::InvalidRequest`] for a zero lookback.
    pub async fn run_allocation(
        &self,
        as_of: Option<NaiveDate>,
        lookback_years: Option<u32>,
    ) -> Result<AllocationReport, FairError> {
        let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
        let lookback = self.lookback(lookback_years)?;
        let created_by = self.settings.created_by.as_str();
        execute(&self.store, &self.activity_bus, |s| {
            Ok(run_allocation(s, as_of, lookback, created_by))
        })
        .await
    }

    /// Lists the candidates an allocation run would consider, in the order
    /// it would process them, without allocating anything.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::InvalidRequest`] for a zero lookback.
    pub async fn preview_candidates(
        &self,
        as_of: Option<NaiveDate>,
        lookback_years: Option<u32>,
    ) -> Result<Vec<Candidate>, FairError> {
        let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
        let lookback = self.lookback(lookback_years)?;
        let state = self.store.read().await;
        let mut candidates = plan_candidates(state.site_history(), as_of.year(), lookback);
        rank_candidates(&mut candidates, lookback);
        Ok(candidates)
    }

    fn lookback(&self, lookback_years: Option<u32>) -> Result<u32, FairError> {
        match lookback_years.unwrap_or(self.settings.lookback_years) {
            0 => Err(FairError::InvalidRequest(
                "lookback_years must be at least 1".to_string(),
            )),
            lookback => Ok(lookback),
        }
    }

    /// Deletes allocations nobody registered for.
    ///
    /// # Errors
    ///
    /// Never fails today; the signature matches the other commands.
    pub async fn cleanup_unregistered(&self) -> Result<CleanupReport, FairError> {
        execute(&self.store, &self.activity_bus, |s| {
            Ok(delete_unregistered_allocations(s))
        })
        .await
    }

    /// Rebuilds a fair year's site history from booked allocations.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] for an unknown fair.
    pub async fn rebuild_site_history(&self, fair_id: FairId) -> Result<HistoryRebuild, FairError> {
        execute(&self.store, &self.activity_bus, |s| rebuild_site_history(s, fair_id)).await
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Lists zones.
    pub async fn list_zones(&self) -> Vec<Zone> {
        self.store.read().await.zones().cloned().collect()
    }

    /// Lists sites, optionally of one zone.
    pub async fn list_sites(&self, zone_id: Option<ZoneId>) -> Vec<Site> {
        let state = self.store.read().await;
        state
            .sites()
            .filter(|s| zone_id.is_none_or(|z| s.zone_id == z))
            .cloned()
            .collect()
    }

    /// Lists fairs.
    pub async fn list_fairs(&self) -> Vec<Fair> {
        self.store.read().await.fairs().cloned().collect()
    }

    /// Lists events in date order, optionally of one fair.
    pub async fn list_events(&self, fair_id: Option<FairId>) -> Vec<Event> {
        let state = self.store.read().await;
        let mut events: Vec<Event> = state
            .events()
            .filter(|e| fair_id.is_none_or(|f| e.fair_id == f))
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.date, e.sequence));
        events
    }

    /// Lists event sites matching a filter.
    pub async fn list_event_sites(&self, filter: EventSiteFilter) -> Vec<EventSite> {
        let state = self.store.read().await;
        state
            .event_sites()
            .filter(|e| filter.event_id.is_none_or(|id| e.event_id == id))
            .filter(|e| filter.status.is_none_or(|st| e.status == st))
            .cloned()
            .collect()
    }

    /// Returns one event site.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if it does not exist.
    pub async fn get_event_site(&self, event_site_id: EventSiteId) -> Result<EventSite, FairError> {
        self.store.read().await.event_site(event_site_id).cloned()
    }

    /// Lists allocations matching a filter.
    pub async fn list_allocations(&self, filter: AllocationFilter) -> Vec<SiteAllocation> {
        let state = self.store.read().await;
        state
            .allocations()
            .filter(|a| filter.stallholder_id.is_none_or(|id| a.stallholder_id == id))
            .filter(|a| !filter.unregistered || a.registration_id.is_none())
            .filter(|a| {
                filter.event_id.is_none_or(|id| {
                    state
                        .event_site(a.event_site_id)
                        .is_ok_and(|e| e.event_id == id)
                })
            })
            .cloned()
            .collect()
    }

    /// Returns one allocation.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if it does not exist.
    pub async fn get_allocation(
        &self,
        allocation_id: AllocationId,
    ) -> Result<SiteAllocation, FairError> {
        self.store.read().await.allocation(allocation_id).cloned()
    }

    /// Lists site history rows, optionally of one stallholder or year.
    pub async fn list_site_history(
        &self,
        stallholder_id: Option<StallholderId>,
        year: Option<i32>,
    ) -> Vec<SiteHistory> {
        let state = self.store.read().await;
        state
            .site_history()
            .filter(|h| stallholder_id.is_none_or(|id| h.stallholder_id == id))
            .filter(|h| year.is_none_or(|y| h.year == y))
            .cloned()
            .collect()
    }
}

fn required_name(name: &str) -> Result<String, FairError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(FairError::InvalidRequest("name must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}
