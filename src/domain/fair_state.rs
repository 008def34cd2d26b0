//! The fair aggregate: every entity plus the commands that keep them
//! consistent.
//!
//! Commands change related records together. `allocate` creates the
//! allocation and flips the event site to allocated in one step, and
//! `deallocate` removes it and frees the site. A caller holding the
//! [`super::FairStore`] write lock therefore never observes an event site
//! whose status disagrees with its allocations.
//!
//! Each command records [`Activity`] values in an outbox. The service layer
//! drains the outbox after releasing the lock and publishes it.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::activity::{Activity, ActivityCategory};
use super::booking_status::{BookingStatus, BookingTransition};
use super::ids::{
    AllocationId, EventId, EventSiteId, FairId, LicenceBatchId, LicenceId, PaymentId,
    RegistrationId, SiteHistoryId, SiteId, StallholderId, ZoneId,
};
use super::licence_status::{LicenceStatus, LicenceTransition};
use super::machine::{Transition, apply};
use super::model::{
    Event, EventSite, Fair, FoodLicence, FoodLicenceBatch, PaymentHistory, Site, SiteAllocation,
    SiteHistory, SiteSize, StallRegistration, Zone,
};
use super::payment_status::{PaymentStatus, PaymentTransition};
use super::site_status::{SiteStatus, SiteTransition};
use crate::error::FairError;

/// Parameters of an allocation request.
#[derive(Debug, Clone)]
pub struct AllocationRequest {
    /// Event site to allocate.
    pub event_site_id: EventSiteId,
    /// Stallholder receiving the site.
    pub stallholder_id: StallholderId,
    /// Registration confirming the allocation, if the stallholder applied.
    pub registration_id: Option<RegistrationId>,
    /// Protect the allocation from the cleanup job.
    pub on_hold: bool,
    /// Creator tag.
    pub created_by: String,
}

/// Parameters of a site history row.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    /// Stallholder.
    pub stallholder_id: StallholderId,
    /// Site occupied.
    pub site_id: SiteId,
    /// Fair year.
    pub year: i32,
    /// Events attended on the site.
    pub number_events: u32,
    /// Site skipped that year.
    pub is_skipped: bool,
    /// Size booked that year.
    pub site_size: Option<SiteSize>,
}

/// Parameters of a new registration.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Fair applied to.
    pub fair_id: FairId,
    /// Applicant.
    pub stallholder_id: StallholderId,
    /// Requested site size.
    pub site_size: Option<SiteSize>,
    /// Whether the stall sells food.
    pub selling_food: bool,
    /// Invoice total in cents.
    pub total_charge_cents: i64,
}

/// All fair records.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FairState {
    zones: BTreeMap<ZoneId, Zone>,
    sites: BTreeMap<SiteId, Site>,
    fairs: BTreeMap<FairId, Fair>,
    events: BTreeMap<EventId, Event>,
    event_sites: BTreeMap<EventSiteId, EventSite>,
    allocations: BTreeMap<AllocationId, SiteAllocation>,
    site_history: BTreeMap<SiteHistoryId, SiteHistory>,
    registrations: BTreeMap<RegistrationId, StallRegistration>,
    payments: BTreeMap<PaymentId, PaymentHistory>,
    licences: BTreeMap<LicenceId, FoodLicence>,
    licence_batches: BTreeMap<LicenceBatchId, FoodLicenceBatch>,
    #[serde(skip)]
    outbox: Vec<Activity>,
}

impl FairState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the activities recorded since the last drain.
    pub fn drain_activities(&mut self) -> Vec<Activity> {
        std::mem::take(&mut self.outbox)
    }

    pub(crate) fn record(&mut self, activity: Activity) {
        self.outbox.push(activity);
    }

    // ── Inventory ───────────────────────────────────────────────────────

    /// Adds a zone.
    pub fn add_zone(&mut self, name: String) -> Zone {
        let zone = Zone {
            id: ZoneId::new(),
            name,
        };
        self.zones.insert(zone.id, zone.clone());
        zone
    }

    /// Adds a site to an existing zone.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if the zone does not exist.
    pub fn add_site(
        &mut self,
        name: String,
        zone_id: ZoneId,
        size: SiteSize,
    ) -> Result<Site, FairError> {
        self.zone(zone_id)?;
        let site = Site {
            id: SiteId::new(),
            name,
            zone_id,
            size,
            is_active: true,
        };
        self.sites.insert(site.id, site.clone());
        Ok(site)
    }

    /// Adds a fair season.
    pub fn add_fair(&mut self, year: i32, name: String, is_activated: bool) -> Fair {
        let fair = Fair {
            id: FairId::new(),
            year,
            name,
            is_activated,
        };
        self.fairs.insert(fair.id, fair.clone());
        fair
    }

    /// Adds an event day to a fair.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if the fair does not exist.
    pub fn add_event(
        &mut self,
        fair_id: FairId,
        name: String,
        date: NaiveDate,
        sequence: u8,
    ) -> Result<Event, FairError> {
        self.fair(fair_id)?;
        let event = Event {
            id: EventId::new(),
            fair_id,
            name,
            date,
            sequence,
            is_cancelled: false,
        };
        self.events.insert(event.id, event.clone());
        Ok(event)
    }

    /// Marks an event cancelled so allocation runs ignore it.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if the event does not exist.
    pub fn cancel_event(&mut self, event_id: EventId) -> Result<Event, FairError> {
        let event = self
            .events
            .get_mut(&event_id)
            .ok_or_else(|| FairError::not_found("event", event_id))?;
        event.is_cancelled = true;
        Ok(event.clone())
    }

    /// Adds an available event site for the (event, site) pair.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] for an unknown event or site and
    /// [`FairError::DuplicateEventSite`] if the pair already exists.
    pub fn add_event_site(
        &mut self,
        event_id: EventId,
        site_id: SiteId,
    ) -> Result<EventSite, FairError> {
        self.event(event_id)?;
        self.site(site_id)?;
        if self.find_event_site(event_id, site_id).is_some() {
            return Err(FairError::DuplicateEventSite {
                event: event_id,
                site: site_id,
            });
        }
        let event_site = EventSite {
            id: EventSiteId::new(),
            event_id,
            site_id,
            status: SiteStatus::Available,
        };
        self.event_sites.insert(event_site.id, event_site.clone());
        Ok(event_site)
    }

    /// Creates the missing event sites of an event, one per active site.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if the event does not exist.
    pub fn generate_event_sites(&mut self, event_id: EventId) -> Result<Vec<EventSite>, FairError> {
        self.event(event_id)?;
        let missing: Vec<SiteId> = self
            .sites
            .values()
            .filter(|s| s.is_active && self.find_event_site(event_id, s.id).is_none())
            .map(|s| s.id)
            .collect();
        let mut created = Vec::with_capacity(missing.len());
        for site_id in missing {
            created.push(self.add_event_site(event_id, site_id)?);
        }
        Ok(created)
    }

    /// Inserts or updates the history row for (stallholder, site, year).
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if the site does not exist.
    pub fn record_site_history(&mut self, record: HistoryRecord) -> Result<SiteHistory, FairError> {
        self.site(record.site_id)?;
        let existing = self
            .site_history
            .values()
            .find(|h| {
                h.stallholder_id == record.stallholder_id
                    && h.site_id == record.site_id
                    && h.year == record.year
            })
            .map(|h| h.id);
        let row = SiteHistory {
            id: existing.unwrap_or_default(),
            stallholder_id: record.stallholder_id,
            site_id: record.site_id,
            year: record.year,
            number_events: record.number_events,
            is_skipped: record.is_skipped,
            site_size: record.site_size,
        };
        self.site_history.insert(row.id, row.clone());
        Ok(row)
    }

    pub(crate) fn remove_site_history(&mut self, id: SiteHistoryId) -> Option<SiteHistory> {
        self.site_history.remove(&id)
    }

    /// Adds a registration in the `Created` state.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if the fair does not exist and
    /// [`FairError::InvalidRequest`] for a negative charge.
    pub fn add_registration(
        &mut self,
        request: RegistrationRequest,
    ) -> Result<StallRegistration, FairError> {
        self.fair(request.fair_id)?;
        if request.total_charge_cents < 0 {
            return Err(FairError::InvalidRequest(
                "total charge must not be negative".to_string(),
            ));
        }
        let registration = StallRegistration {
            id: RegistrationId::new(),
            fair_id: request.fair_id,
            stallholder_id: request.stallholder_id,
            booking_status: BookingStatus::Created,
            site_size: request.site_size,
            selling_food: request.selling_food,
            total_charge_cents: request.total_charge_cents,
            created_at: Utc::now(),
        };
        self.registrations
            .insert(registration.id, registration.clone());
        Ok(registration)
    }

    /// Adds a pending payment record for a registration.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if the registration does not exist
    /// and [`FairError::InvalidRequest`] for a non-positive amount.
    pub fn add_payment(
        &mut self,
        registration_id: RegistrationId,
        amount_to_pay_cents: i64,
    ) -> Result<PaymentHistory, FairError> {
        self.registration(registration_id)?;
        if amount_to_pay_cents <= 0 {
            return Err(FairError::InvalidRequest(
                "amount to pay must be positive".to_string(),
            ));
        }
        let now = Utc::now();
        let payment = PaymentHistory {
            id: PaymentId::new(),
            registration_id,
            amount_to_pay_cents,
            amount_paid_cents: 0,
            status: PaymentStatus::Pending,
            date_created: now,
            date_updated: now,
        };
        self.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    /// Adds a food licence request for a food-selling registration.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if the registration does not exist
    /// and [`FairError::InvalidRequest`] if it does not sell food.
    pub fn add_licence(
        &mut self,
        registration_id: RegistrationId,
    ) -> Result<FoodLicence, FairError> {
        if !self.registration(registration_id)?.selling_food {
            return Err(FairError::InvalidRequest(format!(
                "registration {registration_id} does not sell food"
            )));
        }
        let licence = FoodLicence {
            id: LicenceId::new(),
            registration_id,
            status: LicenceStatus::Created,
            batch_id: None,
            date_requested: Utc::now(),
            date_completed: None,
        };
        self.licences.insert(licence.id, licence.clone());
        Ok(licence)
    }

    // ── Allocation commands ─────────────────────────────────────────────

    /// Allocates an available event site to a stallholder.
    ///
    /// # Errors
    ///
    /// - [`FairError::NotFound`] for an unknown event site or registration.
    /// - [`FairError::DuplicateAllocation`] if the stallholder already holds
    ///   the event site.
    /// - [`FairError::SiteNotAvailable`] if the event site is not available.
    pub fn allocate(&mut self, request: AllocationRequest) -> Result<SiteAllocation, FairError> {
        let event_site = self.event_site(request.event_site_id)?.clone();
        if let Some(registration_id) = request.registration_id {
            self.registration(registration_id)?;
        }
        if self.allocations.values().any(|a| {
            a.stallholder_id == request.stallholder_id && a.event_site_id == request.event_site_id
        }) {
            return Err(FairError::DuplicateAllocation {
                stallholder: request.stallholder_id,
                event_site: request.event_site_id,
            });
        }
        if !SiteTransition::Allocate.allowed_from(event_site.status) {
            return Err(FairError::SiteNotAvailable {
                event_site: event_site.id,
                status: event_site.status,
            });
        }

        let allocation = SiteAllocation {
            id: AllocationId::new(),
            stallholder_id: request.stallholder_id,
            event_site_id: event_site.id,
            registration_id: request.registration_id,
            on_hold: request.on_hold,
            created_by: request.created_by,
            created_at: Utc::now(),
        };
        self.allocations.insert(allocation.id, allocation.clone());
        self.set_site_status(event_site.id, SiteTransition::Allocate)?;

        self.record(Activity::AllocationCreated {
            allocation_id: allocation.id,
            stallholder_id: allocation.stallholder_id,
            event_site_id: event_site.id,
            event_id: event_site.event_id,
            site_id: event_site.site_id,
            created_by: allocation.created_by.clone(),
            timestamp: allocation.created_at,
        });
        Ok(allocation)
    }

    /// Deletes an allocation and frees its event site.
    ///
    /// Without `force`, deletion is refused once the event site has moved
    /// past allocated.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] for an unknown allocation and
    /// [`FairError::DeleteBlocked`] when the status guard refuses.
    pub fn deallocate(
        &mut self,
        allocation_id: AllocationId,
        force: bool,
    ) -> Result<SiteAllocation, FairError> {
        let allocation = self.allocation(allocation_id)?.clone();
        let event_site = self.event_site(allocation.event_site_id)?.clone();
        if event_site.status.is_past_allocated() && !force {
            return Err(FairError::DeleteBlocked {
                allocation: allocation_id,
                status: event_site.status,
            });
        }

        self.allocations.remove(&allocation_id);
        let still_referenced = self
            .allocations
            .values()
            .any(|a| a.event_site_id == event_site.id);
        if !still_referenced
            && !matches!(event_site.status, SiteStatus::Available | SiteStatus::Archived)
        {
            self.force_site_status(event_site.id, SiteStatus::Available);
        }

        self.record(Activity::AllocationRemoved {
            allocation_id,
            stallholder_id: allocation.stallholder_id,
            event_site_id: event_site.id,
            forced: force && event_site.status.is_past_allocated(),
            timestamp: Utc::now(),
        });
        Ok(allocation)
    }

    /// Changes the hold flag and/or the registration link of an allocation.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] for an unknown allocation or
    /// registration, and [`FairError::InvalidRequest`] if the registration
    /// belongs to another stallholder.
    pub fn update_allocation(
        &mut self,
        allocation_id: AllocationId,
        on_hold: Option<bool>,
        registration_id: Option<RegistrationId>,
    ) -> Result<SiteAllocation, FairError> {
        let owner = self.allocation(allocation_id)?.stallholder_id;
        if let Some(registration_id) = registration_id {
            if self.registration(registration_id)?.stallholder_id != owner {
                return Err(FairError::InvalidRequest(format!(
                    "registration {registration_id} belongs to another stallholder"
                )));
            }
        }
        let allocation = self
            .allocations
            .get_mut(&allocation_id)
            .ok_or_else(|| FairError::not_found("allocation", allocation_id))?;
        if let Some(on_hold) = on_hold {
            allocation.on_hold = on_hold;
        }
        if registration_id.is_some() {
            allocation.registration_id = registration_id;
        }
        let allocation = allocation.clone();
        self.record_allocation_update(&allocation);
        Ok(allocation)
    }

    fn record_allocation_update(&mut self, allocation: &SiteAllocation) {
        self.record(Activity::AllocationUpdated {
            allocation_id: allocation.id,
            on_hold: allocation.on_hold,
            registration_id: allocation.registration_id,
            timestamp: Utc::now(),
        });
    }

    /// Applies a status transition to an event site.
    ///
    /// `allocate` is reserved for [`FairState::allocate`]. Transitions that
    /// need an allocation (pending, booked) are refused on an unallocated
    /// site. Transitions that free the site are refused while an allocation
    /// still references it. `archive` works either way and keeps the holder.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`], [`FairError::InvalidTransition`] or
    /// [`FairError::AllocationConflict`].
    pub fn transition_event_site(
        &mut self,
        event_site_id: EventSiteId,
        transition: SiteTransition,
    ) -> Result<EventSite, FairError> {
        let status = self.event_site(event_site_id)?.status;
        let allocated = self
            .allocations
            .values()
            .any(|a| a.event_site_id == event_site_id);
        if transition == SiteTransition::Allocate {
            return Err(FairError::AllocationConflict(
                "event sites are allocated through the allocation endpoint".to_string(),
            ));
        }
        match transition.requires_allocation() {
            Some(true) if !allocated => {
                return Err(FairError::AllocationConflict(format!(
                    "event site {event_site_id} has no allocation to {transition:?}"
                )));
            }
            Some(false) if allocated => {
                return Err(FairError::AllocationConflict(format!(
                    "event site {event_site_id} is still allocated; remove the allocation first"
                )));
            }
            _ => {}
        }
        apply(status, transition)?;
        self.set_site_status(event_site_id, transition)
    }

    fn set_site_status(
        &mut self,
        event_site_id: EventSiteId,
        transition: SiteTransition,
    ) -> Result<EventSite, FairError> {
        let event_site = self
            .event_sites
            .get_mut(&event_site_id)
            .ok_or_else(|| FairError::not_found("event site", event_site_id))?;
        let from = event_site.status;
        let to = apply(from, transition)?;
        event_site.status = to;
        let event_site = event_site.clone();
        self.record(Activity::SiteStatusChanged {
            event_site_id,
            from,
            to,
            timestamp: Utc::now(),
        });
        Ok(event_site)
    }

    fn force_site_status(&mut self, event_site_id: EventSiteId, to: SiteStatus) {
        if let Some(event_site) = self.event_sites.get_mut(&event_site_id) {
            let from = event_site.status;
            event_site.status = to;
            self.record(Activity::SiteStatusChanged {
                event_site_id,
                from,
                to,
                timestamp: Utc::now(),
            });
        }
    }

    // ── Registration, payment and licence commands ─────────────────────

    /// Applies a booking transition to a registration.
    ///
    /// Booking a registration also books every event site it holds through
    /// its allocations.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] or [`FairError::InvalidTransition`].
    pub fn transition_registration(
        &mut self,
        registration_id: RegistrationId,
        transition: BookingTransition,
    ) -> Result<StallRegistration, FairError> {
        let registration = self
            .registrations
            .get_mut(&registration_id)
            .ok_or_else(|| FairError::not_found("registration", registration_id))?;
        let from = registration.booking_status;
        let to = apply(from, transition)?;
        registration.booking_status = to;
        let registration = registration.clone();
        self.record(Activity::BookingStatusChanged {
            registration_id,
            from,
            to,
            timestamp: Utc::now(),
        });

        if to == BookingStatus::Booked {
            self.book_registration_sites(registration_id);
        }
        Ok(registration)
    }

    fn book_registration_sites(&mut self, registration_id: RegistrationId) {
        let event_site_ids: Vec<EventSiteId> = self
            .allocations
            .values()
            .filter(|a| a.registration_id == Some(registration_id))
            .map(|a| a.event_site_id)
            .collect();
        for event_site_id in event_site_ids {
            let Ok(status) = self.event_site(event_site_id).map(|e| e.status) else {
                continue;
            };
            if SiteTransition::Book.allowed_from(status) {
                let _ = self.set_site_status(event_site_id, SiteTransition::Book);
            }
        }
    }

    /// Applies a transition to a payment record.
    ///
    /// Completing a payment also moves an invoiced registration to
    /// payment completed.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] or [`FairError::InvalidTransition`].
    pub fn transition_payment(
        &mut self,
        payment_id: PaymentId,
        transition: PaymentTransition,
    ) -> Result<PaymentHistory, FairError> {
        let payment = self
            .payments
            .get_mut(&payment_id)
            .ok_or_else(|| FairError::not_found("payment", payment_id))?;
        let from = payment.status;
        let to = apply(from, transition)?;
        payment.status = to;
        payment.date_updated = Utc::now();
        let payment = payment.clone();
        self.record(Activity::PaymentStatusChanged {
            payment_id,
            from,
            to,
            timestamp: payment.date_updated,
        });

        if to == PaymentStatus::Completed {
            self.follow_up_booking(
                payment.registration_id,
                BookingTransition::CompletePayment,
                ActivityCategory::Payment,
            );
        }
        Ok(payment)
    }

    /// Records money received against a payment record.
    ///
    /// Once nothing is left to pay a pending record completes.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`], [`FairError::InvalidRequest`] for a
    /// non-positive amount, or [`FairError::InvalidTransition`] if the
    /// record no longer accepts payments.
    pub fn record_payment(
        &mut self,
        payment_id: PaymentId,
        amount_cents: i64,
    ) -> Result<PaymentHistory, FairError> {
        if amount_cents <= 0 {
            return Err(FairError::InvalidRequest(
                "payment amount must be positive".to_string(),
            ));
        }
        let payment = self
            .payments
            .get_mut(&payment_id)
            .ok_or_else(|| FairError::not_found("payment", payment_id))?;
        apply(payment.status, PaymentTransition::Complete)?;
        payment.amount_paid_cents = payment.amount_paid_cents.saturating_add(amount_cents);
        payment.amount_to_pay_cents = payment.amount_to_pay_cents.saturating_sub(amount_cents);
        payment.date_updated = Utc::now();
        let outstanding = payment.amount_to_pay_cents;
        let payment = payment.clone();
        self.record(Activity::PaymentReceived {
            payment_id,
            amount_cents,
            outstanding_cents: outstanding,
            timestamp: payment.date_updated,
        });

        if outstanding <= 0 {
            return self.transition_payment(payment_id, PaymentTransition::Complete);
        }
        Ok(payment)
    }

    /// Applies a transition to a food licence.
    ///
    /// Approval and rejection stamp `date_completed`. Approval also books
    /// the registration when its booking status allows it.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] or [`FairError::InvalidTransition`].
    pub fn transition_licence(
        &mut self,
        licence_id: LicenceId,
        transition: LicenceTransition,
    ) -> Result<FoodLicence, FairError> {
        let licence = self
            .licences
            .get_mut(&licence_id)
            .ok_or_else(|| FairError::not_found("food licence", licence_id))?;
        let from = licence.status;
        let to = apply(from, transition)?;
        licence.status = to;
        let now = Utc::now();
        if to.is_decided() {
            licence.date_completed = Some(now);
        }
        let licence = licence.clone();
        self.record(Activity::LicenceStatusChanged {
            licence_id,
            from,
            to,
            timestamp: now,
        });

        if to == LicenceStatus::Approved {
            self.follow_up_booking(
                licence.registration_id,
                BookingTransition::Book,
                ActivityCategory::FoodLicence,
            );
        }
        Ok(licence)
    }

    /// Applies a booking transition triggered by another machine. A
    /// registration that cannot take it is left alone with a warning.
    fn follow_up_booking(
        &mut self,
        registration_id: RegistrationId,
        transition: BookingTransition,
        category: ActivityCategory,
    ) {
        let Some(status) = self
            .registrations
            .get(&registration_id)
            .map(|r| r.booking_status)
        else {
            return;
        };
        if transition.allowed_from(status) {
            let _ = self.transition_registration(registration_id, transition);
        } else {
            let message = format!(
                "registration {registration_id} left at {status}: {transition:?} not allowed"
            );
            tracing::warn!(
                %registration_id,
                %status,
                ?transition,
                category = %category,
                "follow-up booking transition skipped"
            );
            self.record(Activity::Warning {
                category,
                message,
                timestamp: Utc::now(),
            });
        }
    }

    /// Moves every created licence into a new batch.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::InvalidRequest`] for a malformed recipient or
    /// when no licence is waiting to be batched.
    pub fn batch_licences(
        &mut self,
        recipient_email: String,
    ) -> Result<FoodLicenceBatch, FairError> {
        if !is_plausible_email(&recipient_email) {
            return Err(FairError::InvalidRequest(format!(
                "invalid recipient email: {recipient_email}"
            )));
        }
        let waiting: Vec<LicenceId> = self
            .licences
            .values()
            .filter(|l| l.status == LicenceStatus::Created)
            .map(|l| l.id)
            .collect();
        if waiting.is_empty() {
            return Err(FairError::InvalidRequest(
                "no created licences to batch".to_string(),
            ));
        }

        let batch = FoodLicenceBatch {
            id: LicenceBatchId::new(),
            recipient_email,
            licence_ids: waiting.clone(),
            date_created: Utc::now(),
            date_sent: None,
        };
        for licence_id in &waiting {
            self.transition_licence(*licence_id, LicenceTransition::Batch)?;
            if let Some(licence) = self.licences.get_mut(licence_id) {
                licence.batch_id = Some(batch.id);
            }
        }
        self.licence_batches.insert(batch.id, batch.clone());
        self.record(Activity::LicenceBatchCreated {
            batch_id: batch.id,
            licence_count: waiting.len(),
            timestamp: batch.date_created,
        });
        Ok(batch)
    }

    /// Marks a batch as sent and submits its batched licences.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] for an unknown batch and
    /// [`FairError::InvalidRequest`] if it was already sent.
    pub fn submit_batch(
        &mut self,
        batch_id: LicenceBatchId,
    ) -> Result<FoodLicenceBatch, FairError> {
        let batch = self
            .licence_batches
            .get(&batch_id)
            .ok_or_else(|| FairError::not_found("licence batch", batch_id))?;
        if batch.date_sent.is_some() {
            return Err(FairError::InvalidRequest(format!(
                "licence batch {batch_id} was already sent"
            )));
        }
        let licence_ids = batch.licence_ids.clone();
        for licence_id in licence_ids {
            let batched = self
                .licences
                .get(&licence_id)
                .is_some_and(|l| l.status == LicenceStatus::Batched);
            if batched {
                self.transition_licence(licence_id, LicenceTransition::Submit)?;
            }
        }
        let batch = self
            .licence_batches
            .get_mut(&batch_id)
            .ok_or_else(|| FairError::not_found("licence batch", batch_id))?;
        batch.date_sent = Some(Utc::now());
        Ok(batch.clone())
    }

    // ── Lookups ─────────────────────────────────────────────────────────

    /// Returns a zone.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if it does not exist.
    pub fn zone(&self, id: ZoneId) -> Result<&Zone, FairError> {
        self.zones.get(&id).ok_or_else(|| FairError::not_found("zone", id))
    }

    /// Returns a site.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if it does not exist.
    pub fn site(&self, id: SiteId) -> Result<&Site, FairError> {
        self.sites.get(&id).ok_or_else(|| FairError::not_found("site", id))
    }

    /// Returns a fair.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if it does not exist.
    pub fn fair(&self, id: FairId) -> Result<&Fair, FairError> {
        self.fairs.get(&id).ok_or_else(|| FairError::not_found("fair", id))
    }

    /// Returns an event.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if it does not exist.
    pub fn event(&self, id: EventId) -> Result<&Event, FairError> {
        self.events.get(&id).ok_or_else(|| FairError::not_found("event", id))
    }

    /// Returns an event site.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if it does not exist.
    pub fn event_site(&self, id: EventSiteId) -> Result<&EventSite, FairError> {
        self.event_sites
            .get(&id)
            .ok_or_else(|| FairError::not_found("event site", id))
    }

    /// Returns an allocation.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if it does not exist.
    pub fn allocation(&self, id: AllocationId) -> Result<&SiteAllocation, FairError> {
        self.allocations
            .get(&id)
            .ok_or_else(|| FairError::not_found("allocation", id))
    }

    /// Returns a registration.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if it does not exist.
    pub fn registration(&self, id: RegistrationId) -> Result<&StallRegistration, FairError> {
        self.registrations
            .get(&id)
            .ok_or_else(|| FairError::not_found("registration", id))
    }

    /// Returns a payment record.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if it does not exist.
    pub fn payment(&self, id: PaymentId) -> Result<&PaymentHistory, FairError> {
        self.payments
            .get(&id)
            .ok_or_else(|| FairError::not_found("payment", id))
    }

    /// Returns a food licence.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if it does not exist.
    pub fn licence(&self, id: LicenceId) -> Result<&FoodLicence, FairError> {
        self.licences
            .get(&id)
            .ok_or_else(|| FairError::not_found("food licence", id))
    }

    /// Finds the event site of an (event, site) pair.
    #[must_use]
    pub fn find_event_site(&self, event_id: EventId, site_id: SiteId) -> Option<&EventSite> {
        self.event_sites
            .values()
            .find(|e| e.event_id == event_id && e.site_id == site_id)
    }

    /// Returns `true` if the stallholder already holds the event site.
    #[must_use]
    pub fn has_allocation(
        &self,
        stallholder_id: StallholderId,
        event_site_id: EventSiteId,
    ) -> bool {
        self.allocations
            .values()
            .any(|a| a.stallholder_id == stallholder_id && a.event_site_id == event_site_id)
    }

    /// All zones.
    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    /// All sites.
    pub fn sites(&self) -> impl Iterator<Item = &Site> {
        self.sites.values()
    }

    /// All fairs.
    pub fn fairs(&self) -> impl Iterator<Item = &Fair> {
        self.fairs.values()
    }

    /// All events.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    /// All event sites.
    pub fn event_sites(&self) -> impl Iterator<Item = &EventSite> {
        self.event_sites.values()
    }

    /// All allocations.
    pub fn allocations(&self) -> impl Iterator<Item = &SiteAllocation> {
        self.allocations.values()
    }

    /// All site history rows.
    pub fn site_history(&self) -> impl Iterator<Item = &SiteHistory> {
        self.site_history.values()
    }

    /// All registrations.
    pub fn registrations(&self) -> impl Iterator<Item = &StallRegistration> {
        self.registrations.values()
    }

    /// All payment records.
    pub fn payments(&self) -> impl Iterator<Item = &PaymentHistory> {
        self.payments.values()
    }

    /// All food licences.
    pub fn licences(&self) -> impl Iterator<Item = &FoodLicence> {
        self.licences.values()
    }

    /// All licence batches.
    pub fn licence_batches(&self) -> impl Iterator<Item = &FoodLicenceBatch> {
        self.licence_batches.values()
    }

    /// Event sites whose status disagrees with their allocations: allocated
    /// without exactly one holder, free while held, or held twice.
    #[cfg(test)]
    pub(crate) fn inconsistent_event_sites(&self) -> Vec<EventSiteId> {
        self.event_sites
            .values()
            .filter(|e| {
                let holders = self
                    .allocations
                    .values()
                    .filter(|a| a.event_site_id == e.id)
                    .count();
                match e.status {
                    SiteStatus::Allocated => holders != 1,
                    SiteStatus::Available | SiteStatus::Unavailable => holders != 0,
                    SiteStatus::Pending | SiteStatus::Booked | SiteStatus::Archived => holders > 1,
                }
            })
            .map(|e| e.id)
            .collect()
    }
}

fn is_plausible_email(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod tests {
    use super::*;

    /// Fixture: one fair, one event, one zone with `sites` full-size sites
    /// and their event sites.
    pub(crate) struct Fixture {
        pub state: FairState,
        pub fair: FairId,
        pub event: EventId,
        pub sites: Vec<SiteId>,
    }

    pub(crate) fn fixture(site_count: usize) -> Fixture {
        let mut state = FairState::new();
        let fair = state.add_fair(2026, "Spring Fair".to_string(), true).id;
        let Some(date) = NaiveDate::from_ymd_opt(2026, 11, 7) else {
            panic!("valid date");
        };
        let Ok(event) = state.add_event(fair, "First Saturday".to_string(), date, 1) else {
            panic!("event creation failed");
        };
        let zone = state.add_zone("Main Street".to_string()).id;
        let mut sites = Vec::new();
        for n in 0..site_count {
            let Ok(site) = state.add_site(format!("A{n}"), zone, SiteSize::Full) else {
                panic!("site creation failed");
            };
            sites.push(site.id);
        }
        let Ok(_) = state.generate_event_sites(event.id) else {
            panic!("event site generation failed");
        };
        state.drain_activities();
        Fixture {
            state,
            fair,
            event: event.id,
            sites,
        }
    }

    fn event_site_of(fx: &Fixture, idx: usize) -> EventSiteId {
        let Some(site) = fx.sites.get(idx) else {
            panic!("no site {idx}");
        };
        let Some(event_site) = fx.state.find_event_site(fx.event, *site) else {
            panic!("no event site");
        };
        event_site.id
    }

    fn request(event_site_id: EventSiteId, stallholder_id: StallholderId) -> AllocationRequest {
        AllocationRequest {
            event_site_id,
            stallholder_id,
            registration_id: None,
            on_hold: false,
            created_by: "test".to_string(),
        }
    }

    fn registration(
        fx: &mut Fixture,
        stallholder_id: StallholderId,
        selling_food: bool,
    ) -> RegistrationId {
        let Ok(registration) = fx.state.add_registration(RegistrationRequest {
            fair_id: fx.fair,
            stallholder_id,
            site_size: Some(SiteSize::Full),
            selling_food,
            total_charge_cents: 12_000,
        }) else {
            panic!("registration failed");
        };
        registration.id
    }

    fn status_of(fx: &Fixture, id: EventSiteId) -> SiteStatus {
        let Ok(event_site) = fx.state.event_site(id) else {
            panic!("event site missing");
        };
        event_site.status
    }

    #[test]
    fn allocate_flips_status_and_records_activity() {
        let mut fx = fixture(1);
        let es = event_site_of(&fx, 0);

        let result = fx.state.allocate(request(es, StallholderId::new()));
        assert!(result.is_ok());
        assert_eq!(status_of(&fx, es), SiteStatus::Allocated);

        let kinds: Vec<&str> = fx.state.drain_activities().iter().map(Activity::kind).collect();
        assert_eq!(kinds, vec!["site_status_changed", "allocation_created"]);
        assert!(fx.state.inconsistent_event_sites().is_empty());
    }

    #[test]
    fn allocate_refuses_taken_site() {
        let mut fx = fixture(1);
        let es = event_site_of(&fx, 0);
        let _ = fx.state.allocate(request(es, StallholderId::new()));

        let second = fx.state.allocate(request(es, StallholderId::new()));
        let Err(FairError::SiteNotAvailable { status, .. }) = second else {
            panic!("expected SiteNotAvailable");
        };
        assert_eq!(status, SiteStatus::Allocated);
        assert_eq!(fx.state.allocations().count(), 1);
    }

    #[test]
    fn allocate_refuses_duplicate_pair() {
        let mut fx = fixture(1);
        let es = event_site_of(&fx, 0);
        let holder = StallholderId::new();
        let _ = fx.state.allocate(request(es, holder));

        let again = fx.state.allocate(request(es, holder));
        assert!(matches!(again, Err(FairError::DuplicateAllocation { .. })));
    }

    #[test]
    fn deallocate_resets_allocated_site() {
        let mut fx = fixture(1);
        let es = event_site_of(&fx, 0);
        let Ok(allocation) = fx.state.allocate(request(es, StallholderId::new())) else {
            panic!("allocation failed");
        };

        assert!(fx.state.deallocate(allocation.id, false).is_ok());
        assert_eq!(status_of(&fx, es), SiteStatus::Available);
        assert_eq!(fx.state.allocations().count(), 0);
    }

    #[test]
    fn deallocate_blocked_past_allocated_unless_forced() {
        let mut fx = fixture(1);
        let es = event_site_of(&fx, 0);
        let Ok(allocation) = fx.state.allocate(request(es, StallholderId::new())) else {
            panic!("allocation failed");
        };
        let Ok(_) = fx.state.transition_event_site(es, SiteTransition::HoldPending) else {
            panic!("pending transition failed");
        };

        let blocked = fx.state.deallocate(allocation.id, false);
        assert!(matches!(
            blocked,
            Err(FairError::DeleteBlocked {
                status: SiteStatus::Pending,
                ..
            })
        ));
        assert_eq!(status_of(&fx, es), SiteStatus::Pending);

        assert!(fx.state.deallocate(allocation.id, true).is_ok());
        assert_eq!(status_of(&fx, es), SiteStatus::Available);
        assert!(fx.state.inconsistent_event_sites().is_empty());
    }

    #[test]
    fn release_refused_while_allocated() {
        let mut fx = fixture(1);
        let es = event_site_of(&fx, 0);
        let _ = fx.state.allocate(request(es, StallholderId::new()));

        let result = fx.state.transition_event_site(es, SiteTransition::Release);
        assert!(matches!(result, Err(FairError::AllocationConflict(_))));
        let result = fx.state.transition_event_site(es, SiteTransition::Allocate);
        assert!(matches!(result, Err(FairError::AllocationConflict(_))));
    }

    #[test]
    fn booked_site_archives_with_its_allocation() {
        let mut fx = fixture(1);
        let es = event_site_of(&fx, 0);
        let Ok(allocation) = fx.state.allocate(request(es, StallholderId::new())) else {
            panic!("allocation failed");
        };
        let Ok(_) = fx.state.transition_event_site(es, SiteTransition::Book) else {
            panic!("book transition failed");
        };

        let Ok(archived) = fx.state.transition_event_site(es, SiteTransition::Archive) else {
            panic!("archive transition failed");
        };
        assert_eq!(archived.status, SiteStatus::Archived);
        assert_eq!(fx.state.allocations().count(), 1);
        assert!(fx.state.inconsistent_event_sites().is_empty());

        assert!(fx.state.deallocate(allocation.id, true).is_ok());
        assert_eq!(status_of(&fx, es), SiteStatus::Archived);
        assert_eq!(fx.state.allocations().count(), 0);
        assert!(fx.state.inconsistent_event_sites().is_empty());
    }

    #[test]
    fn unallocated_site_archives() {
        let mut fx = fixture(1);
        let es = event_site_of(&fx, 0);

        let result = fx.state.transition_event_site(es, SiteTransition::Archive);
        assert!(result.is_ok());
        assert_eq!(status_of(&fx, es), SiteStatus::Archived);
    }

    #[test]
    fn reopen_refused_while_pending_site_is_allocated() {
        let mut fx = fixture(1);
        let es = event_site_of(&fx, 0);
        let _ = fx.state.allocate(request(es, StallholderId::new()));
        let Ok(_) = fx.state.transition_event_site(es, SiteTransition::HoldPending) else {
            panic!("pending transition failed");
        };

        let result = fx.state.transition_event_site(es, SiteTransition::Reopen);
        assert!(matches!(result, Err(FairError::AllocationConflict(_))));
        assert_eq!(status_of(&fx, es), SiteStatus::Pending);
    }

    #[test]
    fn booking_a_registration_books_its_sites() {
        let mut fx = fixture(1);
        let es = event_site_of(&fx, 0);
        let holder = StallholderId::new();
        let reg = registration(&mut fx, holder, false);
        let mut req = request(es, holder);
        req.registration_id = Some(reg);
        let Ok(_) = fx.state.allocate(req) else {
            panic!("allocation failed");
        };

        for t in [
            BookingTransition::Submit,
            BookingTransition::Invoice,
            BookingTransition::CompletePayment,
            BookingTransition::Book,
        ] {
            let Ok(_) = fx.state.transition_registration(reg, t) else {
                panic!("{t:?} failed");
            };
        }
        assert_eq!(status_of(&fx, es), SiteStatus::Booked);
        assert!(fx.state.inconsistent_event_sites().is_empty());
    }

    #[test]
    fn full_payment_completes_payment_and_registration() {
        let mut fx = fixture(0);
        let reg = registration(&mut fx, StallholderId::new(), false);
        let _ = fx.state.transition_registration(reg, BookingTransition::Submit);
        let _ = fx.state.transition_registration(reg, BookingTransition::Invoice);
        let Ok(payment) = fx.state.add_payment(reg, 10_000) else {
            panic!("payment creation failed");
        };

        let Ok(partial) = fx.state.record_payment(payment.id, 4_000) else {
            panic!("partial payment failed");
        };
        assert_eq!(partial.status, PaymentStatus::Pending);
        assert_eq!(partial.amount_to_pay_cents, 6_000);

        let Ok(settled) = fx.state.record_payment(payment.id, 6_000) else {
            panic!("final payment failed");
        };
        assert_eq!(settled.status, PaymentStatus::Completed);
        assert_eq!(settled.amount_paid_cents, 10_000);

        let Ok(registration) = fx.state.registration(reg) else {
            panic!("registration missing");
        };
        assert_eq!(registration.booking_status, BookingStatus::PaymentCompleted);
    }

    #[test]
    fn payment_on_completed_record_rejected() {
        let mut fx = fixture(0);
        let reg = registration(&mut fx, StallholderId::new(), false);
        let Ok(payment) = fx.state.add_payment(reg, 500) else {
            panic!("payment creation failed");
        };
        let _ = fx.state.record_payment(payment.id, 500);
        let again = fx.state.record_payment(payment.id, 1);
        assert!(matches!(again, Err(FairError::InvalidTransition(_))));
    }

    #[test]
    fn licence_decisions_stamp_completion() {
        let mut fx = fixture(0);
        let reg = registration(&mut fx, StallholderId::new(), true);
        let Ok(licence) = fx.state.add_licence(reg) else {
            panic!("licence creation failed");
        };

        let early = fx.state.transition_licence(licence.id, LicenceTransition::Approve);
        assert!(matches!(early, Err(FairError::InvalidTransition(_))));

        let _ = fx.state.transition_licence(licence.id, LicenceTransition::Batch);
        let _ = fx.state.transition_licence(licence.id, LicenceTransition::Submit);
        let Ok(rejected) = fx.state.transition_licence(licence.id, LicenceTransition::Reject) else {
            panic!("rejection failed");
        };
        assert_eq!(rejected.status, LicenceStatus::Rejected);
        assert!(rejected.date_completed.is_some());
    }

    #[test]
    fn licence_approval_books_paid_registration() {
        let mut fx = fixture(0);
        let reg = registration(&mut fx, StallholderId::new(), true);
        for t in [
            BookingTransition::Submit,
            BookingTransition::Invoice,
            BookingTransition::CompletePayment,
        ] {
            let _ = fx.state.transition_registration(reg, t);
        }
        let Ok(licence) = fx.state.add_licence(reg) else {
            panic!("licence creation failed");
        };
        let _ = fx.state.transition_licence(licence.id, LicenceTransition::Batch);
        let _ = fx.state.transition_licence(licence.id, LicenceTransition::Submit);
        let Ok(approved) = fx
            .state
            .transition_licence(licence.id, LicenceTransition::Approve)
        else {
            panic!("approval failed");
        };
        assert!(approved.date_completed.is_some());

        let Ok(registration) = fx.state.registration(reg) else {
            panic!("registration missing");
        };
        assert_eq!(registration.booking_status, BookingStatus::Booked);
    }

    #[test]
    fn licence_approval_leaves_unpaid_registration_with_warning() {
        let mut fx = fixture(0);
        let reg = registration(&mut fx, StallholderId::new(), true);
        let Ok(licence) = fx.state.add_licence(reg) else {
            panic!("licence creation failed");
        };
        let _ = fx.state.transition_licence(licence.id, LicenceTransition::Batch);
        let _ = fx.state.transition_licence(licence.id, LicenceTransition::Submit);
        fx.state.drain_activities();
        let _ = fx.state.transition_licence(licence.id, LicenceTransition::Approve);

        let Ok(registration) = fx.state.registration(reg) else {
            panic!("registration missing");
        };
        assert_eq!(registration.booking_status, BookingStatus::Created);
        let activities = fx.state.drain_activities();
        assert!(activities.iter().any(|a| a.kind() == "warning"));
    }

    #[test]
    fn licence_requires_food_registration() {
        let mut fx = fixture(0);
        let reg = registration(&mut fx, StallholderId::new(), false);
        assert!(matches!(
            fx.state.add_licence(reg),
            Err(FairError::InvalidRequest(_))
        ));
    }

    #[test]
    fn batch_and_submit_licences() {
        let mut fx = fixture(0);
        let reg = registration(&mut fx, StallholderId::new(), true);
        let Ok(first) = fx.state.add_licence(reg) else {
            panic!("licence creation failed");
        };
        let Ok(second) = fx.state.add_licence(reg) else {
            panic!("licence creation failed");
        };

        let Ok(batch) = fx.state.batch_licences("licensing@council.example.nz".to_string()) else {
            panic!("batching failed");
        };
        assert_eq!(batch.licence_ids.len(), 2);

        let Ok(sent) = fx.state.submit_batch(batch.id) else {
            panic!("submit failed");
        };
        assert!(sent.date_sent.is_some());
        for id in [first.id, second.id] {
            let Ok(licence) = fx.state.licence(id) else {
                panic!("licence missing");
            };
            assert_eq!(licence.status, LicenceStatus::Submitted);
            assert_eq!(licence.batch_id, Some(batch.id));
        }

        assert!(fx.state.submit_batch(batch.id).is_err());
        assert!(fx.state.batch_licences("licensing@council.example.nz".to_string()).is_err());
    }

    #[test]
    fn batch_rejects_bad_email() {
        let mut fx = fixture(0);
        assert!(matches!(
            fx.state.batch_licences("not-an-address".to_string()),
            Err(FairError::InvalidRequest(_))
        ));
    }

    #[test]
    fn event_site_pairs_are_unique() {
        let mut fx = fixture(2);
        let Some(site) = fx.sites.first().copied() else {
            panic!("no site");
        };
        let dup = fx.state.add_event_site(fx.event, site);
        assert!(matches!(dup, Err(FairError::DuplicateEventSite { .. })));

        let Ok(created) = fx.state.generate_event_sites(fx.event) else {
            panic!("generation failed");
        };
        assert!(created.is_empty());
    }

    #[test]
    fn site_history_upserts_per_year() {
        let mut fx = fixture(1);
        let Some(site) = fx.sites.first().copied() else {
            panic!("no site");
        };
        let holder = StallholderId::new();
        let record = HistoryRecord {
            stallholder_id: holder,
            site_id: site,
            year: 2025,
            number_events: 1,
            is_skipped: false,
            site_size: None,
        };
        let Ok(first) = fx.state.record_site_history(record.clone()) else {
            panic!("history insert failed");
        };
        let Ok(second) = fx.state.record_site_history(HistoryRecord {
            number_events: 2,
            ..record
        }) else {
            panic!("history update failed");
        };
        assert_eq!(first.id, second.id);
        assert_eq!(fx.state.site_history().count(), 1);
        assert_eq!(second.number_events, 2);
    }

    #[test]
    fn snapshot_round_trip_keeps_records() {
        let mut fx = fixture(2);
        let es = event_site_of(&fx, 1);
        let _ = fx.state.allocate(request(es, StallholderId::new()));

        let Ok(json) = serde_json::to_value(&fx.state) else {
            panic!("serialization failed");
        };
        let Ok(restored) = serde_json::from_value::<FairState>(json) else {
            panic!("deserialization failed");
        };
        assert_eq!(restored.event_sites().count(), 2);
        assert_eq!(restored.allocations().count(), 1);
        assert!(restored.inconsistent_event_sites().is_empty());
    }
}
