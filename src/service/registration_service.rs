//! Registration service: bookings, payments, and food licences.

use std::sync::Arc;

use super::execute;
use crate::domain::{
    ActivityBus, BookingStatus, BookingTransition, FairId, FairStore, FoodLicence,
    FoodLicenceBatch, LicenceBatchId, LicenceId, LicenceStatus, LicenceTransition, PaymentHistory,
    PaymentId, PaymentTransition, RegistrationId, RegistrationRequest, StallRegistration,
};
use crate::error::FairError;

/// Orchestration layer for the booking, payment and licence machines.
///
/// Shares the [`FairStore`] with [`super::AllocationService`], so a booking
/// that books event sites and a concurrent allocation never interleave.
#[derive(Debug, Clone)]
pub struct RegistrationService {
    store: Arc<FairStore>,
    activity_bus: ActivityBus,
}

impl RegistrationService {
    /// Creates a new `RegistrationService`.
    #[must_use]
    pub fn new(store: Arc<FairStore>, activity_bus: ActivityBus) -> Self {
        Self {
            store,
            activity_bus,
        }
    }

    /// Creates a registration.
    ///
    /// # Errors
    ///
    /// See [`crate::domain::FairState::add_registration`].
    pub async fn create_registration(
        &self,
        request: RegistrationRequest,
    ) -> Result<StallRegistration, FairError> {
        let registration = execute(&self.store, &self.activity_bus, |s| {
            s.add_registration(request)
        })
        .await?;
        tracing::info!(
            registration_id = %registration.id,
            stallholder_id = %registration.stallholder_id,
            fair_id = %registration.fair_id,
            "registration created"
        );
        Ok(registration)
    }

    /// Applies a booking transition.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] or [`FairError::InvalidTransition`].
    pub async fn transition_registration(
        &self,
        registration_id: RegistrationId,
        transition: BookingTransition,
    ) -> Result<StallRegistration, FairError> {
        let registration = execute(&self.store, &self.activity_bus, |s| {
            s.transition_registration(registration_id, transition)
        })
        .await?;
        tracing::info!(
            %registration_id,
            ?transition,
            status = %registration.booking_status,
            "booking status changed"
        );
        Ok(registration)
    }

    /// Returns one registration.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if it does not exist.
    pub async fn get_registration(
        &self,
        registration_id: RegistrationId,
    ) -> Result<StallRegistration, FairError> {
        self.store.read().await.registration(registration_id).cloned()
    }

    /// Lists registrations, optionally of one fair or in one status.
    pub async fn list_registrations(
        &self,
        fair_id: Option<FairId>,
        status: Option<BookingStatus>,
    ) -> Vec<StallRegistration> {
        let state = self.store.read().await;
        state
            .registrations()
            .filter(|r| fair_id.is_none_or(|f| r.fair_id == f))
            .filter(|r| status.is_none_or(|st| r.booking_status == st))
            .cloned()
            .collect()
    }

    /// Opens a payment record for a registration.
    ///
    /// # Errors
    ///
    /// See [`crate::domain::FairState::add_payment`].
    pub async fn create_payment(
        &self,
        registration_id: RegistrationId,
        amount_to_pay_cents: i64,
    ) -> Result<PaymentHistory, FairError> {
        let payment = execute(&self.store, &self.activity_bus, |s| {
            s.add_payment(registration_id, amount_to_pay_cents)
        })
        .await?;
        tracing::info!(
            payment_id = %payment.id,
            %registration_id,
            amount_to_pay_cents,
            "payment opened"
        );
        Ok(payment)
    }

    /// Applies a payment transition.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] or [`FairError::InvalidTransition`].
    pub async fn transition_payment(
        &self,
        payment_id: PaymentId,
        transition: PaymentTransition,
    ) -> Result<PaymentHistory, FairError> {
        let payment = execute(&self.store, &self.activity_bus, |s| {
            s.transition_payment(payment_id, transition)
        })
        .await?;
        tracing::info!(
            %payment_id,
            ?transition,
            status = ?payment.status,
            "payment status changed"
        );
        Ok(payment)
    }

    /// Records money received against a payment record.
    ///
    /// # Errors
    ///
    /// See [`crate::domain::FairState::record_payment`].
    pub async fn record_payment(
        &self,
        payment_id: PaymentId,
        amount_cents: i64,
    ) -> Result<PaymentHistory, FairError> {
        let payment = execute(&self.store, &self.activity_bus, |s| {
            s.record_payment(payment_id, amount_cents)
        })
        .await?;
        tracing::info!(
            %payment_id,
            amount_cents,
            outstanding_cents = payment.amount_to_pay_cents,
            status = ?payment.status,
            "payment received"
        );
        Ok(payment)
    }

    /// Returns one payment record.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if it does not exist.
    pub async fn get_payment(&self, payment_id: PaymentId) -> Result<PaymentHistory, FairError> {
        self.store.read().await.payment(payment_id).cloned()
    }

    /// Lists payment records, optionally of one registration.
    pub async fn list_payments(
        &self,
        registration_id: Option<RegistrationId>,
    ) -> Vec<PaymentHistory> {
        let state = self.store.read().await;
        state
            .payments()
            .filter(|p| registration_id.is_none_or(|r| p.registration_id == r))
            .cloned()
            .collect()
    }

    /// Requests a food licence for a registration.
    ///
    /// # Errors
    ///
    /// See [`crate::domain::FairState::add_licence`].
    pub async fn create_licence(
        &self,
        registration_id: RegistrationId,
    ) -> Result<FoodLicence, FairError> {
        let licence = execute(&self.store, &self.activity_bus, |s| {
            s.add_licence(registration_id)
        })
        .await?;
        tracing::info!(licence_id = %licence.id, %registration_id, "food licence requested");
        Ok(licence)
    }

    /// Applies a licence transition.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] or [`FairError::InvalidTransition`].
    pub async fn transition_licence(
        &self,
        licence_id: LicenceId,
        transition: LicenceTransition,
    ) -> Result<FoodLicence, FairError> {
        let licence = execute(&self.store, &self.activity_bus, |s| {
            s.transition_licence(licence_id, transition)
        })
        .await?;
        tracing::info!(
            %licence_id,
            ?transition,
            status = ?licence.status,
            "food licence status changed"
        );
        Ok(licence)
    }

    /// Returns one food licence.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::NotFound`] if it does not exist.
    pub async fn get_licence(&self, licence_id: LicenceId) -> Result<FoodLicence, FairError> {
        self.store.read().await.licence(licence_id).cloned()
    }

    /// Lists food licences, optionally in one status.
    pub async fn list_licences(&self, status: Option<LicenceStatus>) -> Vec<FoodLicence> {
        let state = self.store.read().await;
        state
            .licences()
            .filter(|l| status.is_none_or(|st| l.status == st))
            .cloned()
            .collect()
    }

    /// Batches every created licence for the given recipient.
    ///
    /// # Errors
    ///
    /// See [`crate::domain::FairState::batch_licences`].
    pub async fn batch_licences(
        &self,
        recipient_email: String,
    ) -> Result<FoodLicenceBatch, FairError> {
        let batch = execute(&self.store, &self.activity_bus, |s| {
            s.batch_licences(recipient_email)
        })
        .await?;
        tracing::info!(
            batch_id = %batch.id,
            licences = batch.licence_ids.len(),
            "food licence batch created"
        );
        Ok(batch)
    }

    /// Submits a licence batch to the council.
    ///
    /// # Errors
    ///
    /// See [`crate::domain::FairState::submit_batch`].
    pub async fn submit_batch(
        &self,
        batch_id: LicenceBatchId,
    ) -> Result<FoodLicenceBatch, FairError> {
        let batch = execute(&self.store, &self.activity_bus, |s| s.submit_batch(batch_id)).await?;
        tracing::info!(
            %batch_id,
            recipient = %batch.recipient_email,
            "food licence batch submitted"
        );
        Ok(batch)
    }

    /// Lists licence batches.
    pub async fn list_batches(&self) -> Vec<FoodLicenceBatch> {
        self.store.read().await.licence_batches().cloned().collect()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Activity, ActivityCategory, PaymentStatus, SiteSize};

    async fn make_service() -> (RegistrationService, FairId) {
        let store = Arc::new(FairStore::new());
        let fair = store.write().await.add_fair(2026, "Spring Fair".to_string(), true);
        (RegistrationService::new(store, ActivityBus::new(256)), fair.id)
    }

    async fn registration(
        service: &RegistrationService,
        fair_id: FairId,
        selling_food: bool,
    ) -> StallRegistration {
        let Ok(registration) = service
            .create_registration(RegistrationRequest {
                fair_id,
                stallholder_id: crate::domain::StallholderId::new(),
                site_size: Some(SiteSize::Half),
                selling_food,
                total_charge_cents: 8_500,
            })
            .await
        else {
            panic!("registration failed");
        };
        registration
    }

    #[tokio::test]
    async fn settling_a_payment_advances_the_booking() {
        let (service, fair_id) = make_service().await;
        let reg = registration(&service, fair_id, false).await;
        for t in [BookingTransition::Submit, BookingTransition::Invoice] {
            let Ok(_) = service.transition_registration(reg.id, t).await else {
                panic!("{t:?} failed");
            };
        }
        let Ok(payment) = service.create_payment(reg.id, 8_500).await else {
            panic!("payment creation failed");
        };
        let mut rx = service.activity_bus.subscribe();

        let Ok(settled) = service.record_payment(payment.id, 8_500).await else {
            panic!("payment failed");
        };
        assert_eq!(settled.status, PaymentStatus::Completed);

        let mut categories = Vec::new();
        while let Ok(activity) = rx.try_recv() {
            categories.push(activity.category());
        }
        assert_eq!(
            categories,
            vec![
                ActivityCategory::Payment,
                ActivityCategory::Payment,
                ActivityCategory::Booking
            ]
        );

        let Ok(updated) = service.get_registration(reg.id).await else {
            panic!("registration missing");
        };
        assert_eq!(updated.booking_status, BookingStatus::PaymentCompleted);
    }

    #[tokio::test]
    async fn invalid_booking_edge_is_rejected() {
        let (service, fair_id) = make_service().await;
        let reg = registration(&service, fair_id, false).await;
        let result = service
            .transition_registration(reg.id, BookingTransition::Book)
            .await;
        let Err(FairError::InvalidTransition(err)) = result else {
            panic!("expected InvalidTransition");
        };
        assert_eq!(err.machine, "booking");
    }

    #[tokio::test]
    async fn licence_batch_flow() {
        let (service, fair_id) = make_service().await;
        let reg = registration(&service, fair_id, true).await;
        let Ok(licence) = service.create_licence(reg.id).await else {
            panic!("licence request failed");
        };
        let mut rx = service.activity_bus.subscribe();

        let Ok(batch) = service
            .batch_licences("food@council.example.nz".to_string())
            .await
        else {
            panic!("batching failed");
        };
        let Ok(_) = service.submit_batch(batch.id).await else {
            panic!("submit failed");
        };
        let Ok(approved) = service
            .transition_licence(licence.id, LicenceTransition::Approve)
            .await
        else {
            panic!("approval failed");
        };
        assert!(approved.date_completed.is_some());

        let mut saw_warning = false;
        while let Ok(activity) = rx.try_recv() {
            if let Activity::Warning { category, .. } = activity {
                assert_eq!(category, ActivityCategory::FoodLicence);
                saw_warning = true;
            }
        }
        assert!(saw_warning, "unpaid registration should not be booked silently");
        assert_eq!(service.list_licences(Some(LicenceStatus::Approved)).await.len(), 1);
        assert_eq!(service.list_batches().await.len(), 1);
    }
}
