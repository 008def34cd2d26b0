//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::{ActivityBus, FairStore};
use crate::service::{AllocationService, AllocationSettings, RegistrationService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Inventory, allocation and site history operations.
    pub allocation_service: Arc<AllocationService>,
    /// Registration, payment and food licence operations.
    pub registration_service: Arc<RegistrationService>,
    /// Activity bus for WebSocket subscriptions.
    pub activity_bus: ActivityBus,
}

impl AppState {
    /// Wires both services to one store and one bus.
    #[must_use]
    pub fn new(
        store: Arc<FairStore>,
        activity_bus: ActivityBus,
        settings: AllocationSettings,
    ) -> Self {
        let allocation_service = Arc::new(AllocationService::new(
            Arc::clone(&store),
            activity_bus.clone(),
            settings,
        ));
        let registration_service = Arc::new(RegistrationService::new(store, activity_bus.clone()));
        Self {
            allocation_service,
            registration_service,
            activity_bus,
        }
    }
}
