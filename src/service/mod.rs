//! Service layer: command orchestration.
//!
//! [`AllocationService`] covers inventory, allocations, the allocation run,
//! cleanup and site history. [`RegistrationService`] covers registrations,
//! payments and food licences. Both run [`crate::domain::FairState`]
//! commands under the store's write lock and publish the resulting
//! activities through the [`crate::domain::ActivityBus`] once the lock is
//! released.

pub mod allocation_service;
pub mod registration_service;

pub use allocation_service::{
    AllocationFilter, AllocationService, AllocationSettings, EventSiteFilter,
};
pub use registration_service::RegistrationService;

use crate::domain::{ActivityBus, FairState, FairStore};
use crate::error::FairError;

/// Runs `command` under the write lock, then publishes what it recorded.
///
/// Activities are published even when the command fails part way, so
/// subscribers see every change that did happen.
pub(crate) async fn execute<T>(
    store: &FairStore,
    bus: &ActivityBus,
    command: impl FnOnce(&mut FairState) -> Result<T, FairError>,
) -> Result<T, FairError> {
    let mut state = store.write().await;
    let result = command(&mut state);
    let activities = state.drain_activities();
    drop(state);

    bus.publish_all(activities);
    result
}
