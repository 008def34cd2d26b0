//! Shared storage for the fair aggregate.
//!
//! [`FairStore`] keeps the single [`FairState`] behind a
//! [`tokio::sync::RwLock`]. Every command runs under the write lock, so an
//! allocation and the status change of its event site are never observed
//! apart, and a whole allocation run is atomic against other commands.

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::FairState;
use crate::error::FairError;

/// Central store for all fair records.
///
/// # Concurrency
///
/// - Any number of readers may hold the state at once.
/// - Commands are serialized behind one writer.
#[derive(Debug, Default)]
pub struct FairStore {
    state: RwLock<FairState>,
}

impl FairStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with a restored state.
    #[must_use]
    pub fn with_state(state: FairState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Acquires shared read access.
    pub async fn read(&self) -> RwLockReadGuard<'_, FairState> {
        self.state.read().await
    }

    /// Acquires exclusive write access.
    pub async fn write(&self) -> RwLockWriteGuard<'_, FairState> {
        self.state.write().await
    }

    /// Replaces the whole state, e.g. after loading a snapshot.
    pub async fn replace(&self, state: FairState) {
        *self.state.write().await = state;
    }

    /// Serializes the current state for a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`FairError::Internal`] if serialization fails.
    pub async fn snapshot_json(&self) -> Result<serde_json::Value, FairError> {
        let state = self.state.read().await;
        serde_json::to_value(&*state).map_err(|e| FairError::Internal(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_are_visible_to_readers() {
        let store = FairStore::new();
        {
            let mut state = store.write().await;
            state.add_zone("Riverside".to_string());
        }
        assert_eq!(store.read().await.zones().count(), 1);
    }

    #[tokio::test]
    async fn snapshot_restores_into_new_store() {
        let store = FairStore::new();
        store.write().await.add_fair(2026, "Spring Fair".to_string(), true);

        let Ok(json) = store.snapshot_json().await else {
            panic!("snapshot failed");
        };
        let Ok(state) = serde_json::from_value::<FairState>(json) else {
            panic!("restore failed");
        };
        let restored = FairStore::new();
        restored.replace(state).await;
        assert_eq!(restored.read().await.fairs().count(), 1);
    }
}
