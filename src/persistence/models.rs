//! Database models for the activity log and snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the `activity_log` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredActivity {
    /// Auto-increment row ID.
    pub id: i64,
    /// Category tag (e.g. `"site_allocation"`).
    pub category: String,
    /// Activity kind (e.g. `"allocation_created"`).
    pub kind: String,
    /// JSONB payload with the full activity.
    pub payload: serde_json::Value,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A row of the `state_snapshots` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Auto-increment row ID.
    pub id: i64,
    /// Serialized fair state.
    pub state_json: serde_json::Value,
    /// Snapshot timestamp.
    pub snapshot_at: DateTime<Utc>,
}
