//! PostgreSQL implementation of the persistence layer.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::models::{StateSnapshot, StoredActivity};
use crate::domain::{Activity, ActivityCategory};
use crate::error::FairError;

const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS activity_log (\
        id BIGSERIAL PRIMARY KEY, \
        category TEXT NOT NULL, \
        kind TEXT NOT NULL, \
        payload JSONB NOT NULL, \
        created_at TIMESTAMPTZ NOT NULL DEFAULT now())",
    "CREATE INDEX IF NOT EXISTS activity_log_category_created_at \
        ON activity_log (category, created_at)",
    "CREATE TABLE IF NOT EXISTS state_snapshots (\
        id BIGSERIAL PRIMARY KEY, \
        state_json JSONB NOT NULL, \
        snapshot_at TIMESTAMPTZ NOT NULL DEFAULT now())",
    "CREATE INDEX IF NOT EXISTS state_snapshots_snapshot_at \
        ON state_snapshots (snapshot_at DESC)",
];

/// PostgreSQL-backed persistence layer using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    /// Creates a new persistence layer with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the tables if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns a [`FairError::PersistenceError`] on database failure.
    pub async fn ensure_schema(&self) -> Result<(), FairError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| FairError::PersistenceError(e.to_string()))?;
        }
        Ok(())
    }

    /// Appends an activity to the activity log.
    ///
    /// # Errors
    ///
    /// Returns a [`FairError::PersistenceError`] on serialization or
    /// database failure.
    pub async fn save_activity(&self, activity: &Activity) -> Result<i64, FairError> {
        let payload = serde_json::to_value(activity)
            .map_err(|e| FairError::PersistenceError(e.to_string()))?;
        let row = sqlx::query_scalar::<_, i64>(
            "INSERT INTO activity_log (category, kind, payload) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(activity.category().as_str())
        .bind(activity.kind())
        .bind(&payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| FairError::PersistenceError(e.to_string()))?;

        Ok(row)
    }

    /// Saves a snapshot of the whole fair state.
    ///
    /// # Errors
    ///
    /// Returns a [`FairError::PersistenceError`] on database failure.
    pub async fn save_snapshot(&self, state_json: &serde_json::Value) -> Result<i64, FairError> {
        let row = sqlx::query_scalar::<_, i64>(
            "INSERT INTO state_snapshots (state_json) VALUES ($1) RETURNING id",
        )
        .bind(state_json)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| FairError::PersistenceError(e.to_string()))?;

        Ok(row)
    }

    /// Loads the most recent snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`FairError::PersistenceError`] on database failure.
    pub async fn load_latest_snapshot(&self) -> Result<Option<StateSnapshot>, FairError> {
        let row = sqlx::query_as::<_, (i64, serde_json::Value, DateTime<Utc>)>(
            "SELECT id, state_json, snapshot_at FROM state_snapshots \
             ORDER BY snapshot_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| FairError::PersistenceError(e.to_string()))?;

        Ok(row.map(|(id, state_json, snapshot_at)| StateSnapshot {
            id,
            state_json,
            snapshot_at,
        }))
    }

    /// Loads activities after the given timestamp, optionally of one
    /// category.
    ///
    /// # Errors
    ///
    /// Returns a [`FairError::PersistenceError`] on database failure.
    pub async fn load_activities_after(
        &self,
        after: DateTime<Utc>,
        category: Option<ActivityCategory>,
    ) -> Result<Vec<StoredActivity>, FairError> {
        let rows = if let Some(category) = category {
            sqlx::query_as::<_, (i64, String, String, serde_json::Value, DateTime<Utc>)>(
                "SELECT id, category, kind, payload, created_at FROM activity_log \
                 WHERE created_at > $1 AND category = $2 ORDER BY id ASC",
            )
            .bind(after)
            .bind(category.as_str())
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, (i64, String, String, serde_json::Value, DateTime<Utc>)>(
                "SELECT id, category, kind, payload, created_at FROM activity_log \
                 WHERE created_at > $1 ORDER BY id ASC",
            )
            .bind(after)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| FairError::PersistenceError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(id, category, kind, payload, created_at)| StoredActivity {
                id,
                category,
                kind,
                payload,
                created_at,
            })
            .collect())
    }

    /// Deletes snapshots older than the given number of days, always
    /// keeping the newest one.
    ///
    /// # Errors
    ///
    /// Returns a [`FairError::PersistenceError`] on database failure.
    pub async fn delete_old_snapshots(&self, before_days: u64) -> Result<u64, FairError> {
        let Some(cutoff) = i64::try_from(before_days)
            .ok()
            .and_then(chrono::Duration::try_days)
            .and_then(|age| Utc::now().checked_sub_signed(age))
        else {
            return Ok(0);
        };

        let result = sqlx::query(
            "DELETE FROM state_snapshots WHERE snapshot_at < $1 \
             AND id <> (SELECT id FROM state_snapshots ORDER BY snapshot_at DESC, id DESC LIMIT 1)",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| FairError::PersistenceError(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
