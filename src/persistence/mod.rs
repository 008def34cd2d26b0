//! Persistence layer: PostgreSQL activity log and state snapshots.
//!
//! [`postgres::PostgresPersistence`] wraps a `sqlx::PgPool`. The
//! [`recorder::Recorder`] task drains the activity bus into the
//! `activity_log` table and writes periodic snapshots of the whole fair
//! state, which are restored at startup.

pub mod models;
pub mod postgres;
pub mod recorder;
