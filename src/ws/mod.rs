//! WebSocket layer: the live activity feed.
//!
//! The endpoint at `/ws` streams [`crate::domain::Activity`] records to
//! clients that subscribed to their categories.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
