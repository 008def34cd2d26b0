//! # fair-allocator
//!
//! Administration service for a community fair. It keeps the site
//! inventory (zones, sites, fair days), allocates event sites to returning
//! stallholders from their site history, and drives registrations,
//! payments and food licences through their state machines.
//!
//! Every write goes through one [`domain::FairStore`] lock, so allocating
//! a site and moving it to `allocated` happen together or not at all.
//! Committed changes are published on the [`domain::ActivityBus`] for
//! WebSocket subscribers and the optional Postgres recorder.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── AllocationService, RegistrationService (service/)
//!     ├── ActivityBus (domain/)
//!     │
//!     ├── FairStore / FairState (domain/)
//!     ├── Allocation run, cleanup, history rebuild (domain/)
//!     │
//!     └── PostgreSQL Recorder (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
