//! REST endpoint handlers organized by resource.

pub mod allocation;
pub mod inventory;
pub mod licence;
pub mod registration;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(inventory::routes())
        .merge(allocation::routes())
        .merge(registration::routes())
        .merge(licence::routes())
}
