//! System endpoints: health check and state machine catalog.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::machine::Transition;
use crate::domain::{BookingTransition, LicenceTransition, PaymentTransition, SiteTransition};

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// One edge set of a state machine.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransitionInfo {
    transition: String,
    from: Vec<String>,
    to: String,
}

/// A state machine and its transitions.
#[derive(Debug, Serialize, ToSchema)]
pub struct MachineInfo {
    machine: &'static str,
    transitions: Vec<TransitionInfo>,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /config/state-machines`: Transition tables of every status machine.
#[utoipa::path(
    get,
    path = "/config/state-machines",
    tag = "System",
    summary = "List state machines",
    description = "Returns the permitted source states and the target state of every named transition.",
    responses(
        (status = 200, description = "State machine catalog", body = Vec<MachineInfo>),
    )
)]
pub async fn state_machines_handler() -> impl IntoResponse {
    let machines = vec![
        describe(&SiteTransition::ALL),
        describe(&BookingTransition::ALL),
        describe(&PaymentTransition::ALL),
        describe(&LicenceTransition::ALL),
    ];
    (StatusCode::OK, Json(machines))
}

fn describe<T>(all: &[T]) -> MachineInfo
where
    T: Transition + Serialize,
    T::State: Serialize,
{
    let transitions = all
        .iter()
        .map(|t| TransitionInfo {
            transition: tag(t),
            from: t.sources().iter().map(tag).collect(),
            to: tag(&t.target()),
        })
        .collect();
    MachineInfo {
        machine: T::MACHINE,
        transitions,
    }
}

/// Serialized tag of a unit enum variant (e.g. `"hold_pending"`).
fn tag<V: Serialize>(value: &V) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/state-machines", get(state_machines_handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_uses_wire_names() {
        let info = describe(&SiteTransition::ALL);
        assert_eq!(info.machine, "site");
        let hold = info
            .transitions
            .iter()
            .find(|t| t.transition == "hold_pending");
        assert!(hold.is_some_and(|t| t.from == vec!["allocated"] && t.to == "pending"));
    }
}
