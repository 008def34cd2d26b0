//! Service error types with HTTP status code mapping.
//!
//! [`FairError`] is the central error type. Each variant maps to a specific
//! HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::machine::InvalidTransition;
use crate::domain::{AllocationId, EventId, EventSiteId, SiteId, SiteStatus, StallholderId};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4002,
///     "message": "event site 6f0c… is allocated, not available",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                |
/// |-----------|-----------------|----------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request            |
/// | 2000–2999 | Not Found       | 404 Not Found              |
/// | 3000–3999 | Server          | 500 Internal Server Error  |
/// | 4000–4999 | State conflict  | 409 Conflict               |
#[derive(Debug, thiserror::Error)]
pub enum FairError {
    /// Entity with the given ID was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind (e.g. `"event site"`).
        entity: &'static str,
        /// Requested identifier.
        id: uuid::Uuid,
    },

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A state machine rejected the transition.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// The event site cannot take an allocation in its current status.
    #[error("event site {event_site} is {status}, not available")]
    SiteNotAvailable {
        /// Event site.
        event_site: EventSiteId,
        /// Its current status.
        status: SiteStatus,
    },

    /// The stallholder already holds this event site.
    #[error("stallholder {stallholder} is already allocated event site {event_site}")]
    DuplicateAllocation {
        /// Stallholder.
        stallholder: StallholderId,
        /// Event site.
        event_site: EventSiteId,
    },

    /// An event site for this (event, site) pair already exists.
    #[error("site {site} already has an event site for event {event}")]
    DuplicateEventSite {
        /// Event.
        event: EventId,
        /// Site.
        site: SiteId,
    },

    /// The allocation's event site has progressed past allocated.
    #[error("allocation {allocation} cannot be removed: event site is {status}")]
    DeleteBlocked {
        /// Allocation.
        allocation: AllocationId,
        /// Status of its event site.
        status: SiteStatus,
    },

    /// A site status change would break the allocation/status invariant.
    #[error("allocation conflict: {0}")]
    AllocationConflict(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FairError {
    /// Shorthand for [`FairError::NotFound`].
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<uuid::Uuid>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::NotFound { .. } => 2001,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::InvalidTransition(_) => 4001,
            Self::SiteNotAvailable { .. } => 4002,
            Self::DuplicateAllocation { .. } => 4003,
            Self::DuplicateEventSite { .. } => 4004,
            Self::DeleteBlocked { .. } => 4005,
            Self::AllocationConflict(_) => 4006,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidTransition(_)
            | Self::SiteNotAvailable { .. }
            | Self::DuplicateAllocation { .. }
            | Self::DuplicateEventSite { .. }
            | Self::DeleteBlocked { .. }
            | Self::AllocationConflict(_) => StatusCode::CONFLICT,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for FairError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
