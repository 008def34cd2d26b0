//! Registration and payment handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    BookingTransitionRequest, CreatePaymentRequest, CreateRegistrationRequest, PaymentQuery,
    PaymentTransitionRequest, RecordPaymentRequest, RegistrationDetail, RegistrationQuery,
};
use crate::app_state::AppState;
use crate::domain::machine::available;
use crate::domain::{
    BookingTransition, PaymentHistory, PaymentId, RegistrationId, RegistrationRequest,
    StallRegistration,
};
use crate::error::{ErrorResponse, FairError};

/// `POST /registrations`: Register a stallholder for a fair.
///
/// # Errors
///
/// Returns [`FairError::NotFound`] for an unknown fair and
/// [`FairError::InvalidRequest`] for a negative charge.
#[utoipa::path(
    post,
    path = "/api/v1/registrations",
    tag = "Registrations",
    summary = "Create a registration",
    request_body = CreateRegistrationRequest,
    responses(
        (status = 201, description = "Registration created", body = StallRegistration),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Fair not found", body = ErrorResponse),
    )
)]
pub async fn create_registration(
    State(state): State<AppState>,
    Json(req): Json<CreateRegistrationRequest>,
) -> Result<impl IntoResponse, FairError> {
    let registration = state
        .registration_service
        .create_registration(RegistrationRequest {
            fair_id: req.fair_id,
            stallholder_id: req.stallholder_id,
            site_size: req.site_size,
            selling_food: req.selling_food,
            total_charge_cents: req.total_charge_cents,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

/// `GET /registrations`: List registrations.
#[utoipa::path(
    get,
    path = "/api/v1/registrations",
    tag = "Registrations",
    summary = "List registrations",
    params(RegistrationQuery),
    responses(
        (status = 200, description = "Matching registrations", body = Vec<StallRegistration>),
    )
)]
pub async fn list_registrations(
    State(state): State<AppState>,
    Query(query): Query<RegistrationQuery>,
) -> impl IntoResponse {
    Json(
        state
            .registration_service
            .list_registrations(query.fair_id, query.status)
            .await,
    )
}

/// `GET /registrations/{id}`: Registration with its open booking moves.
///
/// # Errors
///
/// Returns [`FairError::NotFound`] for an unknown registration.
#[utoipa::path(
    get,
    path = "/api/v1/registrations/{id}",
    tag = "Registrations",
    summary = "Get a registration",
    params(("id" = uuid::Uuid, Path, description = "Registration UUID")),
    responses(
        (status = 200, description = "Registration", body = RegistrationDetail),
        (status = 404, description = "Registration not found", body = ErrorResponse),
    )
)]
pub async fn get_registration(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, FairError> {
    let registration = state
        .registration_service
        .get_registration(RegistrationId::from_uuid(id))
        .await?;
    Ok(Json(registration_detail(registration)))
}

/// `POST /registrations/{id}/transitions`: Move a booking.
///
/// # Errors
///
/// Returns [`FairError::InvalidTransition`] for an edge the booking
/// machine does not have.
#[utoipa::path(
    post,
    path = "/api/v1/registrations/{id}/transitions",
    tag = "Registrations",
    summary = "Transition a booking",
    description = "Applies a named booking transition. Booking a registration also books its allocated event sites.",
    params(("id" = uuid::Uuid, Path, description = "Registration UUID")),
    request_body = BookingTransitionRequest,
    responses(
        (status = 200, description = "Transition applied", body = RegistrationDetail),
        (status = 404, description = "Registration not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed", body = ErrorResponse),
    )
)]
pub async fn transition_registration(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<BookingTransitionRequest>,
) -> Result<impl IntoResponse, FairError> {
    let registration = state
        .registration_service
        .transition_registration(RegistrationId::from_uuid(id), req.transition)
        .await?;
    Ok(Json(registration_detail(registration)))
}

fn registration_detail(registration: StallRegistration) -> RegistrationDetail {
    let available_transitions = available(registration.booking_status, &BookingTransition::ALL);
    RegistrationDetail {
        registration,
        available_transitions,
    }
}

/// `POST /payments`: Open a payment record.
///
/// # Errors
///
/// Returns [`FairError`] for an unknown registration or a non-positive
/// amount.
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    tag = "Payments",
    summary = "Open a payment",
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment opened", body = PaymentHistory),
        (status = 400, description = "Invalid amount", body = ErrorResponse),
        (status = 404, description = "Registration not found", body = ErrorResponse),
    )
)]
pub async fn create_payment(
    State(state): State<AppState>,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, FairError> {
    let payment = state
        .registration_service
        .create_payment(req.registration_id, req.amount_to_pay_cents)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// `GET /payments`: List payment records.
#[utoipa::path(
    get,
    path = "/api/v1/payments",
    tag = "Payments",
    summary = "List payments",
    params(PaymentQuery),
    responses(
        (status = 200, description = "Matching payments", body = Vec<PaymentHistory>),
    )
)]
pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentQuery>,
) -> impl IntoResponse {
    Json(
        state
            .registration_service
            .list_payments(query.registration_id)
            .await,
    )
}

/// `GET /payments/{id}`: Get one payment record.
///
/// # Errors
///
/// Returns [`FairError::NotFound`] for an unknown payment.
#[utoipa::path(
    get,
    path = "/api/v1/payments/{id}",
    tag = "Payments",
    summary = "Get a payment",
    params(("id" = uuid::Uuid, Path, description = "Payment UUID")),
    responses(
        (status = 200, description = "Payment", body = PaymentHistory),
        (status = 404, description = "Payment not found", body = ErrorResponse),
    )
)]
pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, FairError> {
    let payment = state
        .registration_service
        .get_payment(PaymentId::from_uuid(id))
        .await?;
    Ok(Json(payment))
}

/// `POST /payments/{id}/transitions`: Move a payment.
///
/// # Errors
///
/// Returns [`FairError::InvalidTransition`] for an edge the payment
/// machine does not have.
#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/transitions",
    tag = "Payments",
    summary = "Transition a payment",
    description = "Applies a named payment transition. Completing a payment also advances the booking.",
    params(("id" = uuid::Uuid, Path, description = "Payment UUID")),
    request_body = PaymentTransitionRequest,
    responses(
        (status = 200, description = "Transition applied", body = PaymentHistory),
        (status = 404, description = "Payment not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed", body = ErrorResponse),
    )
)]
pub async fn transition_payment(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<PaymentTransitionRequest>,
) -> Result<impl IntoResponse, FairError> {
    let payment = state
        .registration_service
        .transition_payment(PaymentId::from_uuid(id), req.transition)
        .await?;
    Ok(Json(payment))
}

/// `POST /payments/{id}/receipts`: Record money received.
///
/// # Errors
///
/// Returns [`FairError`] for a non-positive amount or a payment that can
/// no longer take money.
#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/receipts",
    tag = "Payments",
    summary = "Record a receipt",
    description = "Adds to the amount paid. The payment completes once nothing is outstanding.",
    params(("id" = uuid::Uuid, Path, description = "Payment UUID")),
    request_body = RecordPaymentRequest,
    responses(
        (status = 200, description = "Receipt recorded", body = PaymentHistory),
        (status = 400, description = "Invalid amount", body = ErrorResponse),
        (status = 404, description = "Payment not found", body = ErrorResponse),
        (status = 409, description = "Payment closed", body = ErrorResponse),
    )
)]
pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<RecordPaymentRequest>,
) -> Result<impl IntoResponse, FairError> {
    let payment = state
        .registration_service
        .record_payment(PaymentId::from_uuid(id), req.amount_cents)
        .await?;
    Ok(Json(payment))
}

/// Registration and payment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/registrations", post(create_registration).get(list_registrations))
        .route("/registrations/{id}", get(get_registration))
        .route("/registrations/{id}/transitions", post(transition_registration))
        .route("/payments", post(create_payment).get(list_payments))
        .route("/payments/{id}", get(get_payment))
        .route("/payments/{id}/transitions", post(transition_payment))
        .route("/payments/{id}/receipts", post(record_payment))
}
