//! Registration, payment and food licence DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    BookingStatus, BookingTransition, FairId, LicenceStatus, LicenceTransition, PaymentTransition,
    RegistrationId, SiteSize, StallRegistration, StallholderId,
};

/// Request body for `POST /registrations`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRegistrationRequest {
    /// Fair applied to.
    pub fair_id: FairId,
    /// Applicant.
    pub stallholder_id: StallholderId,
    /// Requested site size.
    #[serde(default)]
    pub site_size: Option<SiteSize>,
    /// Whether the stall sells food.
    #[serde(default)]
    pub selling_food: bool,
    /// Invoice total in cents.
    #[serde(default)]
    pub total_charge_cents: i64,
}

/// Query for `GET /registrations`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RegistrationQuery {
    /// Only registrations for this fair.
    pub fair_id: Option<FairId>,
    /// Only registrations in this booking status.
    pub status: Option<BookingStatus>,
}

/// Request body for `POST /registrations/{id}/transitions`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BookingTransitionRequest {
    /// Transition to apply.
    pub transition: BookingTransition,
}

/// A registration with the booking transitions currently open to it.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationDetail {
    /// The registration.
    #[serde(flatten)]
    pub registration: StallRegistration,
    /// Transitions its booking status allows.
    pub available_transitions: Vec<BookingTransition>,
}

/// Request body for `POST /payments`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    /// Registration being paid for.
    pub registration_id: RegistrationId,
    /// Amount to pay in cents.
    pub amount_to_pay_cents: i64,
}

/// Query for `GET /payments`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaymentQuery {
    /// Only payments of this registration.
    pub registration_id: Option<RegistrationId>,
}

/// Request body for `POST /payments/{id}/transitions`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentTransitionRequest {
    /// Transition to apply.
    pub transition: PaymentTransition,
}

/// Request body for `POST /payments/{id}/receipts`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    /// Amount received in cents.
    pub amount_cents: i64,
}

/// Request body for `POST /licences`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLicenceRequest {
    /// Registration selling food.
    pub registration_id: RegistrationId,
}

/// Query for `GET /licences`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LicenceQuery {
    /// Only licences in this status.
    pub status: Option<LicenceStatus>,
}

/// Request body for `POST /licences/{id}/transitions`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LicenceTransitionRequest {
    /// Transition to apply.
    pub transition: LicenceTransition,
}

/// Request body for `POST /licence-batches`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBatchRequest {
    /// Council address the batch goes to.
    pub recipient_email: String,
}
