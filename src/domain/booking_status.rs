//! Stall registration booking lifecycle.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::machine::Transition;

/// Booking state of a [`super::StallRegistration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Draft registration.
    Created,
    /// Submitted by the stallholder.
    Submitted,
    /// Invoice issued.
    Invoiced,
    /// Invoice paid in full.
    PaymentCompleted,
    /// Convener is reviewing the site allocation.
    AllocationReview,
    /// Allocation waiting on the stallholder or a site swap.
    AllocationPending,
    /// Allocation accepted.
    AllocationApproved,
    /// Allocation rejected.
    AllocationCancelled,
    /// Refund request under review.
    RefundReview,
    /// Stallholder donated the refund to the fair.
    RefundDonated,
    /// Refund declined.
    RefundRejected,
    /// Refund paid.
    RefundApproved,
    /// Booking confirmed.
    Booked,
    /// Registration withdrawn.
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Created => "Created",
            Self::Submitted => "Submitted",
            Self::Invoiced => "Invoiced",
            Self::PaymentCompleted => "Payment Completed",
            Self::AllocationReview => "Allocation Review",
            Self::AllocationPending => "Allocation Pending",
            Self::AllocationApproved => "Allocation Approved",
            Self::AllocationCancelled => "Allocation Cancelled",
            Self::RefundReview => "Refund Review",
            Self::RefundDonated => "Refund Donated",
            Self::RefundRejected => "Refund Rejected",
            Self::RefundApproved => "Refund Approved",
            Self::Booked => "Booked",
            Self::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

/// Named transitions of [`BookingStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookingTransition {
    /// Created → Submitted.
    Submit,
    /// Submitted → Invoiced.
    Invoice,
    /// Invoiced → Payment Completed.
    CompletePayment,
    /// Submitted | Invoiced | Payment Completed → Allocation Review.
    ReviewAllocation,
    /// Allocation Review → Allocation Pending.
    PendAllocation,
    /// Allocation Review | Allocation Pending → Allocation Approved.
    ApproveAllocation,
    /// Allocation Review | Allocation Pending → Allocation Cancelled.
    CancelAllocation,
    /// Allocation Cancelled | Booked → Refund Review.
    ReviewRefund,
    /// Refund Review → Refund Donated.
    DonateRefund,
    /// Refund Review → Refund Rejected.
    RejectRefund,
    /// Refund Review → Refund Approved.
    ApproveRefund,
    /// Payment Completed | Allocation Approved | Refund Rejected → Booked.
    Book,
    /// Any pre-payment or refund-settled state → Cancelled.
    Cancel,
}

impl BookingTransition {
    /// Every booking transition.
    pub const ALL: [Self; 13] = [
        Self::Submit,
        Self::Invoice,
        Self::CompletePayment,
        Self::ReviewAllocation,
        Self::PendAllocation,
        Self::ApproveAllocation,
        Self::CancelAllocation,
        Self::ReviewRefund,
        Self::DonateRefund,
        Self::RejectRefund,
        Self::ApproveRefund,
        Self::Book,
        Self::Cancel,
    ];
}

impl Transition for BookingTransition {
    type State = BookingStatus;

    const MACHINE: &'static str = "booking";

    fn sources(self) -> &'static [BookingStatus] {
        use BookingStatus::{
            AllocationApproved, AllocationCancelled, AllocationPending, AllocationReview, Booked,
            Created, Invoiced, PaymentCompleted, RefundApproved, RefundDonated, RefundRejected,
            RefundReview, Submitted,
        };
        match self {
            Self::Submit => &[Created],
            Self::Invoice => &[Submitted],
            Self::CompletePayment => &[Invoiced],
            Self::ReviewAllocation => &[Submitted, Invoiced, PaymentCompleted],
            Self::PendAllocation => &[AllocationReview],
            Self::ApproveAllocation | Self::CancelAllocation => {
                &[AllocationReview, AllocationPending]
            }
            Self::ReviewRefund => &[AllocationCancelled, Booked],
            Self::DonateRefund | Self::RejectRefund | Self::ApproveRefund => &[RefundReview],
            Self::Book => &[PaymentCompleted, AllocationApproved, RefundRejected],
            Self::Cancel => &[
                Created,
                Submitted,
                Invoiced,
                AllocationCancelled,
                RefundDonated,
                RefundApproved,
            ],
        }
    }

    fn target(self) -> BookingStatus {
        match self {
            Self::Submit => BookingStatus::Submitted,
            Self::Invoice => BookingStatus::Invoiced,
            Self::CompletePayment => BookingStatus::PaymentCompleted,
            Self::ReviewAllocation => BookingStatus::AllocationReview,
            Self::PendAllocation => BookingStatus::AllocationPending,
            Self::ApproveAllocation => BookingStatus::AllocationApproved,
            Self::CancelAllocation => BookingStatus::AllocationCancelled,
            Self::ReviewRefund => BookingStatus::RefundReview,
            Self::DonateRefund => BookingStatus::RefundDonated,
            Self::RejectRefund => BookingStatus::RefundRejected,
            Self::ApproveRefund => BookingStatus::RefundApproved,
            Self::Book => BookingStatus::Booked,
            Self::Cancel => BookingStatus::Cancelled,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::machine::{apply, available};

    const ALL_STATES: [BookingStatus; 14] = [
        BookingStatus::Created,
        BookingStatus::Submitted,
        BookingStatus::Invoiced,
        BookingStatus::PaymentCompleted,
        BookingStatus::AllocationReview,
        BookingStatus::AllocationPending,
        BookingStatus::AllocationApproved,
        BookingStatus::AllocationCancelled,
        BookingStatus::RefundReview,
        BookingStatus::RefundDonated,
        BookingStatus::RefundRejected,
        BookingStatus::RefundApproved,
        BookingStatus::Booked,
        BookingStatus::Cancelled,
    ];

    #[test]
    fn happy_path_reaches_booked() {
        let mut status = BookingStatus::Created;
        for t in [
            BookingTransition::Submit,
            BookingTransition::Invoice,
            BookingTransition::CompletePayment,
            BookingTransition::Book,
        ] {
            let Ok(next) = apply(status, t) else {
                panic!("{t:?} rejected from {status:?}");
            };
            status = next;
        }
        assert_eq!(status, BookingStatus::Booked);
    }

    #[test]
    fn only_enumerated_edges_succeed() {
        use BookingStatus as S;
        use BookingTransition as T;
        let edges: [(BookingTransition, &[BookingStatus], BookingStatus); 13] = [
            (T::Submit, &[S::Created], S::Submitted),
            (T::Invoice, &[S::Submitted], S::Invoiced),
            (T::CompletePayment, &[S::Invoiced], S::PaymentCompleted),
            (
                T::ReviewAllocation,
                &[S::Submitted, S::Invoiced, S::PaymentCompleted],
                S::AllocationReview,
            ),
            (T::PendAllocation, &[S::AllocationReview], S::AllocationPending),
            (
                T::ApproveAllocation,
                &[S::AllocationReview, S::AllocationPending],
                S::AllocationApproved,
            ),
            (
                T::CancelAllocation,
                &[S::AllocationReview, S::AllocationPending],
                S::AllocationCancelled,
            ),
            (T::ReviewRefund, &[S::AllocationCancelled, S::Booked], S::RefundReview),
            (T::DonateRefund, &[S::RefundReview], S::RefundDonated),
            (T::RejectRefund, &[S::RefundReview], S::RefundRejected),
            (T::ApproveRefund, &[S::RefundReview], S::RefundApproved),
            (
                T::Book,
                &[S::PaymentCompleted, S::AllocationApproved, S::RefundRejected],
                S::Booked,
            ),
            (
                T::Cancel,
                &[
                    S::Created,
                    S::Submitted,
                    S::Invoiced,
                    S::AllocationCancelled,
                    S::RefundDonated,
                    S::RefundApproved,
                ],
                S::Cancelled,
            ),
        ];
        assert_eq!(edges.len(), BookingTransition::ALL.len());

        for (t, sources, target) in edges {
            for from in ALL_STATES {
                let expected = if sources.contains(&from) { Ok(target) } else { Err(()) };
                assert_eq!(apply(from, t).map_err(|_| ()), expected, "{from:?} via {t:?}");
            }
        }
    }

    #[test]
    fn cannot_skip_invoice() {
        let err = apply(BookingStatus::Submitted, BookingTransition::CompletePayment);
        let Err(err) = err else {
            panic!("expected rejection");
        };
        assert_eq!(err.machine, "booking");
        assert_eq!(err.from, "Submitted");
    }

    #[test]
    fn cancelled_is_terminal() {
        assert!(available(BookingStatus::Cancelled, &BookingTransition::ALL).is_empty());
    }

    #[test]
    fn refund_branch() {
        assert_eq!(
            apply(BookingStatus::Booked, BookingTransition::ReviewRefund),
            Ok(BookingStatus::RefundReview)
        );
        let moves = available(BookingStatus::RefundReview, &BookingTransition::ALL);
        assert_eq!(
            moves,
            vec![
                BookingTransition::DonateRefund,
                BookingTransition::RejectRefund,
                BookingTransition::ApproveRefund
            ]
        );
    }

    #[test]
    fn display_uses_human_labels() {
        assert_eq!(BookingStatus::PaymentCompleted.to_string(), "Payment Completed");
    }
}
