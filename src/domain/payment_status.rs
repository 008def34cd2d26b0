//! Payment record lifecycle.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::machine::Transition;

/// State of a [`super::PaymentHistory`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting payment.
    Pending,
    /// Replaced by a newer payment record.
    Superseded,
    /// Cancelled before payment.
    Cancelled,
    /// Paid in full.
    Completed,
    /// Converted to a credit for a later fair.
    Credit,
    /// Payment attempt failed.
    Failed,
    /// Paid and matched against the bank statement.
    Reconciled,
}

/// Named transitions of [`PaymentStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTransition {
    /// Pending | Completed | Reconciled | Failed → Superseded.
    Supersede,
    /// Pending → Cancelled.
    Cancel,
    /// Pending → Failed.
    Fail,
    /// Pending → Completed.
    Complete,
    /// Pending | Completed → Credit.
    Credit,
    /// Completed → Reconciled.
    Reconcile,
}

impl PaymentTransition {
    /// Every payment transition.
    pub const ALL: [Self; 6] = [
        Self::Supersede,
        Self::Cancel,
        Self::Fail,
        Self::Complete,
        Self::Credit,
        Self::Reconcile,
    ];
}

impl Transition for PaymentTransition {
    type State = PaymentStatus;

    const MACHINE: &'static str = "payment";

    fn sources(self) -> &'static [PaymentStatus] {
        use PaymentStatus::{Completed, Failed, Pending, Reconciled};
        match self {
            Self::Supersede => &[Pending, Completed, Reconciled, Failed],
            Self::Cancel | Self::Fail | Self::Complete => &[Pending],
            Self::Credit => &[Pending, Completed],
            Self::Reconcile => &[Completed],
        }
    }

    fn target(self) -> PaymentStatus {
        match self {
            Self::Supersede => PaymentStatus::Superseded,
            Self::Cancel => PaymentStatus::Cancelled,
            Self::Fail => PaymentStatus::Failed,
            Self::Complete => PaymentStatus::Completed,
            Self::Credit => PaymentStatus::Credit,
            Self::Reconcile => PaymentStatus::Reconciled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::machine::{apply, available};

    #[test]
    fn reconcile_requires_completed() {
        assert!(apply(PaymentStatus::Pending, PaymentTransition::Reconcile).is_err());
        assert_eq!(
            apply(PaymentStatus::Completed, PaymentTransition::Reconcile),
            Ok(PaymentStatus::Reconciled)
        );
    }

    #[test]
    fn supersede_from_settled_states() {
        for from in [
            PaymentStatus::Pending,
            PaymentStatus::Completed,
            PaymentStatus::Reconciled,
            PaymentStatus::Failed,
        ] {
            assert_eq!(
                apply(from, PaymentTransition::Supersede),
                Ok(PaymentStatus::Superseded)
            );
        }
        assert!(apply(PaymentStatus::Credit, PaymentTransition::Supersede).is_err());
    }

    #[test]
    fn superseded_is_terminal() {
        assert!(available(PaymentStatus::Superseded, &PaymentTransition::ALL).is_empty());
    }
}
