//! Food licence application lifecycle.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::machine::Transition;

/// State of a [`super::FoodLicence`] request to the district council.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LicenceStatus {
    /// Request recorded, not yet batched.
    Created,
    /// Included in a batch awaiting dispatch.
    Batched,
    /// Sent to the council.
    Submitted,
    /// Declined by the council.
    Rejected,
    /// Granted by the council.
    Approved,
}

impl LicenceStatus {
    /// Returns `true` for the council's final decisions.
    #[must_use]
    pub const fn is_decided(self) -> bool {
        matches!(self, Self::Rejected | Self::Approved)
    }
}

/// Named transitions of [`LicenceStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LicenceTransition {
    /// Created → Batched.
    Batch,
    /// Batched → Submitted.
    Submit,
    /// Submitted → Rejected.
    Reject,
    /// Submitted → Approved.
    Approve,
}

impl LicenceTransition {
    /// Every licence transition.
    pub const ALL: [Self; 4] = [Self::Batch, Self::Submit, Self::Reject, Self::Approve];
}

impl Transition for LicenceTransition {
    type State = LicenceStatus;

    const MACHINE: &'static str = "food_licence";

    fn sources(self) -> &'static [LicenceStatus] {
        match self {
            Self::Batch => &[LicenceStatus::Created],
            Self::Submit => &[LicenceStatus::Batched],
            Self::Reject | Self::Approve => &[LicenceStatus::Submitted],
        }
    }

    fn target(self) -> LicenceStatus {
        match self {
            Self::Batch => LicenceStatus::Batched,
            Self::Submit => LicenceStatus::Submitted,
            Self::Reject => LicenceStatus::Rejected,
            Self::Approve => LicenceStatus::Approved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::machine::apply;

    #[test]
    fn decisions_only_from_submitted() {
        for from in [
            LicenceStatus::Created,
            LicenceStatus::Batched,
            LicenceStatus::Rejected,
            LicenceStatus::Approved,
        ] {
            assert!(apply(from, LicenceTransition::Approve).is_err());
            assert!(apply(from, LicenceTransition::Reject).is_err());
        }
        assert_eq!(
            apply(LicenceStatus::Submitted, LicenceTransition::Reject),
            Ok(LicenceStatus::Rejected)
        );
    }

    #[test]
    fn decided_states() {
        assert!(LicenceStatus::Approved.is_decided());
        assert!(!LicenceStatus::Submitted.is_decided());
    }
}
