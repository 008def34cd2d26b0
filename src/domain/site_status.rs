//! Booking status of a site for one fair event.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::machine::Transition;

/// Lifecycle of an [`super::EventSite`].
///
/// Variants are declared in rank order, so the derived `Ord` follows the
/// lifecycle: `Available < Allocated < Pending < Booked < Unavailable <
/// Archived`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    /// Available to be booked.
    Available,
    /// Allocated to a stallholder.
    Allocated,
    /// Pending finalisation of the booking.
    Pending,
    /// Booked.
    Booked,
    /// Not available for this event.
    Unavailable,
    /// No longer used; carried over from a previous fair.
    Archived,
}

impl SiteStatus {
    /// Numeric rank (1 = available … 6 = archived).
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Available => 1,
            Self::Allocated => 2,
            Self::Pending => 3,
            Self::Booked => 4,
            Self::Unavailable => 5,
            Self::Archived => 6,
        }
    }

    /// Returns `true` once the booking has moved beyond a plain allocation.
    #[must_use]
    pub const fn is_past_allocated(self) -> bool {
        self.rank() > Self::Allocated.rank()
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Available => "available",
            Self::Allocated => "allocated",
            Self::Pending => "pending",
            Self::Booked => "booked",
            Self::Unavailable => "unavailable",
            Self::Archived => "archived",
        };
        f.write_str(label)
    }
}

/// Named transitions of [`SiteStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SiteTransition {
    /// Available → Allocated.
    Allocate,
    /// Allocated → Available.
    Release,
    /// Allocated → Pending.
    HoldPending,
    /// Allocated | Pending → Booked.
    Book,
    /// Pending | Booked | Unavailable → Available.
    Reopen,
    /// Available → Unavailable.
    Withdraw,
    /// Any live status → Archived.
    Archive,
}

impl SiteTransition {
    /// Every site transition.
    pub const ALL: [Self; 7] = [
        Self::Allocate,
        Self::Release,
        Self::HoldPending,
        Self::Book,
        Self::Reopen,
        Self::Withdraw,
        Self::Archive,
    ];

    /// Allocation constraint on the event site for this transition.
    ///
    /// `Some(true)`: an allocation must reference the site.
    /// `Some(false)`: no allocation may reference the site.
    /// `None`: either is fine.
    #[must_use]
    pub const fn requires_allocation(self) -> Option<bool> {
        match self {
            Self::HoldPending | Self::Book => Some(true),
            Self::Release | Self::Reopen | Self::Withdraw => Some(false),
            Self::Allocate | Self::Archive => None,
        }
    }
}

impl Transition for SiteTransition {
    type State = SiteStatus;

    const MACHINE: &'static str = "site";

    fn sources(self) -> &'static [SiteStatus] {
        use SiteStatus::{Allocated, Available, Booked, Pending, Unavailable};
        match self {
            Self::Allocate | Self::Withdraw => &[Available],
            Self::Release | Self::HoldPending => &[Allocated],
            Self::Book => &[Allocated, Pending],
            Self::Reopen => &[Pending, Booked, Unavailable],
            Self::Archive => &[Available, Allocated, Pending, Booked, Unavailable],
        }
    }

    fn target(self) -> SiteStatus {
        match self {
            Self::Allocate => SiteStatus::Allocated,
            Self::Release | Self::Reopen => SiteStatus::Available,
            Self::HoldPending => SiteStatus::Pending,
            Self::Book => SiteStatus::Booked,
            Self::Withdraw => SiteStatus::Unavailable,
            Self::Archive => SiteStatus::Archived,
        }
    }
}
