//! Shared shape of the status state machines.
//!
//! Each machine is a pair of enums: the states, and the named transitions
//! between them. A transition lists its permitted source states and its
//! single target state as an exhaustive `match`, so adding a transition
//! without declaring its edges does not compile.

use std::fmt;

/// A named edge set of a finite-state machine.
pub trait Transition: Copy + fmt::Debug {
    /// State type the transition operates on.
    type State: Copy + Eq + fmt::Debug + 'static;

    /// Name of the machine, used in error messages (e.g. `"booking"`).
    const MACHINE: &'static str;

    /// States this transition may start from.
    fn sources(self) -> &'static [Self::State];

    /// State this transition ends in.
    fn target(self) -> Self::State;

    /// Returns `true` if the transition may fire from `from`.
    fn allowed_from(self, from: Self::State) -> bool {
        self.sources().contains(&from)
    }
}

/// Rejected transition: `from` is not one of the transition's sources.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{machine} transition {transition} is not allowed from {from}")]
pub struct InvalidTransition {
    /// Machine name.
    pub machine: &'static str,
    /// Debug rendering of the current state.
    pub from: String,
    /// Debug rendering of the attempted transition.
    pub transition: String,
}

/// Applies `transition` to `current`, returning the target state.
///
/// # Errors
///
/// Returns [`InvalidTransition`] when `current` is not a source state of
/// `transition`.
pub fn apply<T: Transition>(
    current: T::State,
    transition: T,
) -> Result<T::State, InvalidTransition> {
    if transition.allowed_from(current) {
        Ok(transition.target())
    } else {
        Err(InvalidTransition {
            machine: T::MACHINE,
            from: format!("{current:?}"),
            transition: format!("{transition:?}"),
        })
    }
}

/// Lists the transitions in `all` that may fire from `current`.
#[must_use]
pub fn available<T: Transition>(current: T::State, all: &[T]) -> Vec<T> {
    all.iter()
        .copied()
        .filter(|t| t.allowed_from(current))
        .collect()
}
