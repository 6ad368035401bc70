//! Configuration errors raised while a graph is being set up.

use thiserror::Error;

/// Errors that can occur while composites register their children.
///
/// All of them are fatal: the graph that triggered one is never created.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Initial state not specified for '{machine}'. Call set_initial_state() in setup")]
    MissingInitialState { machine: &'static str },

    #[error("Initial state of '{machine}' is already set")]
    InitialStateAlreadySet { machine: &'static str },

    #[error("Trigger {trigger} is already registered on '{state}'")]
    DuplicateTrigger { state: &'static str, trigger: i32 },

    #[error("A condition from '{from}' to '{to}' is already registered")]
    DuplicateCondition {
        from: &'static str,
        to: &'static str,
    },

    #[error("Blackboard is not compatible with '{state}' (expected {expected})")]
    BlackboardMismatch {
        state: &'static str,
        expected: &'static str,
    },

    #[error("'{state}' cannot be nested inside itself")]
    RecursiveState { state: &'static str },
}
