//! Runtime errors of the graph driver.

use crate::builder::BuildError;
use thiserror::Error;

/// Errors returned by [`Graph`](crate::Graph) operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Graph setup failed: {0}")]
    Build(#[from] BuildError),

    /// A hook was dispatched against a blackboard its state does not accept.
    /// Blackboard types are checked at construction, so this only surfaces
    /// if the graph's blackboard no longer matches the one it was built with.
    #[error("State hook could not run: {0}")]
    HookDispatch(BuildError),

    #[error("Graph has already been disposed")]
    UseAfterDispose,

    #[error("Blackboard is borrowed elsewhere; release it before driving the graph")]
    BlackboardBusy,

    #[error("More than {limit} chained transitions in one tick (stopped at '{state}')")]
    TransitionChainExceeded { limit: usize, state: &'static str },
}
