//! Tunables for a graph instance.

use serde::{Deserialize, Serialize};

/// Options accepted by [`Graph::create_with_options`](crate::Graph::create_with_options).
///
/// Deserializes with defaults for any missing field, so hosts can keep it in
/// their own configuration files.
///
/// # Example
///
/// ```rust
/// use hybrid_graph::GraphOptions;
///
/// let options = GraphOptions::new()
///     .max_transition_chain(8)
///     .history_capacity(0);
///
/// assert_eq!(options.max_transition_chain, 8);
/// assert_eq!(options.history_capacity, 0);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphOptions {
    /// Upper bound on transitions drained by one `execute` call.
    pub max_transition_chain: usize,
    /// Number of transition records retained; 0 disables the history.
    pub history_capacity: usize,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            max_transition_chain: 64,
            history_capacity: 32,
        }
    }
}

impl GraphOptions {
    /// Create options with the default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transition chain limit; 0 removes the limit.
    pub fn max_transition_chain(mut self, limit: usize) -> Self {
        self.max_transition_chain = limit;
        self
    }

    /// Set how many transition records are retained.
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }
}
