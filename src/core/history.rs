//! Transition history tracking.
//!
//! The graph appends one record per drained transition. The log is bounded:
//! once full, the oldest record is dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// What caused a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// Latched by [`Graph::send_trigger`](crate::Graph::send_trigger).
    Trigger(i32),
    /// A polled condition was satisfied.
    Condition,
}

/// Record of a single leaf-to-leaf transition.
///
/// # Example
///
/// ```rust
/// use hybrid_graph::{TransitionCause, TransitionRecord};
/// use chrono::Utc;
///
/// let record = TransitionRecord {
///     from: "Patrol".to_string(),
///     to: "Chase".to_string(),
///     cause: TransitionCause::Trigger(3),
///     timestamp: Utc::now(),
/// };
/// assert_eq!(record.cause, TransitionCause::Trigger(3));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Leaf that was current before the transition
    pub from: String,
    /// Leaf that became current
    pub to: String,
    /// Trigger code or condition that fired
    pub cause: TransitionCause,
    /// When the transition was drained
    pub timestamp: DateTime<Utc>,
}

/// Ordered, bounded history of transitions.
///
/// # Example
///
/// ```rust
/// use hybrid_graph::{TransitionCause, TransitionHistory, TransitionRecord};
/// use chrono::Utc;
///
/// let mut history = TransitionHistory::with_capacity(8);
///
/// history.record(TransitionRecord {
///     from: "Idle".to_string(),
///     to: "Walk".to_string(),
///     cause: TransitionCause::Condition,
///     timestamp: Utc::now(),
/// });
/// history.record(TransitionRecord {
///     from: "Walk".to_string(),
///     to: "Run".to_string(),
///     cause: TransitionCause::Trigger(1),
///     timestamp: Utc::now(),
/// });
///
/// assert_eq!(history.path(), vec!["Idle", "Walk", "Run"]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionHistory {
    capacity: usize,
    transitions: VecDeque<TransitionRecord>,
}

impl Default for TransitionHistory {
    fn default() -> Self {
        Self::with_capacity(32)
    }
}

impl TransitionHistory {
    /// Create an empty history that keeps at most `capacity` records.
    ///
    /// A capacity of zero disables recording.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            transitions: VecDeque::with_capacity(capacity.min(256)),
        }
    }

    /// Append a record, evicting the oldest one when full.
    pub fn record(&mut self, transition: TransitionRecord) {
        if self.capacity == 0 {
            return;
        }
        if self.transitions.len() == self.capacity {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    /// Names of the leaves traversed: the first `from`, then every `to`.
    pub fn path(&self) -> Vec<&str> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(first) = self.transitions.front() {
            path.push(first.from.as_str());
        }
        for transition in &self.transitions {
            path.push(transition.to.as_str());
        }
        path
    }

    /// Time between the first and last retained transition.
    ///
    /// Returns `None` if nothing has been recorded.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.front(), self.transitions.back()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// Retained transitions, oldest first.
    pub fn transitions(&self) -> impl ExactSizeIterator<Item = &TransitionRecord> {
        self.transitions.iter()
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.transitions.back()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.transitions.clear();
    }
}
