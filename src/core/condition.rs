//! Polled predicates that drive automatic transitions.
//!
//! A condition is registered against a (source, target) pair and checked
//! against the blackboard while the source is current. The first satisfied
//! condition, in registration order, wins.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Shared predicate over an opaque blackboard.
///
/// Registering a condition against a composite source shares the same
/// predicate between every leaf below it, hence the reference counting.
///
/// # Example
///
/// ```rust
/// use hybrid_graph::Condition;
///
/// struct Senses {
///     enemy_visible: bool,
/// }
///
/// let spotted = Condition::new(|senses: &Senses| senses.enemy_visible);
///
/// assert!(spotted.check(&Senses { enemy_visible: true }));
/// assert!(!spotted.check(&Senses { enemy_visible: false }));
/// ```
#[derive(Clone)]
pub struct Condition {
    predicate: Rc<dyn Fn(&dyn Any) -> bool>,
}

impl Condition {
    /// Wrap a predicate over blackboard type `B`.
    ///
    /// A blackboard of any other type never satisfies the condition.
    pub fn new<B, F>(predicate: F) -> Self
    where
        B: 'static,
        F: Fn(&B) -> bool + 'static,
    {
        Condition {
            predicate: Rc::new(move |blackboard: &dyn Any| {
                blackboard.downcast_ref::<B>().is_some_and(|b| predicate(b))
            }),
        }
    }

    /// Evaluate against the blackboard.
    pub fn check(&self, blackboard: &dyn Any) -> bool {
        (self.predicate)(blackboard)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition").finish_non_exhaustive()
    }
}
