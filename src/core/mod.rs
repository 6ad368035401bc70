//! Core contracts of the graph.
//!
//! This module contains what user code implements or inspects:
//! - Leaf and composite state traits
//! - Polled transition conditions
//! - Bounded transition history

mod condition;
mod history;
pub(crate) mod state;

pub use condition::Condition;
pub use history::{TransitionCause, TransitionHistory, TransitionRecord};
pub use state::{Composite, GraphItem, LeafState, StateMachine};
