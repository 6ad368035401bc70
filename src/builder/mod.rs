//! One-time setup surface for composite states.
//!
//! A [`StateBuilder`] is handed to [`StateMachine::setup`](crate::StateMachine::setup)
//! and only lives for the duration of that call, so nothing can be
//! registered once setup has finished.

pub mod error;
pub mod machine;

pub use error::BuildError;
pub use machine::StateBuilder;
pub(crate) use machine::BuildScope;
