//! State contracts implemented by user code.
//!
//! A graph is made of two kinds of items:
//!
//! - **Leaf states** ([`LeafState`]) hold the per-tick behavior hooks.
//! - **Composite states** ([`StateMachine`]) nest children and wire the
//!   transitions between them in a one-time [`StateMachine::setup`] pass.
//!
//! Both kinds are addressed by type. A composite is referenced through the
//! [`Composite`] wrapper so the builder can tell the two apart.

use crate::builder::{BuildError, StateBuilder};
use crate::graph::erased::{ErasedItem, LeafAdapter, MachineAdapter};
use std::any::Any;
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;

/// Terminal state carrying user behavior.
///
/// Every hook has an empty default, so a state only overrides what it needs.
/// The `scope` handed to [`on_enter`](LeafState::on_enter) and
/// [`on_execute`](LeafState::on_execute) belongs to the current activation:
/// it is created fresh on enter and cancelled right before
/// [`on_exit`](LeafState::on_exit) runs. Cancellation is cooperative; work
/// spawned from a hook must observe the token itself.
///
/// # Example
///
/// ```rust
/// use hybrid_graph::LeafState;
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Default)]
/// struct Counters {
///     idle_ticks: u32,
/// }
///
/// #[derive(Default)]
/// struct Idle;
///
/// impl LeafState for Idle {
///     type Blackboard = Counters;
///
///     fn on_execute(&mut self, blackboard: &mut Counters, _scope: &CancellationToken) {
///         blackboard.idle_ticks += 1;
///     }
/// }
/// ```
pub trait LeafState: Default + 'static {
    /// Context type this state expects from the graph.
    type Blackboard: 'static;

    /// Called once, when the state is first referenced during setup.
    fn on_initialize(&mut self, _blackboard: &mut Self::Blackboard) {}

    /// Called every time the state becomes current.
    fn on_enter(&mut self, _blackboard: &mut Self::Blackboard, _scope: &CancellationToken) {}

    /// Called every tick while the state is current and nothing is pending.
    fn on_execute(&mut self, _blackboard: &mut Self::Blackboard, _scope: &CancellationToken) {}

    /// Called when the state stops being current. Always paired with a prior enter.
    fn on_exit(&mut self, _blackboard: &mut Self::Blackboard) {}

    /// Called once, when the graph is disposed.
    fn on_destroy(&mut self, _blackboard: &mut Self::Blackboard) {}
}

/// Composite state that nests children.
///
/// `setup` runs exactly once, when the composite is first constructed, and
/// must register exactly one initial child. Enter fires when control first
/// reaches any descendant; exit fires only once control leaves the whole
/// subtree.
///
/// # Example
///
/// ```rust
/// use hybrid_graph::{BuildError, LeafState, StateBuilder, StateMachine};
///
/// #[derive(Default)]
/// struct Flags {
///     alarmed: bool,
/// }
///
/// #[derive(Default)]
/// struct Patrol;
/// impl LeafState for Patrol {
///     type Blackboard = Flags;
/// }
///
/// #[derive(Default)]
/// struct Chase;
/// impl LeafState for Chase {
///     type Blackboard = Flags;
/// }
///
/// #[derive(Default)]
/// struct Guard;
///
/// impl StateMachine for Guard {
///     type Blackboard = Flags;
///
///     fn setup(&mut self, builder: &mut StateBuilder<'_, Flags>) -> Result<(), BuildError> {
///         builder
///             .add_transition_when::<Patrol, Chase>(|flags| flags.alarmed)?
///             .add_transition::<Chase, Patrol>(0)?
///             .set_initial_state::<Patrol>()?;
///         Ok(())
///     }
/// }
/// ```
pub trait StateMachine: Default + 'static {
    /// Context type this composite and its conditions expect.
    type Blackboard: 'static;

    /// Register the initial child and the transitions between children.
    fn setup(&mut self, builder: &mut StateBuilder<'_, Self::Blackboard>)
        -> Result<(), BuildError>;

    /// Called once, after `setup` succeeded.
    fn on_initialize(&mut self, _blackboard: &mut Self::Blackboard) {}

    /// Called when control first enters the subtree.
    fn on_enter(&mut self, _blackboard: &mut Self::Blackboard) {}

    /// Called when control leaves the subtree entirely.
    fn on_exit(&mut self, _blackboard: &mut Self::Blackboard) {}

    /// Called once, after every child has been destroyed.
    fn on_destroy(&mut self, _blackboard: &mut Self::Blackboard) {}
}

/// Type-level handle that lets a [`StateMachine`] be used as a child item.
///
/// ```rust,ignore
/// builder.add_transition::<Composite<Combat>, Flee>(LOW_HEALTH)?;
/// ```
pub struct Composite<M: StateMachine>(PhantomData<fn() -> M>);

/// Anything that can be placed inside a composite.
///
/// Implemented for every [`LeafState`] and for [`Composite<M>`]; it cannot be
/// implemented outside this crate.
pub trait GraphItem: sealed::Sealed + 'static {}

impl<T: LeafState> GraphItem for T {}

impl<M: StateMachine> GraphItem for Composite<M> {}

pub(crate) mod sealed {
    use super::*;

    pub trait Sealed {
        fn erase() -> ErasedItem;
    }

    impl<T: LeafState> Sealed for T {
        fn erase() -> ErasedItem {
            ErasedItem::Leaf(Box::new(LeafAdapter::new(T::default())))
        }
    }

    impl<M: StateMachine> Sealed for Composite<M> {
        fn erase() -> ErasedItem {
            ErasedItem::Composite(Box::new(MachineAdapter::new(M::default())))
        }
    }
}

/// Downcast the opaque blackboard to the type a state declared.
pub(crate) fn downcast_blackboard<'a, B: 'static>(
    blackboard: &'a mut dyn Any,
    state: &'static str,
) -> Result<&'a mut B, BuildError> {
    blackboard
        .downcast_mut::<B>()
        .ok_or_else(|| BuildError::BlackboardMismatch {
            state,
            expected: std::any::type_name::<B>(),
        })
}

/// Type name without its module path, used for display and errors.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
