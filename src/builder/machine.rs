//! Builder handed to composite states during setup.

use crate::builder::error::BuildError;
use crate::core::{Condition, GraphItem};
use crate::graph::arena::{Arena, NodeId};
use std::any::{Any, TypeId};
use std::marker::PhantomData;
use tracing::debug;

/// Borrowed view of the arena positioned on the composite being set up.
pub struct BuildScope<'a> {
    arena: &'a mut Arena,
    container: NodeId,
    blackboard: &'a mut dyn Any,
}

impl<'a> BuildScope<'a> {
    pub(crate) fn new(arena: &'a mut Arena, container: NodeId, blackboard: &'a mut dyn Any) -> Self {
        Self {
            arena,
            container,
            blackboard,
        }
    }
}

/// Registers the initial child and transitions of one composite.
///
/// Children are addressed by type and constructed on first reference; asking
/// for the same type again returns the same instance. `B` is the blackboard
/// type of the composite, which is what conditions are evaluated against.
///
/// Every method returns `&mut Self` on success so registrations chain:
///
/// ```rust,ignore
/// builder
///     .add_transition::<Idle, Walk>(MOVE)?
///     .add_transition_when::<Walk, Idle>(|bb| bb.speed == 0.0)?
///     .set_initial_state::<Idle>()?;
/// ```
pub struct StateBuilder<'a, B> {
    scope: BuildScope<'a>,
    _blackboard: PhantomData<fn(&B)>,
}

impl<'a, B: 'static> StateBuilder<'a, B> {
    pub(crate) fn new(scope: BuildScope<'a>) -> Self {
        Self {
            scope,
            _blackboard: PhantomData,
        }
    }

    /// Set the child that is entered when control reaches this composite.
    ///
    /// Must be called exactly once per setup.
    pub fn set_initial_state<T: GraphItem>(&mut self) -> Result<&mut Self, BuildError> {
        let container = self.scope.container;
        if self.scope.arena.initial(container).is_some() {
            return Err(BuildError::InitialStateAlreadySet {
                machine: self.scope.arena.name(container),
            });
        }

        let child = self.child::<T>()?;
        self.scope.arena.set_initial(container, child);
        debug!(
            machine = self.scope.arena.name(container),
            initial = self.scope.arena.name(child),
            "initial state set"
        );
        Ok(self)
    }

    /// Transition from `From` to `To` when `trigger` is sent while a leaf of
    /// `From` is current.
    ///
    /// Each source accepts a trigger code only once.
    pub fn add_transition<From, To>(&mut self, trigger: i32) -> Result<&mut Self, BuildError>
    where
        From: GraphItem,
        To: GraphItem,
    {
        let from = self.child::<From>()?;
        let to = self.child::<To>()?;
        let target = self.scope.arena.entry_node(to)?;
        self.scope.arena.connect_trigger(from, trigger, target)?;
        debug!(
            from = self.scope.arena.name(from),
            to = self.scope.arena.name(target),
            trigger,
            "trigger transition added"
        );
        Ok(self)
    }

    /// Transition from `From` to `To` as soon as `condition` holds while a
    /// leaf of `From` is current.
    ///
    /// Each (source, target) pair accepts only one condition. Conditions of a
    /// source are evaluated in registration order.
    pub fn add_transition_when<From, To>(
        &mut self,
        condition: impl Fn(&B) -> bool + 'static,
    ) -> Result<&mut Self, BuildError>
    where
        From: GraphItem,
        To: GraphItem,
    {
        let from = self.child::<From>()?;
        let to = self.child::<To>()?;
        let target = self.scope.arena.entry_node(to)?;
        let condition = Condition::new::<B, _>(condition);
        self.scope
            .arena
            .connect_condition(from, &condition, target)?;
        debug!(
            from = self.scope.arena.name(from),
            to = self.scope.arena.name(target),
            "condition transition added"
        );
        Ok(self)
    }

    /// Existing child of type `T`, or a newly constructed one.
    fn child<T: GraphItem>(&mut self) -> Result<NodeId, BuildError> {
        let container = self.scope.container;
        if let Some(existing) = self.scope.arena.child_of_type(container, TypeId::of::<T>()) {
            return Ok(existing);
        }
        self.scope
            .arena
            .instantiate::<T>(Some(container), &mut *self.scope.blackboard)
    }
}
