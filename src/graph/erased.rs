//! Type-erased wrappers around user states.
//!
//! The arena stores every node behind one of two object-safe traits so that
//! states with different concrete types (and different declared blackboard
//! types) can live side by side. Each call downcasts the opaque blackboard
//! to the type the state declared.

use crate::builder::{BuildError, BuildScope, StateBuilder};
use crate::core::state::{downcast_blackboard, short_type_name};
use crate::core::{LeafState, StateMachine};
use std::any::Any;
use tokio_util::sync::CancellationToken;

/// A freshly constructed item, not yet placed in the arena.
pub enum ErasedItem {
    Leaf(Box<dyn ErasedLeaf>),
    Composite(Box<dyn ErasedMachine>),
}

pub trait ErasedLeaf {
    fn name(&self) -> &'static str;
    fn accepts(&self, blackboard: &dyn Any) -> bool;
    fn blackboard_name(&self) -> &'static str;
    fn initialize(&mut self, blackboard: &mut dyn Any) -> Result<(), BuildError>;
    fn enter(&mut self, blackboard: &mut dyn Any, scope: &CancellationToken)
        -> Result<(), BuildError>;
    fn execute(
        &mut self,
        blackboard: &mut dyn Any,
        scope: &CancellationToken,
    ) -> Result<(), BuildError>;
    fn exit(&mut self, blackboard: &mut dyn Any) -> Result<(), BuildError>;
    fn destroy(&mut self, blackboard: &mut dyn Any) -> Result<(), BuildError>;
}

pub trait ErasedMachine {
    fn name(&self) -> &'static str;
    fn accepts(&self, blackboard: &dyn Any) -> bool;
    fn blackboard_name(&self) -> &'static str;
    fn setup(&mut self, scope: BuildScope<'_>) -> Result<(), BuildError>;
    fn initialize(&mut self, blackboard: &mut dyn Any) -> Result<(), BuildError>;
    fn enter(&mut self, blackboard: &mut dyn Any) -> Result<(), BuildError>;
    fn exit(&mut self, blackboard: &mut dyn Any) -> Result<(), BuildError>;
    fn destroy(&mut self, blackboard: &mut dyn Any) -> Result<(), BuildError>;
}

pub struct LeafAdapter<S: LeafState> {
    state: S,
}

impl<S: LeafState> LeafAdapter<S> {
    pub fn new(state: S) -> Self {
        Self { state }
    }

    fn blackboard<'a>(&self, blackboard: &'a mut dyn Any) -> Result<&'a mut S::Blackboard, BuildError> {
        downcast_blackboard::<S::Blackboard>(blackboard, self.name())
    }
}

impl<S: LeafState> ErasedLeaf for LeafAdapter<S> {
    fn name(&self) -> &'static str {
        short_type_name::<S>()
    }

    fn accepts(&self, blackboard: &dyn Any) -> bool {
        blackboard.is::<S::Blackboard>()
    }

    fn blackboard_name(&self) -> &'static str {
        std::any::type_name::<S::Blackboard>()
    }

    fn initialize(&mut self, blackboard: &mut dyn Any) -> Result<(), BuildError> {
        let blackboard = self.blackboard(blackboard)?;
        self.state.on_initialize(blackboard);
        Ok(())
    }

    fn enter(
        &mut self,
        blackboard: &mut dyn Any,
        scope: &CancellationToken,
    ) -> Result<(), BuildError> {
        let blackboard = self.blackboard(blackboard)?;
        self.state.on_enter(blackboard, scope);
        Ok(())
    }

    fn execute(
        &mut self,
        blackboard: &mut dyn Any,
        scope: &CancellationToken,
    ) -> Result<(), BuildError> {
        let blackboard = self.blackboard(blackboard)?;
        self.state.on_execute(blackboard, scope);
        Ok(())
    }

    fn exit(&mut self, blackboard: &mut dyn Any) -> Result<(), BuildError> {
        let blackboard = self.blackboard(blackboard)?;
        self.state.on_exit(blackboard);
        Ok(())
    }

    fn destroy(&mut self, blackboard: &mut dyn Any) -> Result<(), BuildError> {
        let blackboard = self.blackboard(blackboard)?;
        self.state.on_destroy(blackboard);
        Ok(())
    }
}

pub struct MachineAdapter<M: StateMachine> {
    machine: M,
}

impl<M: StateMachine> MachineAdapter<M> {
    pub fn new(machine: M) -> Self {
        Self { machine }
    }

    fn blackboard<'a>(&self, blackboard: &'a mut dyn Any) -> Result<&'a mut M::Blackboard, BuildError> {
        downcast_blackboard::<M::Blackboard>(blackboard, self.name())
    }
}

impl<M: StateMachine> ErasedMachine for MachineAdapter<M> {
    fn name(&self) -> &'static str {
        short_type_name::<M>()
    }

    fn accepts(&self, blackboard: &dyn Any) -> bool {
        blackboard.is::<M::Blackboard>()
    }

    fn blackboard_name(&self) -> &'static str {
        std::any::type_name::<M::Blackboard>()
    }

    fn setup(&mut self, scope: BuildScope<'_>) -> Result<(), BuildError> {
        let mut builder = StateBuilder::<M::Blackboard>::new(scope);
        self.machine.setup(&mut builder)
    }

    fn initialize(&mut self, blackboard: &mut dyn Any) -> Result<(), BuildError> {
        let blackboard = self.blackboard(blackboard)?;
        self.machine.on_initialize(blackboard);
        Ok(())
    }

    fn enter(&mut self, blackboard: &mut dyn Any) -> Result<(), BuildError> {
        let blackboard = self.blackboard(blackboard)?;
        self.machine.on_enter(blackboard);
        Ok(())
    }

    fn exit(&mut self, blackboard: &mut dyn Any) -> Result<(), BuildError> {
        let blackboard = self.blackboard(blackboard)?;
        self.machine.on_exit(blackboard);
        Ok(())
    }

    fn destroy(&mut self, blackboard: &mut dyn Any) -> Result<(), BuildError> {
        let blackboard = self.blackboard(blackboard)?;
        self.machine.on_destroy(blackboard);
        Ok(())
    }
}
