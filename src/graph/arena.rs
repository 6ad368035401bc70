//! Node storage and the propagation rules of nested state machines.
//!
//! Nodes live in a flat arena and refer to each other by [`NodeId`].
//! Ownership flows from a composite to its children (children are listed in
//! creation order); the parent link is a plain id used only for upward
//! notification.

use crate::builder::{BuildError, BuildScope};
use crate::core::{Condition, GraphItem};
use crate::graph::erased::{ErasedItem, ErasedLeaf, ErasedMachine};
use crate::graph::error::GraphError;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

pub(crate) struct Node {
    type_id: TypeId,
    name: &'static str,
    parent: Option<NodeId>,
    body: Body,
}

enum Body {
    Leaf(LeafNode),
    Composite(CompositeNode),
}

struct LeafNode {
    state: Box<dyn ErasedLeaf>,
    triggers: HashMap<i32, NodeId>,
    conditions: Vec<ConditionEdge>,
    scope: Option<CancellationToken>,
    entered: bool,
}

struct ConditionEdge {
    target: NodeId,
    condition: Condition,
}

struct CompositeNode {
    // None only while the composite's own setup is running.
    machine: Option<Box<dyn ErasedMachine>>,
    children: Vec<NodeId>,
    initial: Option<NodeId>,
    entered: bool,
}

#[derive(Default)]
pub(crate) struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn name(&self, id: NodeId) -> &'static str {
        self.nodes[id.0].name
    }

    pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub(crate) fn item_type(&self, id: NodeId) -> TypeId {
        self.nodes[id.0].type_id
    }

    /// Ancestors of `id`, innermost first.
    pub(crate) fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cursor = self.parent(id);
        while let Some(parent) = cursor {
            chain.push(parent);
            cursor = self.parent(parent);
        }
        chain
    }

    /// Whether `node` lies anywhere below `container`.
    pub(crate) fn is_descendant(&self, container: NodeId, node: NodeId) -> bool {
        let mut cursor = self.parent(node);
        while let Some(parent) = cursor {
            if parent == container {
                return true;
            }
            cursor = self.parent(parent);
        }
        false
    }

    pub(crate) fn child_of_type(&self, container: NodeId, type_id: TypeId) -> Option<NodeId> {
        match &self.nodes[container.0].body {
            Body::Composite(composite) => composite
                .children
                .iter()
                .copied()
                .find(|child| self.item_type(*child) == type_id),
            Body::Leaf(_) => None,
        }
    }

    pub(crate) fn initial(&self, container: NodeId) -> Option<NodeId> {
        match &self.nodes[container.0].body {
            Body::Composite(composite) => composite.initial,
            Body::Leaf(_) => None,
        }
    }

    pub(crate) fn set_initial(&mut self, container: NodeId, child: NodeId) {
        if let Body::Composite(composite) = &mut self.nodes[container.0].body {
            composite.initial = Some(child);
        }
    }

    /// Construct `T`, attach it under `parent` and run its initialization.
    ///
    /// Composites run their setup pass here, so by the time this returns the
    /// whole subtree below `T` exists and its initial child is known.
    pub(crate) fn instantiate<T: GraphItem>(
        &mut self,
        parent: Option<NodeId>,
        blackboard: &mut dyn Any,
    ) -> Result<NodeId, BuildError> {
        let type_id = TypeId::of::<T>();
        match T::erase() {
            ErasedItem::Leaf(mut state) => {
                let name = state.name();
                if !state.accepts(blackboard) {
                    return Err(BuildError::BlackboardMismatch {
                        state: name,
                        expected: state.blackboard_name(),
                    });
                }
                state.initialize(blackboard)?;
                let id = self.push(
                    type_id,
                    name,
                    parent,
                    Body::Leaf(LeafNode {
                        state,
                        triggers: HashMap::new(),
                        conditions: Vec::new(),
                        scope: None,
                        entered: false,
                    }),
                );
                trace!(state = name, "leaf constructed");
                Ok(id)
            }
            ErasedItem::Composite(mut machine) => {
                let name = machine.name();
                if parent.is_some_and(|parent| {
                    self.item_type(parent) == type_id
                        || self
                            .ancestors(parent)
                            .into_iter()
                            .any(|ancestor| self.item_type(ancestor) == type_id)
                }) {
                    return Err(BuildError::RecursiveState { state: name });
                }
                if !machine.accepts(blackboard) {
                    return Err(BuildError::BlackboardMismatch {
                        state: name,
                        expected: machine.blackboard_name(),
                    });
                }
                let id = self.push(
                    type_id,
                    name,
                    parent,
                    Body::Composite(CompositeNode {
                        machine: None,
                        children: Vec::new(),
                        initial: None,
                        entered: false,
                    }),
                );
                machine.setup(BuildScope::new(self, id, blackboard))?;
                if self.initial(id).is_none() {
                    return Err(BuildError::MissingInitialState { machine: name });
                }
                machine.initialize(blackboard)?;
                if let Body::Composite(composite) = &mut self.nodes[id.0].body {
                    composite.machine = Some(machine);
                }
                debug!(machine = name, "composite set up");
                Ok(id)
            }
        }
    }

    fn push(
        &mut self,
        type_id: TypeId,
        name: &'static str,
        parent: Option<NodeId>,
        body: Body,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            type_id,
            name,
            parent,
            body,
        });
        if let Some(parent) = parent {
            if let Body::Composite(composite) = &mut self.nodes[parent.0].body {
                composite.children.push(id);
            }
        }
        id
    }

    /// The leaf reached by following initial children down from `id`.
    pub(crate) fn entry_node(&self, id: NodeId) -> Result<NodeId, BuildError> {
        let mut cursor = id;
        loop {
            match &self.nodes[cursor.0].body {
                Body::Leaf(_) => return Ok(cursor),
                Body::Composite(composite) => {
                    cursor = composite.initial.ok_or(BuildError::MissingInitialState {
                        machine: self.name(cursor),
                    })?;
                }
            }
        }
    }

    /// Register a trigger edge. A composite source fans the edge out to every
    /// child it currently holds, transitively.
    pub(crate) fn connect_trigger(
        &mut self,
        from: NodeId,
        trigger: i32,
        target: NodeId,
    ) -> Result<(), BuildError> {
        let name = self.name(from);
        match &mut self.nodes[from.0].body {
            Body::Leaf(leaf) => {
                if leaf.triggers.contains_key(&trigger) {
                    return Err(BuildError::DuplicateTrigger {
                        state: name,
                        trigger,
                    });
                }
                leaf.triggers.insert(trigger, target);
                Ok(())
            }
            Body::Composite(composite) => {
                let children = composite.children.clone();
                for child in children {
                    self.connect_trigger(child, trigger, target)?;
                }
                Ok(())
            }
        }
    }

    /// Register a condition edge, fanned out the same way as triggers.
    pub(crate) fn connect_condition(
        &mut self,
        from: NodeId,
        condition: &Condition,
        target: NodeId,
    ) -> Result<(), BuildError> {
        let name = self.name(from);
        let target_name = self.name(target);
        match &mut self.nodes[from.0].body {
            Body::Leaf(leaf) => {
                if leaf.conditions.iter().any(|edge| edge.target == target) {
                    return Err(BuildError::DuplicateCondition {
                        from: name,
                        to: target_name,
                    });
                }
                leaf.conditions.push(ConditionEdge {
                    target,
                    condition: condition.clone(),
                });
                Ok(())
            }
            Body::Composite(composite) => {
                let children = composite.children.clone();
                for child in children {
                    self.connect_condition(child, condition, target)?;
                }
                Ok(())
            }
        }
    }

    pub(crate) fn trigger_target(&self, leaf: NodeId, trigger: i32) -> Option<NodeId> {
        match &self.nodes[leaf.0].body {
            Body::Leaf(leaf) => leaf.triggers.get(&trigger).copied(),
            Body::Composite(_) => None,
        }
    }

    /// First satisfied condition of `leaf`, in registration order.
    pub(crate) fn condition_target(&self, leaf: NodeId, blackboard: &dyn Any) -> Option<NodeId> {
        match &self.nodes[leaf.0].body {
            Body::Leaf(leaf) => leaf
                .conditions
                .iter()
                .find(|edge| edge.condition.check(blackboard))
                .map(|edge| edge.target),
            Body::Composite(_) => None,
        }
    }

    pub(crate) fn scope(&self, leaf: NodeId) -> Option<CancellationToken> {
        match &self.nodes[leaf.0].body {
            Body::Leaf(leaf) => leaf.scope.clone(),
            Body::Composite(_) => None,
        }
    }

    /// Enter `leaf`, first entering every ancestor that is not already active
    /// (outermost first).
    pub(crate) fn enter(
        &mut self,
        leaf: NodeId,
        blackboard: &mut dyn Any,
    ) -> Result<(), GraphError> {
        for ancestor in self.ancestors(leaf).into_iter().rev() {
            let name = self.name(ancestor);
            if let Body::Composite(composite) = &mut self.nodes[ancestor.0].body {
                if composite.entered {
                    continue;
                }
                composite.entered = true;
                trace!(machine = name, "enter");
                if let Some(machine) = composite.machine.as_mut() {
                    machine.enter(blackboard).map_err(GraphError::HookDispatch)?;
                }
            }
        }

        let name = self.name(leaf);
        if let Body::Leaf(node) = &mut self.nodes[leaf.0].body {
            let scope = CancellationToken::new();
            node.scope = Some(scope.clone());
            node.entered = true;
            trace!(state = name, "enter");
            node.state
                .enter(blackboard, &scope)
                .map_err(GraphError::HookDispatch)?;
        }
        Ok(())
    }

    pub(crate) fn execute(
        &mut self,
        leaf: NodeId,
        blackboard: &mut dyn Any,
    ) -> Result<(), GraphError> {
        let name = self.name(leaf);
        if let Body::Leaf(node) = &mut self.nodes[leaf.0].body {
            let scope = node.scope.clone().unwrap_or_default();
            trace!(state = name, "execute");
            node.state
                .execute(blackboard, &scope)
                .map_err(GraphError::HookDispatch)?;
        }
        Ok(())
    }

    /// Exit `leaf` on the way to `next`.
    ///
    /// The leaf's own exit only fires if it was entered. Each ancestor then
    /// exits, innermost first, until one is reached that is inactive or that
    /// still contains `next`.
    pub(crate) fn exit(
        &mut self,
        leaf: NodeId,
        next: NodeId,
        blackboard: &mut dyn Any,
    ) -> Result<(), GraphError> {
        let name = self.name(leaf);
        if let Body::Leaf(node) = &mut self.nodes[leaf.0].body {
            if node.entered {
                node.entered = false;
                if let Some(scope) = node.scope.take() {
                    scope.cancel();
                }
                trace!(state = name, "exit");
                node.state.exit(blackboard).map_err(GraphError::HookDispatch)?;
            } else {
                trace!(state = name, "exit skipped, never entered");
            }
        }

        for ancestor in self.ancestors(leaf) {
            let keeps_next = self.is_descendant(ancestor, next);
            let name = self.name(ancestor);
            let Body::Composite(composite) = &mut self.nodes[ancestor.0].body else {
                break;
            };
            if !composite.entered || keeps_next {
                break;
            }
            trace!(machine = name, "exit");
            if let Some(machine) = composite.machine.as_mut() {
                machine.exit(blackboard).map_err(GraphError::HookDispatch)?;
            }
            composite.entered = false;
        }
        Ok(())
    }

    /// Cancel the activation scope of `leaf` without running its exit hook.
    pub(crate) fn release_scope(&mut self, leaf: NodeId) {
        if let Body::Leaf(node) = &mut self.nodes[leaf.0].body {
            if let Some(scope) = node.scope.take() {
                scope.cancel();
            }
        }
    }

    /// Destroy `id` and everything below it, children before their composite.
    pub(crate) fn destroy(
        &mut self,
        id: NodeId,
        blackboard: &mut dyn Any,
    ) -> Result<(), GraphError> {
        let name = self.name(id);
        let children = match &self.nodes[id.0].body {
            Body::Composite(composite) => composite.children.clone(),
            Body::Leaf(_) => Vec::new(),
        };
        for child in children {
            self.destroy(child, blackboard)?;
        }

        trace!(state = name, "destroy");
        match &mut self.nodes[id.0].body {
            Body::Leaf(node) => {
                if let Some(scope) = node.scope.take() {
                    scope.cancel();
                }
                node.state.destroy(blackboard).map_err(GraphError::HookDispatch)
            }
            Body::Composite(composite) => match composite.machine.as_mut() {
                Some(machine) => machine.destroy(blackboard).map_err(GraphError::HookDispatch),
                None => Ok(()),
            },
        }
    }
}
