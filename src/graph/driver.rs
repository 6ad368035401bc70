//! Tick-driven execution of a state graph.

use crate::core::{
    Composite, GraphItem, StateMachine, TransitionCause, TransitionHistory, TransitionRecord,
};
use crate::graph::arena::{Arena, NodeId};
use crate::graph::error::GraphError;
use crate::graph::options::GraphOptions;
use chrono::Utc;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug)]
struct Pending {
    target: NodeId,
    cause: TransitionCause,
}

/// Top-level owner of a state graph.
///
/// A graph is driven from a single logical thread: call [`execute`](Graph::execute)
/// once per tick and [`send_trigger`](Graph::send_trigger) whenever an external
/// event arrives. Exactly one leaf is current at a time.
///
/// The blackboard stays owned by the caller. The graph borrows it only for
/// the duration of a call, so it can be inspected or mutated freely between
/// ticks.
///
/// # Example
///
/// ```rust
/// use hybrid_graph::{BuildError, Graph, LeafState, StateBuilder, StateMachine};
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Default)]
/// struct Door {
///     opened: u32,
/// }
///
/// #[derive(Default)]
/// struct Closed;
/// impl LeafState for Closed {
///     type Blackboard = Door;
/// }
///
/// #[derive(Default)]
/// struct Open;
/// impl LeafState for Open {
///     type Blackboard = Door;
///
///     fn on_enter(&mut self, door: &mut Door, _scope: &CancellationToken) {
///         door.opened += 1;
///     }
/// }
///
/// #[derive(Default)]
/// struct DoorMachine;
/// impl StateMachine for DoorMachine {
///     type Blackboard = Door;
///
///     fn setup(&mut self, builder: &mut StateBuilder<'_, Door>) -> Result<(), BuildError> {
///         builder
///             .add_transition::<Closed, Open>(0)?
///             .add_transition::<Open, Closed>(1)?
///             .set_initial_state::<Closed>()?;
///         Ok(())
///     }
/// }
///
/// let door = Rc::new(RefCell::new(Door::default()));
/// let mut graph = Graph::create::<DoorMachine, _>(Rc::clone(&door)).unwrap();
///
/// graph.execute().unwrap();
/// assert!(graph.send_trigger(0).unwrap());
/// graph.execute().unwrap();
///
/// assert_eq!(door.borrow().opened, 1);
/// assert_eq!(graph.current_state_name(), "Open");
/// ```
pub struct Graph {
    arena: Arena,
    root: NodeId,
    current: NodeId,
    pending: Option<Pending>,
    started: bool,
    disposed: bool,
    blackboard: Rc<RefCell<dyn Any>>,
    options: GraphOptions,
    history: TransitionHistory,
}

impl Graph {
    /// Build the graph rooted at `R` with default options.
    ///
    /// Runs every setup pass and resolves the initial leaf. No enter, execute
    /// or exit hook fires until the first [`execute`](Graph::execute).
    pub fn create<R, B>(blackboard: Rc<RefCell<B>>) -> Result<Self, GraphError>
    where
        R: StateMachine,
        B: 'static,
    {
        Self::create_with_options::<R, B>(blackboard, GraphOptions::default())
    }

    /// Build the graph rooted at `R`.
    pub fn create_with_options<R, B>(
        blackboard: Rc<RefCell<B>>,
        options: GraphOptions,
    ) -> Result<Self, GraphError>
    where
        R: StateMachine,
        B: 'static,
    {
        let blackboard: Rc<RefCell<dyn Any>> = blackboard;
        let mut arena = Arena::default();
        let root = {
            let mut guard = blackboard
                .try_borrow_mut()
                .map_err(|_| GraphError::BlackboardBusy)?;
            arena.instantiate::<Composite<R>>(None, &mut *guard)?
        };
        let current = arena.entry_node(root)?;
        debug!(
            root = arena.name(root),
            initial = arena.name(current),
            states = arena.len(),
            "graph created"
        );

        Ok(Self {
            arena,
            root,
            current,
            pending: None,
            started: false,
            disposed: false,
            blackboard,
            history: TransitionHistory::with_capacity(options.history_capacity),
            options,
        })
    }

    /// Advance the graph by one tick.
    ///
    /// On the first call the initial leaf is entered, unless one of its
    /// conditions already holds, in which case it is skipped entirely. Later
    /// calls poll the current leaf's conditions and run its execute hook when
    /// none fires. Any pending transition (latched trigger or satisfied
    /// condition) is then drained, following chained conditions until a leaf
    /// settles.
    pub fn execute(&mut self) -> Result<(), GraphError> {
        self.ensure_live()?;
        let blackboard = Rc::clone(&self.blackboard);
        let mut guard = blackboard
            .try_borrow_mut()
            .map_err(|_| GraphError::BlackboardBusy)?;
        self.tick(&mut *guard)
    }

    fn tick(&mut self, blackboard: &mut dyn Any) -> Result<(), GraphError> {
        if !self.started {
            self.started = true;
            if !self.poll_conditions(blackboard) {
                self.arena.enter(self.current, blackboard)?;
            }
            if self.pending.is_none() {
                return Ok(());
            }
        }

        if self.pending.is_none() && !self.poll_conditions(blackboard) {
            self.arena.execute(self.current, blackboard)?;
        }

        self.drain(blackboard)
    }

    /// Latch the current leaf's transition for `trigger`, if it has one.
    ///
    /// Returns `Ok(false)` and changes nothing when the current leaf does not
    /// react to `trigger`. A later successful call before the next
    /// [`execute`](Graph::execute) replaces the latched transition.
    pub fn send_trigger(&mut self, trigger: i32) -> Result<bool, GraphError> {
        self.ensure_live()?;
        let Some(target) = self.arena.trigger_target(self.current, trigger) else {
            return Ok(false);
        };

        let previous = self.pending.replace(Pending {
            target,
            cause: TransitionCause::Trigger(trigger),
        });
        debug!(
            state = self.arena.name(self.current),
            target = self.arena.name(target),
            trigger,
            replaced = previous.is_some(),
            "trigger latched"
        );
        Ok(true)
    }

    /// Destroy every state, children before their composite.
    ///
    /// The current leaf's activation scope is cancelled but its exit hook is
    /// not called. Any further operation fails with
    /// [`GraphError::UseAfterDispose`].
    pub fn dispose(&mut self) -> Result<(), GraphError> {
        self.ensure_live()?;
        let blackboard = Rc::clone(&self.blackboard);
        let mut guard = blackboard
            .try_borrow_mut()
            .map_err(|_| GraphError::BlackboardBusy)?;

        self.disposed = true;
        self.pending = None;
        self.arena.release_scope(self.current);
        self.arena.destroy(self.root, &mut *guard)?;
        debug!(root = self.arena.name(self.root), "graph disposed");
        Ok(())
    }

    /// Short type name of the current leaf.
    pub fn current_state_name(&self) -> &'static str {
        self.arena.name(self.current)
    }

    /// Whether the current leaf is `T`, or lies inside composite `T`.
    pub fn is_in<T: GraphItem>(&self) -> bool {
        let type_id = TypeId::of::<T>();
        self.arena.item_type(self.current) == type_id
            || self
                .arena
                .ancestors(self.current)
                .into_iter()
                .any(|ancestor| self.arena.item_type(ancestor) == type_id)
    }

    /// Activation scope of the current leaf, once it has been entered.
    pub fn current_scope(&self) -> Option<CancellationToken> {
        self.arena.scope(self.current)
    }

    /// Whether a transition is latched and waits for the next tick.
    pub fn has_pending_transition(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the first tick has run.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether [`dispose`](Graph::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Transitions drained so far, oldest first.
    pub fn history(&self) -> &TransitionHistory {
        &self.history
    }

    /// Options the graph was created with.
    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    fn ensure_live(&self) -> Result<(), GraphError> {
        if self.disposed {
            Err(GraphError::UseAfterDispose)
        } else {
            Ok(())
        }
    }

    /// Latch the first satisfied condition of the current leaf.
    fn poll_conditions(&mut self, blackboard: &dyn Any) -> bool {
        match self.arena.condition_target(self.current, blackboard) {
            Some(target) => {
                self.pending = Some(Pending {
                    target,
                    cause: TransitionCause::Condition,
                });
                true
            }
            None => false,
        }
    }

    fn drain(&mut self, blackboard: &mut dyn Any) -> Result<(), GraphError> {
        let limit = self.options.max_transition_chain;
        let mut hops = 0;

        while let Some(pending) = self.pending {
            if limit != 0 && hops == limit {
                let state = self.arena.name(self.current);
                warn!(state, limit, "transition chain limit reached");
                return Err(GraphError::TransitionChainExceeded { limit, state });
            }
            hops += 1;

            self.pending = None;
            let from = self.current;
            self.arena.exit(from, pending.target, blackboard)?;
            self.current = pending.target;
            self.record(from, pending);

            // A condition that already holds chains into the next hop, but
            // the leaf is still entered first.
            self.poll_conditions(blackboard);
            self.arena.enter(self.current, blackboard)?;
        }
        Ok(())
    }

    fn record(&mut self, from: NodeId, pending: Pending) {
        let from = self.arena.name(from);
        let to = self.arena.name(pending.target);
        debug!(from, to, cause = ?pending.cause, "transition");
        self.history.record(TransitionRecord {
            from: from.to_string(),
            to: to.to_string(),
            cause: pending.cause,
            timestamp: Utc::now(),
        });
    }
}

impl Drop for Graph {
    fn drop(&mut self) {
        if !self.disposed {
            self.arena.release_scope(self.current);
        }
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("root", &self.arena.name(self.root))
            .field("current", &self.arena.name(self.current))
            .field("pending", &self.pending.map(|p| self.arena.name(p.target)))
            .field("started", &self.started)
            .field("disposed", &self.disposed)
            .finish()
    }
}
