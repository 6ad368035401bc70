//! Hybrid Graph: a hierarchical finite state machine runtime
//!
//! Hybrid Graph drives per-tick decision logic for an agent, such as a game
//! character or an AI controller, against a blackboard the host owns. States
//! nest: composite states group children and see a single enter/exit around
//! whatever happens inside them, while leaf states carry the behavior.
//!
//! # Core Concepts
//!
//! - **Leaf states**: behavior hooks via the [`LeafState`] trait
//! - **Composite states**: nested machines via the [`StateMachine`] trait,
//!   wired once through a [`StateBuilder`]
//! - **Triggers**: integer events latched with [`Graph::send_trigger`]
//! - **Conditions**: predicates over the blackboard polled every tick
//! - **Graph**: the driver that owns the root and advances it with
//!   [`Graph::execute`]
//!
//! # Example
//!
//! ```rust
//! use hybrid_graph::{BuildError, Composite, Graph, LeafState, StateBuilder, StateMachine};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use tokio_util::sync::CancellationToken;
//!
//! const HURT: i32 = 0;
//!
//! #[derive(Default)]
//! struct Agent {
//!     health: i32,
//!     combat_entries: u32,
//! }
//!
//! #[derive(Default)]
//! struct Aim;
//! impl LeafState for Aim {
//!     type Blackboard = Agent;
//! }
//!
//! #[derive(Default)]
//! struct Fire;
//! impl LeafState for Fire {
//!     type Blackboard = Agent;
//! }
//!
//! #[derive(Default)]
//! struct Retreat;
//! impl LeafState for Retreat {
//!     type Blackboard = Agent;
//!
//!     fn on_execute(&mut self, agent: &mut Agent, _scope: &CancellationToken) {
//!         agent.health += 10;
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Combat;
//! impl StateMachine for Combat {
//!     type Blackboard = Agent;
//!
//!     fn setup(&mut self, builder: &mut StateBuilder<'_, Agent>) -> Result<(), BuildError> {
//!         builder
//!             .add_transition_when::<Aim, Fire>(|_| true)?
//!             .set_initial_state::<Aim>()?;
//!         Ok(())
//!     }
//!
//!     fn on_enter(&mut self, agent: &mut Agent) {
//!         agent.combat_entries += 1;
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Soldier;
//! impl StateMachine for Soldier {
//!     type Blackboard = Agent;
//!
//!     fn setup(&mut self, builder: &mut StateBuilder<'_, Agent>) -> Result<(), BuildError> {
//!         builder
//!             .add_transition::<Composite<Combat>, Retreat>(HURT)?
//!             .add_transition_when::<Retreat, Composite<Combat>>(|agent| agent.health >= 50)?
//!             .set_initial_state::<Composite<Combat>>()?;
//!         Ok(())
//!     }
//! }
//!
//! let agent = Rc::new(RefCell::new(Agent { health: 30, combat_entries: 0 }));
//! let mut graph = Graph::create::<Soldier, _>(Rc::clone(&agent)).unwrap();
//!
//! // Aim's condition already holds, so the first tick lands on Fire.
//! graph.execute().unwrap();
//! assert_eq!(graph.current_state_name(), "Fire");
//! assert!(graph.is_in::<Composite<Combat>>());
//!
//! graph.send_trigger(HURT).unwrap();
//! graph.execute().unwrap();
//! assert_eq!(graph.current_state_name(), "Retreat");
//! assert_eq!(agent.borrow().combat_entries, 1);
//! ```

pub mod builder;
pub mod core;
pub mod graph;

// Re-export commonly used types
pub use builder::{BuildError, StateBuilder};
pub use crate::core::{
    Composite, Condition, GraphItem, LeafState, StateMachine, TransitionCause, TransitionHistory,
    TransitionRecord,
};
pub use graph::{Graph, GraphError, GraphOptions};
