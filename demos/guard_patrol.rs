//! Guard Patrol
//!
//! This example drives a guard through a nested state graph.
//!
//! Key concepts:
//! - Composite states that enter and exit once around their children
//! - Condition transitions polled against the blackboard every tick
//! - Trigger transitions latched from outside the graph
//! - Activation scopes cancelled when a leaf exits
//!
//! Run with: RUST_LOG=hybrid_graph=trace cargo run --example guard_patrol

use hybrid_graph::{BuildError, Composite, Graph, LeafState, StateBuilder, StateMachine};
use std::cell::RefCell;
use std::rc::Rc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const NOISE_HEARD: i32 = 1;
const ALL_CLEAR: i32 = 2;

#[derive(Debug, Default)]
struct Guard {
    waypoint: usize,
    stamina: i32,
    intruder_distance: Option<i32>,
    alarms_raised: u32,
}

#[derive(Default)]
struct Walk;

impl LeafState for Walk {
    type Blackboard = Guard;

    fn on_execute(&mut self, guard: &mut Guard, _scope: &CancellationToken) {
        guard.waypoint = (guard.waypoint + 1) % 4;
        guard.stamina -= 10;
        println!("  walking to waypoint {}", guard.waypoint);
    }
}

#[derive(Default)]
struct Rest;

impl LeafState for Rest {
    type Blackboard = Guard;

    fn on_execute(&mut self, guard: &mut Guard, _scope: &CancellationToken) {
        guard.stamina += 25;
        println!("  resting (stamina {})", guard.stamina);
    }
}

#[derive(Default)]
struct Investigate;

impl LeafState for Investigate {
    type Blackboard = Guard;

    fn on_enter(&mut self, _guard: &mut Guard, scope: &CancellationToken) {
        println!("  heading toward the noise");
        let scope = scope.clone();
        tokio::spawn(async move {
            scope.cancelled().await;
            println!("  (investigation scope released)");
        });
    }

    fn on_execute(&mut self, guard: &mut Guard, _scope: &CancellationToken) {
        if let Some(distance) = guard.intruder_distance.as_mut() {
            *distance -= 5;
            println!("  closing in, intruder at {distance}m");
        }
    }
}

#[derive(Default)]
struct RaiseAlarm;

impl LeafState for RaiseAlarm {
    type Blackboard = Guard;

    fn on_enter(&mut self, guard: &mut Guard, _scope: &CancellationToken) {
        guard.alarms_raised += 1;
        println!("  ALARM!");
    }
}

#[derive(Default)]
struct Patrol;

impl StateMachine for Patrol {
    type Blackboard = Guard;

    fn setup(&mut self, builder: &mut StateBuilder<'_, Guard>) -> Result<(), BuildError> {
        builder
            .add_transition_when::<Walk, Rest>(|guard| guard.stamina <= 0)?
            .add_transition_when::<Rest, Walk>(|guard| guard.stamina >= 50)?
            .set_initial_state::<Walk>()?;
        Ok(())
    }

    fn on_enter(&mut self, _guard: &mut Guard) {
        println!("-> patrol started");
    }

    fn on_exit(&mut self, _guard: &mut Guard) {
        println!("<- patrol interrupted");
    }
}

#[derive(Default)]
struct Alert;

impl StateMachine for Alert {
    type Blackboard = Guard;

    fn setup(&mut self, builder: &mut StateBuilder<'_, Guard>) -> Result<(), BuildError> {
        builder
            .add_transition_when::<Investigate, RaiseAlarm>(|guard| {
                guard.intruder_distance.is_some_and(|d| d <= 10)
            })?
            .set_initial_state::<Investigate>()?;
        Ok(())
    }

    fn on_enter(&mut self, _guard: &mut Guard) {
        println!("-> alert");
    }

    fn on_exit(&mut self, guard: &mut Guard) {
        guard.intruder_distance = None;
        println!("<- alert over");
    }
}

#[derive(Default)]
struct Sentry;

impl StateMachine for Sentry {
    type Blackboard = Guard;

    fn setup(&mut self, builder: &mut StateBuilder<'_, Guard>) -> Result<(), BuildError> {
        builder
            .add_transition::<Composite<Patrol>, Composite<Alert>>(NOISE_HEARD)?
            .add_transition::<Composite<Alert>, Composite<Patrol>>(ALL_CLEAR)?
            .set_initial_state::<Composite<Patrol>>()?;
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Guard Patrol ===\n");

    let guard = Rc::new(RefCell::new(Guard {
        stamina: 30,
        ..Guard::default()
    }));
    let mut graph = Graph::create::<Sentry, _>(Rc::clone(&guard))?;

    for tick in 0..12 {
        match tick {
            6 => {
                guard.borrow_mut().intruder_distance = Some(20);
                graph.send_trigger(NOISE_HEARD)?;
            }
            10 => {
                graph.send_trigger(ALL_CLEAR)?;
            }
            _ => {}
        }

        println!("tick {tick}: {}", graph.current_state_name());
        graph.execute()?;
        tokio::task::yield_now().await;
    }

    println!("\nPath taken: {}", graph.history().path().join(" -> "));
    println!("Alarms raised: {}", guard.borrow().alarms_raised);

    graph.dispose()?;
    println!("\n=== Example Complete ===");
    Ok(())
}
