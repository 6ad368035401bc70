//! Lifecycle scenarios for leaf and composite states.

use hybrid_graph::{
    BuildError, Composite, Graph, GraphError, GraphOptions, LeafState, StateBuilder, StateMachine,
    TransitionCause,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Board {
    counts: HashMap<&'static str, u32>,
    order: Vec<String>,
    foo_to_bar: bool,
    bar_to_baz: bool,
    baz_to_foo: bool,
    leave_group: bool,
    scopes: Vec<CancellationToken>,
}

impl Board {
    fn count(&self, key: &str) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    fn hit(&mut self, key: &'static str) {
        *self.counts.entry(key).or_default() += 1;
        self.order.push(key.to_string());
    }
}

fn shared() -> Rc<RefCell<Board>> {
    Rc::new(RefCell::new(Board::default()))
}

macro_rules! counting_leaf {
    ($name:ident, $enter:literal, $execute:literal, $exit:literal, $init:literal, $destroy:literal) => {
        #[derive(Default)]
        struct $name;

        impl LeafState for $name {
            type Blackboard = Board;

            fn on_initialize(&mut self, board: &mut Board) {
                board.hit($init);
            }

            fn on_enter(&mut self, board: &mut Board, scope: &CancellationToken) {
                board.hit($enter);
                board.scopes.push(scope.clone());
            }

            fn on_execute(&mut self, board: &mut Board, _scope: &CancellationToken) {
                board.hit($execute);
            }

            fn on_exit(&mut self, board: &mut Board) {
                board.hit($exit);
            }

            fn on_destroy(&mut self, board: &mut Board) {
                board.hit($destroy);
            }
        }
    };
}

counting_leaf!(Foo, "foo.enter", "foo.execute", "foo.exit", "foo.init", "foo.destroy");
counting_leaf!(Bar, "bar.enter", "bar.execute", "bar.exit", "bar.init", "bar.destroy");
counting_leaf!(Baz, "baz.enter", "baz.execute", "baz.exit", "baz.init", "baz.destroy");
counting_leaf!(Qux, "qux.enter", "qux.execute", "qux.exit", "qux.init", "qux.destroy");

// Foo -> Bar on trigger 0
#[derive(Default)]
struct TriggerMachine;

impl StateMachine for TriggerMachine {
    type Blackboard = Board;

    fn setup(&mut self, builder: &mut StateBuilder<'_, Board>) -> Result<(), BuildError> {
        builder
            .add_transition::<Foo, Bar>(0)?
            .set_initial_state::<Foo>()?;
        Ok(())
    }
}

// Foo -> Bar when foo_to_bar holds
#[derive(Default)]
struct ConditionMachine;

impl StateMachine for ConditionMachine {
    type Blackboard = Board;

    fn setup(&mut self, builder: &mut StateBuilder<'_, Board>) -> Result<(), BuildError> {
        builder
            .add_transition_when::<Foo, Bar>(|b| b.foo_to_bar)?
            .set_initial_state::<Foo>()?;
        Ok(())
    }
}

// Root composite with its own hooks, nesting Foo -> Bar on trigger 0
#[derive(Default)]
struct Group;

impl StateMachine for Group {
    type Blackboard = Board;

    fn setup(&mut self, builder: &mut StateBuilder<'_, Board>) -> Result<(), BuildError> {
        builder
            .add_transition::<Foo, Bar>(0)?
            .set_initial_state::<Foo>()?;
        Ok(())
    }

    fn on_initialize(&mut self, board: &mut Board) {
        board.hit("group.init");
    }

    fn on_enter(&mut self, board: &mut Board) {
        board.hit("group.enter");
    }

    fn on_exit(&mut self, board: &mut Board) {
        board.hit("group.exit");
    }

    fn on_destroy(&mut self, board: &mut Board) {
        board.hit("group.destroy");
    }
}

// Outer: Group(Foo, Bar) -> Baz on trigger 1 or when leave_group; Baz -> Group on 2
#[derive(Default)]
struct Outer;

impl StateMachine for Outer {
    type Blackboard = Board;

    fn setup(&mut self, builder: &mut StateBuilder<'_, Board>) -> Result<(), BuildError> {
        builder
            .add_transition::<Composite<Group>, Baz>(1)?
            .add_transition_when::<Composite<Group>, Baz>(|b| b.leave_group)?
            .add_transition::<Baz, Composite<Group>>(2)?
            .set_initial_state::<Composite<Group>>()?;
        Ok(())
    }

    fn on_enter(&mut self, board: &mut Board) {
        board.hit("outer.enter");
    }

    fn on_exit(&mut self, board: &mut Board) {
        board.hit("outer.exit");
    }

    fn on_destroy(&mut self, board: &mut Board) {
        board.hit("outer.destroy");
    }
}

// Foo -> Bar -> Baz -> Foo, each guarded by a condition
#[derive(Default)]
struct ChainMachine;

impl StateMachine for ChainMachine {
    type Blackboard = Board;

    fn setup(&mut self, builder: &mut StateBuilder<'_, Board>) -> Result<(), BuildError> {
        builder
            .add_transition_when::<Foo, Bar>(|b| b.foo_to_bar)?
            .add_transition_when::<Bar, Baz>(|b| b.bar_to_baz)?
            .add_transition_when::<Baz, Foo>(|b| b.baz_to_foo)?
            .add_transition::<Foo, Qux>(9)?
            .set_initial_state::<Foo>()?;
        Ok(())
    }
}

#[test]
fn create_invokes_no_lifecycle_hooks() {
    let board = shared();
    let graph = Graph::create::<Group, _>(Rc::clone(&board)).unwrap();

    let board = board.borrow();
    assert_eq!(board.count("foo.enter"), 0);
    assert_eq!(board.count("group.enter"), 0);
    assert_eq!(board.count("foo.execute"), 0);
    assert_eq!(graph.current_state_name(), "Foo");
    assert!(!graph.is_started());
    assert!(graph.current_scope().is_none());
}

#[test]
fn create_initializes_every_state_once() {
    let board = shared();
    let _graph = Graph::create::<Outer, _>(Rc::clone(&board)).unwrap();

    let board = board.borrow();
    assert_eq!(board.count("group.init"), 1);
    assert_eq!(board.count("foo.init"), 1);
    assert_eq!(board.count("bar.init"), 1);
    assert_eq!(board.count("baz.init"), 1);
    // composite initialization runs after its children were set up
    let group = board.order.iter().position(|k| k == "group.init").unwrap();
    let bar = board.order.iter().position(|k| k == "bar.init").unwrap();
    assert!(bar < group);
}

#[test]
fn first_execute_enters_initial_leaf_without_executing() {
    let board = shared();
    let mut graph = Graph::create::<TriggerMachine, _>(Rc::clone(&board)).unwrap();

    graph.execute().unwrap();
    assert_eq!(board.borrow().count("foo.enter"), 1);
    assert_eq!(board.borrow().count("foo.execute"), 0);
    assert_eq!(board.borrow().count("bar.enter"), 0);

    graph.execute().unwrap();
    assert_eq!(board.borrow().count("foo.enter"), 1);
    assert_eq!(board.borrow().count("foo.execute"), 1);
}

#[test]
fn trigger_transition_fires_on_next_execute() {
    let board = shared();
    let mut graph = Graph::create::<TriggerMachine, _>(Rc::clone(&board)).unwrap();
    graph.execute().unwrap();

    assert!(graph.send_trigger(0).unwrap());
    // latching alone runs no hooks
    assert_eq!(board.borrow().count("foo.exit"), 0);
    assert_eq!(board.borrow().count("bar.enter"), 0);

    graph.execute().unwrap();
    let b = board.borrow();
    assert_eq!(b.count("foo.enter"), 1);
    assert_eq!(b.count("foo.exit"), 1);
    assert_eq!(b.count("bar.enter"), 1);
    assert_eq!(b.count("foo.execute"), 0);
    assert_eq!(graph.current_state_name(), "Bar");
}

#[test]
fn trigger_is_only_matched_against_current_leaf() {
    let board = shared();
    let mut graph = Graph::create::<TriggerMachine, _>(Rc::clone(&board)).unwrap();
    graph.execute().unwrap();
    graph.send_trigger(0).unwrap();
    graph.execute().unwrap();

    // Bar has no outgoing edge for 0
    assert!(!graph.send_trigger(0).unwrap());
    graph.execute().unwrap();
    assert_eq!(graph.current_state_name(), "Bar");
    assert_eq!(board.borrow().count("bar.execute"), 1);
}

#[test]
fn condition_transition_waits_until_condition_holds() {
    let board = shared();
    let mut graph = Graph::create::<ConditionMachine, _>(Rc::clone(&board)).unwrap();
    graph.execute().unwrap();
    graph.execute().unwrap();
    graph.execute().unwrap();

    assert_eq!(board.borrow().count("foo.execute"), 2);
    assert_eq!(board.borrow().count("bar.enter"), 0);

    board.borrow_mut().foo_to_bar = true;
    // nothing happens until the next tick
    assert_eq!(board.borrow().count("foo.exit"), 0);

    graph.execute().unwrap();
    let b = board.borrow();
    assert_eq!(b.count("foo.execute"), 2);
    assert_eq!(b.count("foo.exit"), 1);
    assert_eq!(b.count("bar.enter"), 1);
    assert_eq!(b.count("bar.execute"), 0);
    assert_eq!(b.count("bar.exit"), 0);
}

#[test]
fn condition_true_at_start_skips_initial_leaf() {
    let board = shared();
    let mut graph = Graph::create::<ConditionMachine, _>(Rc::clone(&board)).unwrap();
    board.borrow_mut().foo_to_bar = true;

    graph.execute().unwrap();
    let b = board.borrow();
    assert_eq!(b.count("foo.enter"), 0);
    assert_eq!(b.count("foo.execute"), 0);
    assert_eq!(b.count("foo.exit"), 0);
    assert_eq!(b.count("bar.enter"), 1);
    assert_eq!(b.count("bar.execute"), 0);
    assert_eq!(graph.current_state_name(), "Bar");
}

#[test]
fn composite_enters_before_its_initial_leaf() {
    let board = shared();
    let mut graph = Graph::create::<Group, _>(Rc::clone(&board)).unwrap();
    graph.execute().unwrap();

    let b = board.borrow();
    assert_eq!(b.count("group.enter"), 1);
    assert_eq!(b.count("foo.enter"), 1);
    let enters: Vec<_> = b
        .order
        .iter()
        .filter(|k| k.ends_with(".enter"))
        .cloned()
        .collect();
    assert_eq!(enters, vec!["group.enter", "foo.enter"]);
}

#[test]
fn sibling_transition_does_not_reenter_composite() {
    let board = shared();
    let mut graph = Graph::create::<Group, _>(Rc::clone(&board)).unwrap();
    graph.execute().unwrap();
    graph.send_trigger(0).unwrap();
    graph.execute().unwrap();

    let b = board.borrow();
    assert_eq!(b.count("group.enter"), 1);
    assert_eq!(b.count("group.exit"), 0);
    assert_eq!(b.count("foo.exit"), 1);
    assert_eq!(b.count("bar.enter"), 1);
}

#[test]
fn leaving_subtree_exits_composite_once() {
    let board = shared();
    let mut graph = Graph::create::<Outer, _>(Rc::clone(&board)).unwrap();
    graph.execute().unwrap();
    graph.send_trigger(0).unwrap();
    graph.execute().unwrap();
    assert!(graph.is_in::<Bar>());
    assert!(graph.is_in::<Composite<Group>>());

    // edge registered against the composite fans out to Bar as well
    assert!(graph.send_trigger(1).unwrap());
    graph.execute().unwrap();

    let b = board.borrow();
    assert_eq!(b.count("group.exit"), 1);
    assert_eq!(b.count("outer.exit"), 0);
    assert_eq!(b.count("outer.enter"), 1);
    assert_eq!(b.count("baz.enter"), 1);
    assert!(graph.is_in::<Baz>());
    assert!(!graph.is_in::<Composite<Group>>());
    assert!(graph.is_in::<Composite<Outer>>());

    let tail: Vec<_> = b.order.iter().rev().take(3).rev().cloned().collect();
    assert_eq!(tail, vec!["bar.exit", "group.exit", "baz.enter"]);
}

#[test]
fn reentering_composite_lands_on_its_initial_leaf() {
    let board = shared();
    let mut graph = Graph::create::<Outer, _>(Rc::clone(&board)).unwrap();
    graph.execute().unwrap();
    graph.send_trigger(0).unwrap();
    graph.execute().unwrap();
    graph.send_trigger(1).unwrap();
    graph.execute().unwrap();
    graph.send_trigger(2).unwrap();
    graph.execute().unwrap();

    let b = board.borrow();
    assert_eq!(graph.current_state_name(), "Foo");
    assert_eq!(b.count("group.enter"), 2);
    assert_eq!(b.count("group.exit"), 1);
    assert_eq!(b.count("foo.enter"), 2);
    assert_eq!(b.count("baz.exit"), 1);
}

#[test]
fn condition_registered_on_composite_applies_to_every_child() {
    let board = shared();
    let mut graph = Graph::create::<Outer, _>(Rc::clone(&board)).unwrap();
    graph.execute().unwrap();
    graph.send_trigger(0).unwrap();
    graph.execute().unwrap();

    board.borrow_mut().leave_group = true;
    graph.execute().unwrap();

    assert_eq!(graph.current_state_name(), "Baz");
    assert_eq!(
        graph.history().last().map(|r| r.cause),
        Some(TransitionCause::Condition)
    );
}

#[test]
fn skipped_initial_leaf_leaves_its_composite_untouched() {
    let board = shared();
    let mut graph = Graph::create::<Outer, _>(Rc::clone(&board)).unwrap();
    board.borrow_mut().leave_group = true;

    graph.execute().unwrap();
    {
        let b = board.borrow();
        assert_eq!(graph.current_state_name(), "Baz");
        assert_eq!(b.count("foo.enter"), 0);
        assert_eq!(b.count("foo.exit"), 0);
        assert_eq!(b.count("group.enter"), 0);
        assert_eq!(b.count("group.exit"), 0);
        assert_eq!(b.count("outer.enter"), 1);
        assert_eq!(b.count("baz.enter"), 1);
    }

    board.borrow_mut().leave_group = false;
    graph.send_trigger(2).unwrap();
    graph.execute().unwrap();

    let b = board.borrow();
    assert_eq!(graph.current_state_name(), "Foo");
    assert_eq!(b.count("group.enter"), 1);
    assert_eq!(b.count("group.exit"), 0);
    assert_eq!(b.count("foo.enter"), 1);
}

#[test]
fn zero_history_capacity_records_nothing() {
    let board = shared();
    let options = GraphOptions::new().history_capacity(0);
    let mut graph =
        Graph::create_with_options::<TriggerMachine, _>(Rc::clone(&board), options).unwrap();
    graph.execute().unwrap();
    graph.send_trigger(0).unwrap();
    graph.execute().unwrap();

    assert_eq!(graph.current_state_name(), "Bar");
    assert!(graph.history().is_empty());
}

#[test]
fn last_trigger_before_execute_wins() {
    let board = shared();
    let mut graph = Graph::create::<ChainMachine, _>(Rc::clone(&board)).unwrap();
    graph.execute().unwrap();

    // Foo reacts to 9 only; a failed send leaves the latch untouched
    assert!(graph.send_trigger(9).unwrap());
    assert!(!graph.send_trigger(3).unwrap());
    assert!(graph.has_pending_transition());
    graph.execute().unwrap();
    assert_eq!(graph.current_state_name(), "Qux");
}

#[test]
fn second_trigger_replaces_first() {
    let board = shared();
    let mut graph = Graph::create::<Outer, _>(Rc::clone(&board)).unwrap();
    graph.execute().unwrap();

    // Foo knows 0 (to Bar) and, through Group, 1 (to Baz)
    assert!(graph.send_trigger(0).unwrap());
    assert!(graph.send_trigger(1).unwrap());
    graph.execute().unwrap();

    let b = board.borrow();
    assert_eq!(graph.current_state_name(), "Baz");
    assert_eq!(b.count("bar.enter"), 0);
    assert_eq!(graph.history().len(), 1);
}

#[test]
fn chained_conditions_resolve_in_one_tick() {
    let board = shared();
    let mut graph = Graph::create::<ChainMachine, _>(Rc::clone(&board)).unwrap();
    graph.execute().unwrap();

    {
        let mut b = board.borrow_mut();
        b.foo_to_bar = true;
        b.bar_to_baz = true;
    }
    graph.execute().unwrap();

    let b = board.borrow();
    assert_eq!(graph.current_state_name(), "Baz");
    // intermediate leaf is entered and exited within the same tick
    assert_eq!(b.count("bar.enter"), 1);
    assert_eq!(b.count("bar.exit"), 1);
    assert_eq!(b.count("bar.execute"), 0);
    assert_eq!(b.count("baz.enter"), 1);
    assert_eq!(graph.history().path(), vec!["Foo", "Bar", "Baz"]);
}

#[test]
fn cyclic_conditions_hit_the_chain_limit() {
    let board = shared();
    let options = GraphOptions::new().max_transition_chain(5);
    let mut graph =
        Graph::create_with_options::<ChainMachine, _>(Rc::clone(&board), options).unwrap();
    graph.execute().unwrap();

    {
        let mut b = board.borrow_mut();
        b.foo_to_bar = true;
        b.bar_to_baz = true;
        b.baz_to_foo = true;
    }
    let result = graph.execute();
    assert!(matches!(
        result,
        Err(GraphError::TransitionChainExceeded { limit: 5, .. })
    ));
    assert_eq!(graph.history().len(), 5);

    // the graph stays consistent and keeps draining once the cycle is broken
    board.borrow_mut().baz_to_foo = false;
    graph.execute().unwrap();
    assert_eq!(graph.current_state_name(), "Baz");
    assert!(!graph.has_pending_transition());

    let b = board.borrow();
    let entered: u32 = ["foo", "bar", "baz"]
        .iter()
        .map(|s| b.count(&format!("{s}.enter")))
        .sum();
    let exited: u32 = ["foo", "bar", "baz"]
        .iter()
        .map(|s| b.count(&format!("{s}.exit")))
        .sum();
    assert_eq!(entered, exited + 1);
}

#[test]
fn activation_scope_is_cancelled_before_exit() {
    let board = shared();
    let mut graph = Graph::create::<TriggerMachine, _>(Rc::clone(&board)).unwrap();
    graph.execute().unwrap();

    let foo_scope = board.borrow().scopes[0].clone();
    assert!(!foo_scope.is_cancelled());
    assert!(graph.current_scope().is_some());

    graph.send_trigger(0).unwrap();
    graph.execute().unwrap();

    let b = board.borrow();
    assert!(foo_scope.is_cancelled());
    assert_eq!(b.scopes.len(), 2);
    assert!(!b.scopes[1].is_cancelled());
}

#[test]
fn dispose_destroys_children_before_composites() {
    let board = shared();
    let mut graph = Graph::create::<Outer, _>(Rc::clone(&board)).unwrap();
    graph.execute().unwrap();
    let scope = graph.current_scope().unwrap();

    graph.dispose().unwrap();
    assert!(graph.is_disposed());
    assert!(scope.is_cancelled());

    let b = board.borrow();
    let destroys: Vec<_> = b
        .order
        .iter()
        .filter(|k| k.ends_with(".destroy"))
        .cloned()
        .collect();
    assert_eq!(
        destroys,
        vec![
            "foo.destroy",
            "bar.destroy",
            "group.destroy",
            "baz.destroy",
            "outer.destroy"
        ]
    );
    // disposal does not run exit hooks
    assert_eq!(b.count("foo.exit"), 0);
    assert_eq!(b.count("group.exit"), 0);
}

#[test]
fn operations_after_dispose_fail() {
    let board = shared();
    let mut graph = Graph::create::<TriggerMachine, _>(Rc::clone(&board)).unwrap();
    graph.execute().unwrap();
    graph.dispose().unwrap();

    assert_eq!(graph.execute(), Err(GraphError::UseAfterDispose));
    assert_eq!(graph.send_trigger(0), Err(GraphError::UseAfterDispose));
    assert_eq!(graph.dispose(), Err(GraphError::UseAfterDispose));
}

#[test]
fn dropping_graph_cancels_active_scope() {
    let board = shared();
    let mut graph = Graph::create::<TriggerMachine, _>(Rc::clone(&board)).unwrap();
    graph.execute().unwrap();
    let scope = graph.current_scope().unwrap();

    drop(graph);
    assert!(scope.is_cancelled());
    assert_eq!(board.borrow().count("foo.destroy"), 0);
}

#[test]
fn blackboard_type_mismatch_fails_creation() {
    let wrong = Rc::new(RefCell::new(String::from("not a board")));
    let result = Graph::create::<TriggerMachine, _>(wrong);

    assert!(matches!(
        result,
        Err(GraphError::Build(BuildError::BlackboardMismatch {
            state: "TriggerMachine",
            ..
        }))
    ));
}

#[derive(Default)]
struct Broken;

impl StateMachine for Broken {
    type Blackboard = Board;

    fn setup(&mut self, builder: &mut StateBuilder<'_, Board>) -> Result<(), BuildError> {
        builder.add_transition::<Foo, Bar>(0)?;
        Ok(())
    }
}

#[test]
fn configuration_errors_surface_from_create() {
    let board = shared();
    let result = Graph::create::<Broken, _>(Rc::clone(&board));

    assert_eq!(
        result.err(),
        Some(GraphError::Build(BuildError::MissingInitialState {
            machine: "Broken"
        }))
    );
}

#[derive(Default)]
struct FirstWins;

impl StateMachine for FirstWins {
    type Blackboard = Board;

    fn setup(&mut self, builder: &mut StateBuilder<'_, Board>) -> Result<(), BuildError> {
        builder
            .add_transition_when::<Foo, Baz>(|b| b.foo_to_bar)?
            .add_transition_when::<Foo, Bar>(|b| b.foo_to_bar)?
            .set_initial_state::<Foo>()?;
        Ok(())
    }
}

#[test]
fn first_registered_condition_wins_ties() {
    let board = shared();
    let mut graph = Graph::create::<FirstWins, _>(Rc::clone(&board)).unwrap();
    graph.execute().unwrap();

    board.borrow_mut().foo_to_bar = true;
    graph.execute().unwrap();

    assert_eq!(graph.current_state_name(), "Baz");
    assert_eq!(board.borrow().count("bar.enter"), 0);
}

#[tokio::test]
async fn activation_scope_wakes_async_observers() {
    let board = shared();
    let mut graph = Graph::create::<TriggerMachine, _>(Rc::clone(&board)).unwrap();
    graph.execute().unwrap();

    let scope = graph.current_scope().unwrap();
    let watcher = tokio::spawn(async move {
        scope.cancelled().await;
        "released"
    });

    graph.send_trigger(0).unwrap();
    graph.execute().unwrap();

    assert_eq!(watcher.await.unwrap(), "released");
}
