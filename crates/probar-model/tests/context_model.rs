//! A hand-written machine carrying extended state, exercised through the
//! `StateMachine` trait rather than a YAML definition.

use futures::FutureExt;
use probar_model::{
    BoxFuture, CoverageOptions, Event, EventTestConfig, ModelError, ModelOptions, ModelResult,
    NodeKind, StateMachine, StateNode, StateTestConfig, TestModel, TraversalOptions,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Counts up to `max` in steps given by the `by` payload (default 1).
#[derive(Debug)]
struct CounterMachine {
    max: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Count(u64);

impl CounterMachine {
    fn leaf(&self, state: &Count) -> &'static str {
        if state.0 < self.max {
            "counting"
        } else {
            "full"
        }
    }
}

impl StateMachine for CounterMachine {
    type State = Count;

    fn initial_state(&self) -> Count {
        Count(0)
    }

    fn transition(&self, state: &Count, event: &Event) -> Option<Count> {
        match event.event_type.as_str() {
            "INC" => {
                let by = event.get("by").and_then(Value::as_u64).unwrap_or(1);
                let next = state.0 + by;
                (next <= self.max).then_some(Count(next))
            }
            "RESET" => Some(Count(0)),
            _ => None,
        }
    }

    fn next_events(&self, state: &Count) -> Vec<String> {
        if state.0 < self.max {
            vec!["INC".to_string()]
        } else {
            vec!["RESET".to_string()]
        }
    }

    fn state_nodes(&self) -> Vec<StateNode> {
        vec![
            StateNode::new("counter.counting", NodeKind::Atomic),
            StateNode::new("counter.full", NodeKind::Atomic),
        ]
    }

    fn configuration(&self, state: &Count) -> Vec<StateNode> {
        vec![
            StateNode::new("counter", NodeKind::Compound),
            StateNode::new(format!("counter.{}", self.leaf(state)), NodeKind::Atomic),
        ]
    }

    fn state_value(&self, state: &Count) -> Value {
        json!(self.leaf(state))
    }

    fn state_context(&self, state: &Count) -> Option<Value> {
        Some(json!({ "count": state.0 }))
    }
}

/// The screen under test; `lag` makes it drop increments.
#[derive(Debug, Default)]
struct Screen {
    shown: u64,
    lag: bool,
}

fn by(step: u64) -> BTreeMap<String, Value> {
    BTreeMap::from([("by".to_string(), json!(step))])
}

fn check<'a>(screen: &'a mut Screen, state: &'a Count) -> BoxFuture<'a, ModelResult<()>> {
    let expected = state.0;
    let shown = screen.shown;
    async move {
        if shown == expected {
            Ok(())
        } else {
            Err(ModelError::assertion(format!("expected {expected}, screen shows {shown}")))
        }
    }
    .boxed()
}

fn states() -> StateTestConfig<Screen, Count> {
    StateTestConfig::new()
        .test("counter.counting", check)
        .test("counter.full", check)
}

fn events() -> EventTestConfig<Screen> {
    EventTestConfig::new()
        .exec_cases("INC", vec![by(1), by(2)], |screen: &mut Screen, e: &Event| {
            let step = e.get("by").and_then(Value::as_u64).unwrap_or(1);
            async move {
                if !screen.lag {
                    screen.shown += step;
                }
                Ok(())
            }
            .boxed()
        })
        .exec("RESET", |screen: &mut Screen, _e: &Event| {
            async move {
                screen.shown = 0;
                Ok(())
            }
            .boxed()
        })
}

fn model(max: u64) -> TestModel<CounterMachine, Screen> {
    TestModel::with_options(
        CounterMachine { max },
        ModelOptions::new().with_events(events()).with_states(states()),
    )
}

#[test]
fn states_are_keyed_by_value_and_context() {
    let plans = model(3).shortest_path_plans();
    let keys: Vec<_> = plans.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "\"counting\" | {\"count\":0}",
            "\"counting\" | {\"count\":1}",
            "\"counting\" | {\"count\":2}",
            "\"full\" | {\"count\":3}",
        ]
    );
    let weights: Vec<_> = plans.iter().map(|p| p.weight()).collect();
    assert_eq!(weights, vec![0, 1, 1, 2]);
}

#[test]
fn descriptions_include_context_and_payload() {
    let plans = model(3).shortest_path_plans();
    assert_eq!(
        plans[2].description,
        "reaches state: \"counting\" ({\"count\":2})"
    );
    assert_eq!(plans[2].paths[0].description, "via INC ({\"by\":2})");
    assert_eq!(plans[2].paths[0].steps[0].event.get("by"), Some(&json!(2)));
}

#[test]
fn target_matches_partial_value() {
    let plans = model(3).shortest_path_plans_to("full");
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].state, Count(3));
}

#[test]
fn simple_paths_enumerate_payload_routes() {
    let plans = model(2).simple_path_plans_to("full");
    assert_eq!(plans.len(), 1);
    let mut weights: Vec<_> = plans[0].paths.iter().map(|p| p.weight).collect();
    weights.sort_unstable();
    assert_eq!(weights, vec![1, 2]);
}

#[test]
fn traversal_filter_leaves_rejected_states_out() {
    let options = TraversalOptions::new().with_filter(|state: &Count| state.0 < 2);
    let plans = model(3).shortest_path_plans_with(&options);
    let counts: Vec<_> = plans.iter().map(|p| p.state.0).collect();
    assert_eq!(counts, vec![0, 1], "rejected states get no plan");
    assert_eq!(model(3).shortest_path_plans().len(), 4, "unfiltered reaches all four");
}

#[test]
fn replayed_plans_share_generated_keys() {
    let model = model(3);
    let plan = model
        .plan_from_events(&[Event::from_payload("INC", by(2))], "counting")
        .expect("count 2 is still counting");
    assert_eq!(plan.key, "\"counting\" | {\"count\":2}");
    assert!(model.shortest_path_plans().iter().any(|p| p.key == plan.key));
}

#[test]
fn replaying_an_unhandled_event_is_rejected() {
    let err = model(1)
        .plan_from_events(&[Event::new("INC"), Event::new("INC")], "full")
        .expect_err("INC overflows");
    assert!(matches!(err, ModelError::InvalidEvent { .. }));
}

#[tokio::test]
async fn a_correct_screen_passes_every_plan() {
    let model = model(3);
    for plan in model.simple_path_plans() {
        for path in &plan.paths {
            let mut screen = Screen::default();
            path.test(&mut screen).await.expect("screen keeps up");
        }
    }
    let coverage = model.coverage(&CoverageOptions::default());
    assert!(coverage.is_complete());
    assert!((coverage.covered_fraction() - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn a_plan_runs_its_paths_in_sequence_on_one_context() {
    let model = TestModel::with_options(
        CounterMachine { max: 2 },
        ModelOptions::new().with_events(events()),
    );
    let plan = model.simple_path_plans_to("full").pop().expect("full reachable");
    assert_eq!(plan.paths.len(), 2);

    let mut screen = Screen::default();
    let results = plan.test(&mut screen).await.expect("no assertions to fail");
    assert_eq!(results.len(), plan.paths.len());
    assert!(results.iter().all(|r| r.passed()));
    assert_eq!(results[0].steps.len(), plan.paths[0].weight);
    assert_eq!(results[1].steps.len(), plan.paths[1].weight);
    assert_eq!(screen.shown, 4, "both paths incremented the same screen");
}

#[tokio::test]
async fn a_lagging_screen_fails_with_context_in_the_trace() {
    let model = model(3);
    let plan = model.shortest_path_plans_to("full").pop().expect("full reachable");
    let mut screen = Screen {
        lag: true,
        ..Screen::default()
    };

    let err = plan.test(&mut screen).await.expect_err("screen lags");
    let failure = err.path_failure().expect("path failure");
    let plain = failure.render_plain();
    assert!(plain.starts_with("Assertion failed: expected "));
    assert!(plain.contains("\tState: \"counting\" {\"count\":0}\n\tEvent: {\"type\":\"INC\",\"by\":"));
    assert_eq!(failure.result.steps.len(), 2);
    assert!(failure.result.steps[1].state.error.is_some());
    assert!(failure.result.state.error.is_none());
}

#[test]
fn coverage_filter_limits_the_report() {
    let model = model(3);
    let only_full = CoverageOptions::with_filter(|node: &StateNode| node.id.ends_with(".full"));
    let coverage = model.coverage(&only_full);
    assert_eq!(coverage.missing(), vec!["counter.full".to_string()]);
    assert!(model.test_coverage(&only_full).is_err());
}
