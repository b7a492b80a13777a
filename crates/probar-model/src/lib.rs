//! Probar Model: Model-Based Test Generation
//!
//! Describe the system under test as a state machine, attach assertions to
//! its state nodes and executors to its events, and let the model generate
//! the tests: one shortest path to every reachable state, every simple path,
//! the cheapest route to a target, or a literal event sequence.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    PROBAR MODEL Architecture                     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Event      │    │ Path       │    │ Plan       │            │
//! │   │ Sampler    │───►│ Search     │───►│ Compiler   │            │
//! │   └────────────┘    └────────────┘    └─────┬──────┘            │
//! │                                             ▼                   │
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Coverage   │◄───│ State      │◄───│ Path       │──► SUT     │
//! │   │ Tracker    │    │ Assertions │    │ Executor   │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use futures::FutureExt;
//! use probar_model::{EventTestConfig, Machine, ModelOptions, StateTestConfig, TestModel};
//!
//! let machine = Machine::from_yaml(TOGGLE_YAML)?;
//! let events = EventTestConfig::new().exec("TOGGLE", |page: &mut Page, _e| {
//!     async move { page.click("#toggle").await }.boxed()
//! });
//! let states = StateTestConfig::new().test("toggle.active", |page: &mut Page, _s| {
//!     async move { page.expect_text("#status", "ON").await }.boxed()
//! });
//! let model = TestModel::with_options(
//!     machine,
//!     ModelOptions::new().with_events(events).with_states(states),
//! );
//!
//! for plan in model.shortest_path_plans() {
//!     plan.test(&mut page).await?;
//! }
//! model.test_coverage(&Default::default())?;
//! ```

#![warn(missing_docs)]

mod config;
mod coverage;
mod event;
mod executor;
mod model;
mod result;
mod sampler;
mod target;

/// Path search over a machine's state graph
pub mod graph;

/// State machine seam and the declarative flat machine
pub mod machine;

/// Compiled test plans
#[allow(clippy::missing_errors_doc)]
pub mod plan;

/// Failure trace rendering
pub mod trace;

pub use config::{
    assert_fn, exec_fn, CoverageOptions, Description, EventExecutor, EventTestConfig,
    EventTestEntry, ModelOptions, StateAssertion, StatePredicate, StateTestConfig, StateTestMeta,
    TraversalOptions,
};
pub use coverage::{Coverage, CoverageTracker};
pub use event::Event;
pub use executor::{
    resolve_executor, StepOutcome, StepRecord, TerminalOutcome, TestPathResult, TestStepResult,
};
pub use graph::{path_from_events, shortest_paths, simple_paths, RawPath, StatePaths, Step};
pub use machine::{Machine, MachineDefinition, NodeKind, StateDefinition, StateMachine, StateNode};
pub use model::TestModel;
pub use plan::{TestPath, TestPlan, TestStep};
pub use result::{ModelError, ModelResult, PathFailure};
pub use sampler::sample_events;
pub use target::Target;

/// Future type returned by executor and assertion closures
pub use futures::future::BoxFuture;
