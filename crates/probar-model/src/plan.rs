//! Test plans compiled from raw paths.
//!
//! A [`TestPlan`] bundles every path reaching one target state. Each
//! [`TestPath`] is a walk of [`TestStep`]s; each step can assert the state it
//! starts in and execute the event that leaves it.

use crate::config::Description;
use crate::event::Event;
use crate::executor::{self, TestPathResult};
use crate::graph::{RawPath, StatePaths};
use crate::machine::StateMachine;
use crate::model::ModelCore;
use crate::result::ModelResult;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A single executable step.
pub struct TestStep<M: StateMachine, C: Send> {
    /// State before the event
    pub state: M::State,
    /// Event leaving the state
    pub event: Event,
    /// Description of `state`
    pub description: String,
    core: Arc<ModelCore<M, C>>,
}

impl<M: StateMachine, C: Send + 'static> TestStep<M, C> {
    /// Assert the state this step starts in.
    pub async fn test(&self, ctx: &mut C) -> ModelResult<()> {
        self.core.test_state(&self.state, ctx).await
    }

    /// Execute this step's event against the system under test.
    pub async fn exec(&self, ctx: &mut C) -> ModelResult<()> {
        self.core.execute_event(&self.event, ctx).await
    }
}

/// An executable walk to a plan's target state.
pub struct TestPath<M: StateMachine, C: Send> {
    /// Terminal state
    pub state: M::State,
    /// Steps in order
    pub steps: Vec<TestStep<M, C>>,
    /// Step count
    pub weight: usize,
    /// `via E1 → E2 → …`
    pub description: String,
    core: Arc<ModelCore<M, C>>,
}

impl<M: StateMachine, C: Send + 'static> TestPath<M, C> {
    /// Run every step, then assert the terminal state.
    ///
    /// # Errors
    /// Returns [`crate::ModelError::PathFailed`] carrying the cause and the
    /// trace recorded up to the failure.
    pub async fn test(&self, ctx: &mut C) -> ModelResult<TestPathResult> {
        executor::run_path(self, ctx).await
    }

    pub(crate) fn core(&self) -> &ModelCore<M, C> {
        &self.core
    }
}

/// All paths reaching one target state.
pub struct TestPlan<M: StateMachine, C: Send> {
    /// Serialized target state
    pub key: String,
    /// Target state
    pub state: M::State,
    /// Paths reaching it
    pub paths: Vec<TestPath<M, C>>,
    /// `reaches …`
    pub description: String,
}

impl<M: StateMachine, C: Send + 'static> TestPlan<M, C> {
    /// Run every path in order, stopping at the first failure.
    ///
    /// # Errors
    /// Returns the first path failure.
    pub async fn test(&self, ctx: &mut C) -> ModelResult<Vec<TestPathResult>> {
        let mut results = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            results.push(path.test(ctx).await?);
        }
        Ok(results)
    }

    /// Weight of the first (for shortest plans, the only) path.
    #[must_use]
    pub fn weight(&self) -> usize {
        self.paths.first().map_or(0, |path| path.weight)
    }
}

impl<M: StateMachine, C: Send> Clone for TestStep<M, C> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            event: self.event.clone(),
            description: self.description.clone(),
            core: Arc::clone(&self.core),
        }
    }
}

impl<M: StateMachine, C: Send> Clone for TestPath<M, C> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            steps: self.steps.clone(),
            weight: self.weight,
            description: self.description.clone(),
            core: Arc::clone(&self.core),
        }
    }
}

impl<M: StateMachine, C: Send> Clone for TestPlan<M, C> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            state: self.state.clone(),
            paths: self.paths.clone(),
            description: self.description.clone(),
        }
    }
}

impl<M: StateMachine, C: Send> fmt::Debug for TestStep<M, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestStep")
            .field("state", &self.state)
            .field("event", &self.event)
            .field("description", &self.description)
            .finish()
    }
}

impl<M: StateMachine, C: Send> fmt::Debug for TestPath<M, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestPath")
            .field("state", &self.state)
            .field("steps", &self.steps)
            .field("weight", &self.weight)
            .field("description", &self.description)
            .finish()
    }
}

impl<M: StateMachine, C: Send> fmt::Debug for TestPlan<M, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestPlan")
            .field("key", &self.key)
            .field("state", &self.state)
            .field("paths", &self.paths)
            .field("description", &self.description)
            .finish()
    }
}

/// Compile raw paths into plans, one per target state, preserving order.
pub(crate) fn compile<M, C>(core: &Arc<ModelCore<M, C>>, state_paths: Vec<StatePaths<M::State>>) -> Vec<TestPlan<M, C>>
where
    M: StateMachine,
    C: Send + 'static,
{
    let plans: Vec<_> = state_paths
        .into_iter()
        .map(|entry| {
            let paths = entry
                .paths
                .into_iter()
                .map(|path| compile_path(core, path))
                .collect();
            TestPlan {
                description: format!("reaches {}", describe_state(core, &entry.state)),
                key: entry.key,
                state: entry.state,
                paths,
            }
        })
        .collect();
    debug!(plans = plans.len(), "compiled test plans");
    plans
}

fn compile_path<M, C>(core: &Arc<ModelCore<M, C>>, path: RawPath<M::State>) -> TestPath<M, C>
where
    M: StateMachine,
    C: Send + 'static,
{
    let events = path
        .steps
        .iter()
        .map(|step| step.event.describe())
        .collect::<Vec<_>>()
        .join(" → ");
    let steps = path
        .steps
        .into_iter()
        .map(|step| TestStep {
            description: describe_state(core, &step.state),
            state: step.state,
            event: step.event,
            core: Arc::clone(core),
        })
        .collect();

    TestPath {
        state: path.state,
        steps,
        weight: path.weight,
        description: format!("via {events}"),
        core: Arc::clone(core),
    }
}

/// Describe a state from its active leaf nodes and their test metadata.
///
/// Nodes without metadata render as `"#<id>"`; metadata supplies a literal or
/// computed description, falling back to the state value. Context, if any,
/// follows in parentheses.
pub(crate) fn describe_state<M, C>(core: &ModelCore<M, C>, state: &M::State) -> String
where
    M: StateMachine,
    C: Send + 'static,
{
    let leaves: Vec<String> = core
        .machine
        .configuration(state)
        .into_iter()
        .filter(|node| node.kind.is_leaf())
        .map(|node| match core.options.states.get(&node.id) {
            None => format!("\"#{}\"", node.id),
            Some(meta) => match &meta.description {
                Some(Description::Text(text)) => format!("\"{text}\""),
                Some(Description::Computed(describe)) => describe(state),
                None => core.machine.state_value(state).to_string(),
            },
        })
        .collect();

    let label = if leaves.len() == 1 { "state" } else { "states" };
    let context = core
        .machine
        .state_context(state)
        .map(|context| format!("({context})"))
        .unwrap_or_default();

    format!("{label}: {} {context}", leaves.join(", "))
        .trim_end()
        .to_string()
}
