//! Sequential path execution, state assertion dispatch, and executor lookup.

use crate::config::{EventExecutor, EventTestConfig};
use crate::event::Event;
use crate::machine::StateMachine;
use crate::model::ModelCore;
use crate::plan::TestPath;
use crate::result::{ModelError, ModelResult, PathFailure};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Error status of one half of a step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Error message, if this half failed
    pub error: Option<String>,
}

/// The step a result refers to, in printable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// State value (and context) before the event
    pub state: String,
    /// Event fired
    pub event: Event,
}

/// Result of one step: its assertion and its executor tracked independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStepResult {
    /// Step
    pub step: StepRecord,
    /// Pre-step assertion outcome
    pub state: StepOutcome,
    /// Executor outcome
    pub event: StepOutcome,
}

/// Terminal-state assertion outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalOutcome {
    /// Terminal state value (and context)
    pub value: String,
    /// Error message, if the assertion failed
    pub error: Option<String>,
}

/// Result of running one path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPathResult {
    /// Step results in order
    pub steps: Vec<TestStepResult>,
    /// Terminal state outcome
    pub state: TerminalOutcome,
}

impl TestPathResult {
    /// Whether nothing recorded an error.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.state.error.is_none()
            && self
                .steps
                .iter()
                .all(|s| s.state.error.is_none() && s.event.error.is_none())
    }
}

/// Find the executor registered for `event`.
///
/// A missing entry logs a warning and yields `None`; so does an entry without
/// an executor. Neither is an error: the step simply does nothing.
pub fn resolve_executor<C: Send + 'static>(
    config: &EventTestConfig<C>,
    event: &Event,
) -> Option<Arc<dyn EventExecutor<C>>> {
    match config.get(&event.event_type) {
        Some(entry) => entry.executor().cloned(),
        None => {
            warn!(
                event_type = %event.event_type,
                "Missing config for event \"{}\".",
                event.event_type
            );
            None
        }
    }
}

impl<M: StateMachine, C: Send + 'static> ModelCore<M, C> {
    /// Run every active, non-skipped assertion attached to a node of `state`.
    pub(crate) async fn test_state(&self, state: &M::State, ctx: &mut C) -> ModelResult<()> {
        for node in self.machine.configuration(state) {
            let Some(meta) = self.options.states.get(&node.id) else {
                continue;
            };
            let Some(test) = meta.test.as_ref().filter(|_| !meta.skip) else {
                continue;
            };
            self.coverage.record(&node.id);
            trace!(node = %node.id, "asserting state node");
            test.test(ctx, state).await?;
        }
        Ok(())
    }

    /// Resolve and run the executor for `event`; a missing one is a no-op.
    pub(crate) async fn execute_event(&self, event: &Event, ctx: &mut C) -> ModelResult<()> {
        match resolve_executor(&self.options.events, event) {
            Some(executor) => executor.exec(ctx, event).await,
            None => Ok(()),
        }
    }

    /// Printable form of a state for traces: value, then context if any.
    pub(crate) fn state_text(&self, state: &M::State) -> String {
        let value = self.machine.state_value(state).to_string();
        match self.machine.state_context(state) {
            Some(context) => format!("{value} {context}"),
            None => value,
        }
    }
}

/// Run a path: assert, then execute, each step in order; finally assert the
/// terminal state. The first failure stops the walk.
pub(crate) async fn run_path<M, C>(path: &TestPath<M, C>, ctx: &mut C) -> ModelResult<TestPathResult>
where
    M: StateMachine,
    C: Send + 'static,
{
    let core = path.core();
    let mut result = TestPathResult {
        steps: Vec::with_capacity(path.steps.len()),
        state: TerminalOutcome {
            value: core.state_text(&path.state),
            error: None,
        },
    };
    debug!(path = %path.description, weight = path.weight, "running test path");

    for step in &path.steps {
        let mut step_result = TestStepResult {
            step: StepRecord {
                state: core.state_text(&step.state),
                event: step.event.clone(),
            },
            state: StepOutcome::default(),
            event: StepOutcome::default(),
        };
        trace!(step = %step.description, event = %step.event.event_type, "running step");

        if let Err(err) = step.test(ctx).await {
            step_result.state.error = Some(err.to_string());
            result.steps.push(step_result);
            return Err(fail(err, result));
        }

        if let Err(err) = step.exec(ctx).await {
            step_result.event.error = Some(err.to_string());
            result.steps.push(step_result);
            return Err(fail(err, result));
        }

        result.steps.push(step_result);
    }

    if let Err(err) = core.test_state(&path.state, ctx).await {
        result.state.error = Some(err.to_string());
        return Err(fail(err, result));
    }

    Ok(result)
}

fn fail(cause: ModelError, result: TestPathResult) -> ModelError {
    debug!(error = %cause, steps = result.steps.len(), "test path failed");
    ModelError::PathFailed(Box::new(PathFailure { cause, result }))
}
