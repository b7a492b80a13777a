//! The test model: plan generation, plan execution support, and coverage.

use crate::config::{CoverageOptions, EventTestConfig, ModelOptions, TraversalOptions};
use crate::coverage::{Coverage, CoverageTracker};
use crate::event::Event;
use crate::graph;
use crate::machine::StateMachine;
use crate::plan::{self, TestPlan};
use crate::result::{ModelError, ModelResult};
use crate::sampler;
use crate::target::Target;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// State shared by a model and every plan it compiles.
pub(crate) struct ModelCore<M: StateMachine, C: Send> {
    pub(crate) machine: Arc<M>,
    pub(crate) options: ModelOptions<C, M::State>,
    pub(crate) coverage: CoverageTracker,
}

/// A state machine paired with the assertions and executors that test a
/// real system against it.
///
/// ```ignore
/// let model = TestModel::with_options(machine, ModelOptions::new().with_events(events));
/// for plan in model.shortest_path_plans() {
///     plan.test(&mut page).await?;
/// }
/// model.test_coverage(&CoverageOptions::default())?;
/// ```
pub struct TestModel<M: StateMachine, C: Send> {
    core: Arc<ModelCore<M, C>>,
}

impl<M: StateMachine, C: Send> Clone for TestModel<M, C> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<M: StateMachine, C: Send> fmt::Debug for TestModel<M, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestModel")
            .field("options", &self.core.options)
            .field("coverage", &self.core.coverage)
            .finish()
    }
}

impl<M: StateMachine, C: Send + 'static> TestModel<M, C> {
    /// Create a model with no executors or assertions.
    #[must_use]
    pub fn new(machine: M) -> Self {
        Self::with_options(machine, ModelOptions::default())
    }

    /// Create a model with options.
    #[must_use]
    pub fn with_options(machine: M, options: ModelOptions<C, M::State>) -> Self {
        Self::from_shared(Arc::new(machine), options)
    }

    /// Create a model over a machine shared with other models.
    #[must_use]
    pub fn from_shared(machine: Arc<M>, options: ModelOptions<C, M::State>) -> Self {
        Self {
            core: Arc::new(ModelCore {
                machine,
                options,
                coverage: CoverageTracker::new(),
            }),
        }
    }

    /// A new model over the same machine with a different event configuration.
    ///
    /// State assertions carry over; coverage starts from zero.
    #[must_use]
    pub fn with_events(&self, events: EventTestConfig<C>) -> Self {
        let options = ModelOptions {
            events,
            states: self.core.options.states.clone(),
        };
        Self::from_shared(Arc::clone(&self.core.machine), options)
    }

    /// The machine under test.
    #[must_use]
    pub fn machine(&self) -> &M {
        &self.core.machine
    }

    /// Model options.
    #[must_use]
    pub fn options(&self) -> &ModelOptions<C, M::State> {
        &self.core.options
    }

    /// Representative events derived from the event configuration.
    #[must_use]
    pub fn event_samples(&self) -> Vec<Event> {
        sampler::sample_events(&self.core.options.events)
    }

    /// One plan per reachable state, each with a single shortest path.
    #[must_use]
    pub fn shortest_path_plans(&self) -> Vec<TestPlan<M, C>> {
        self.shortest_path_plans_with(&TraversalOptions::default())
    }

    /// Shortest-path plans with explicit traversal options.
    #[must_use]
    pub fn shortest_path_plans_with(&self, options: &TraversalOptions<M::State>) -> Vec<TestPlan<M, C>> {
        let samples = self.event_samples();
        let paths = graph::shortest_paths(self.machine(), &samples, options);
        debug!(states = paths.len(), samples = samples.len(), "shortest paths found");
        self.test_plans(paths)
    }

    /// Shortest-path plans reaching `target`, keeping every plan of minimal weight.
    #[must_use]
    pub fn shortest_path_plans_to(&self, target: impl Into<Target<M::State>>) -> Vec<TestPlan<M, C>> {
        let target = target.into();
        let matching = self.filter_plans_to(&target, self.shortest_path_plans());
        let Some(min_weight) = matching.iter().map(TestPlan::weight).min() else {
            return Vec::new();
        };
        matching
            .into_iter()
            .filter(|plan| plan.weight() == min_weight)
            .collect()
    }

    /// One plan per reachable state with every simple path to it.
    #[must_use]
    pub fn simple_path_plans(&self) -> Vec<TestPlan<M, C>> {
        self.simple_path_plans_with(&TraversalOptions::default())
    }

    /// Simple-path plans with explicit traversal options.
    #[must_use]
    pub fn simple_path_plans_with(&self, options: &TraversalOptions<M::State>) -> Vec<TestPlan<M, C>> {
        let samples = self.event_samples();
        let paths = graph::simple_paths(self.machine(), &samples, options);
        debug!(states = paths.len(), samples = samples.len(), "simple paths found");
        self.test_plans(paths)
    }

    /// Simple-path plans reaching `target`.
    #[must_use]
    pub fn simple_path_plans_to(&self, target: impl Into<Target<M::State>>) -> Vec<TestPlan<M, C>> {
        let target = target.into();
        self.filter_plans_to(&target, self.simple_path_plans())
    }

    /// A plan replaying exactly `events`, which must end in `target`.
    ///
    /// Only the final state is checked here; intermediate state assertions
    /// run when the plan is tested, like any other plan.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidEvent`] if the sequence cannot be replayed
    /// and [`ModelError::TargetMismatch`] if it ends elsewhere.
    pub fn plan_from_events(
        &self,
        events: &[Event],
        target: impl Into<Target<M::State>>,
    ) -> ModelResult<TestPlan<M, C>> {
        let target = target.into();
        let path = graph::path_from_events(self.machine(), events)?;

        if !target.matches(self.machine(), &path.state) {
            return Err(ModelError::TargetMismatch {
                actual: self.machine().state_value(&path.state).to_string(),
                expected: target.to_string(),
            });
        }

        let entry = graph::StatePaths {
            key: self.machine().serialize_state(&path.state),
            state: path.state.clone(),
            paths: vec![path],
        };
        self.test_plans(vec![entry])
            .pop()
            .ok_or_else(|| ModelError::execution("no plan compiled from events"))
    }

    /// Compile raw paths into plans bound to this model.
    #[must_use]
    pub fn test_plans(&self, paths: Vec<graph::StatePaths<M::State>>) -> Vec<TestPlan<M, C>> {
        plan::compile(&self.core, paths)
    }

    /// Run the assertions attached to `state`'s active nodes.
    ///
    /// # Errors
    /// Propagates the first failing assertion.
    pub async fn test_state(&self, state: &M::State, ctx: &mut C) -> ModelResult<()> {
        self.core.test_state(state, ctx).await
    }

    /// Run the executor registered for `event`, if any.
    ///
    /// # Errors
    /// Propagates the executor's failure.
    pub async fn execute_event(&self, event: &Event, ctx: &mut C) -> ModelResult<()> {
        self.core.execute_event(event, ctx).await
    }

    /// Assertion counts for every declared (and filtered) state node.
    #[must_use]
    pub fn coverage(&self, options: &CoverageOptions) -> Coverage {
        self.core
            .coverage
            .report(&self.core.machine.state_nodes(), options)
    }

    /// Fail unless every declared (and filtered) node was asserted.
    ///
    /// # Errors
    /// Returns [`ModelError::CoverageIncomplete`] listing the uncovered nodes.
    pub fn test_coverage(&self, options: &CoverageOptions) -> ModelResult<()> {
        self.core
            .coverage
            .check(&self.core.machine.state_nodes(), options)
    }

    fn filter_plans_to(&self, target: &Target<M::State>, plans: Vec<TestPlan<M, C>>) -> Vec<TestPlan<M, C>> {
        plans
            .into_iter()
            .filter(|plan| target.matches(self.machine(), &plan.state))
            .collect()
    }
}
