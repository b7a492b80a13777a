//! Test configuration: event executors, state assertions, and traversal options.
//!
//! Executors and assertions are async. Implement [`EventExecutor`] or
//! [`StateAssertion`] directly, or pass a closure returning a boxed future:
//!
//! ```ignore
//! use futures::FutureExt;
//!
//! let events = EventTestConfig::new().exec("TOGGLE", |page: &mut Page, _event| {
//!     async move { page.click("#toggle").await }.boxed()
//! });
//! ```

use crate::event::Event;
use crate::machine::StateNode;
use crate::result::ModelResult;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Drives the system under test for one event.
#[async_trait]
pub trait EventExecutor<C: Send>: Send + Sync {
    /// Perform `event` against the test context.
    async fn exec(&self, ctx: &mut C, event: &Event) -> ModelResult<()>;
}

/// Checks that the system under test is in a modeled state.
#[async_trait]
pub trait StateAssertion<C: Send, S: Sync>: Send + Sync {
    /// Assert `state` against the test context.
    async fn test(&self, ctx: &mut C, state: &S) -> ModelResult<()>;
}

struct ExecFn<F>(F);

#[async_trait]
impl<C, F> EventExecutor<C> for ExecFn<F>
where
    C: Send,
    F: for<'a> Fn(&'a mut C, &'a Event) -> BoxFuture<'a, ModelResult<()>> + Send + Sync,
{
    async fn exec(&self, ctx: &mut C, event: &Event) -> ModelResult<()> {
        (self.0)(ctx, event).await
    }
}

struct AssertFn<F>(F);

#[async_trait]
impl<C, S, F> StateAssertion<C, S> for AssertFn<F>
where
    C: Send,
    S: Sync,
    F: for<'a> Fn(&'a mut C, &'a S) -> BoxFuture<'a, ModelResult<()>> + Send + Sync,
{
    async fn test(&self, ctx: &mut C, state: &S) -> ModelResult<()> {
        (self.0)(ctx, state).await
    }
}

/// Wrap a closure as a shared [`EventExecutor`].
pub fn exec_fn<C, F>(f: F) -> Arc<dyn EventExecutor<C>>
where
    C: Send + 'static,
    F: for<'a> Fn(&'a mut C, &'a Event) -> BoxFuture<'a, ModelResult<()>> + Send + Sync + 'static,
{
    Arc::new(ExecFn(f))
}

/// Wrap a closure as a shared [`StateAssertion`].
pub fn assert_fn<C, S, F>(f: F) -> Arc<dyn StateAssertion<C, S>>
where
    C: Send + 'static,
    S: Sync + 'static,
    F: for<'a> Fn(&'a mut C, &'a S) -> BoxFuture<'a, ModelResult<()>> + Send + Sync + 'static,
{
    Arc::new(AssertFn(f))
}

/// Configuration for one event type.
pub enum EventTestEntry<C: Send> {
    /// A bare executor; exploration uses a single `{type}` sample
    Exec(Arc<dyn EventExecutor<C>>),
    /// Optional executor plus representative payloads
    Config {
        /// Executor, if any
        exec: Option<Arc<dyn EventExecutor<C>>>,
        /// Payloads to sample; `None` samples a single bare event
        cases: Option<Vec<BTreeMap<String, Value>>>,
    },
}

impl<C: Send> EventTestEntry<C> {
    /// The executor this entry resolves to, if any.
    #[must_use]
    pub fn executor(&self) -> Option<&Arc<dyn EventExecutor<C>>> {
        match self {
            Self::Exec(exec) => Some(exec),
            Self::Config { exec, .. } => exec.as_ref(),
        }
    }
}

impl<C: Send> Clone for EventTestEntry<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Exec(exec) => Self::Exec(Arc::clone(exec)),
            Self::Config { exec, cases } => Self::Config {
                exec: exec.clone(),
                cases: cases.clone(),
            },
        }
    }
}

impl<C: Send> fmt::Debug for EventTestEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exec(_) => f.write_str("Exec(<fn>)"),
            Self::Config { exec, cases } => f
                .debug_struct("Config")
                .field("exec", &exec.as_ref().map(|_| "<fn>"))
                .field("cases", cases)
                .finish(),
        }
    }
}

/// Event type -> executor/cases mapping.
pub struct EventTestConfig<C: Send> {
    entries: BTreeMap<String, EventTestEntry<C>>,
}

impl<C: Send> Default for EventTestConfig<C> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<C: Send> Clone for EventTestConfig<C> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<C: Send> fmt::Debug for EventTestConfig<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl<C: Send + 'static> EventTestConfig<C> {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an entry for an event type, replacing any previous one.
    #[must_use]
    pub fn event(mut self, event_type: impl Into<String>, entry: EventTestEntry<C>) -> Self {
        self.entries.insert(event_type.into(), entry);
        self
    }

    /// Register a bare executor closure.
    #[must_use]
    pub fn exec<F>(self, event_type: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(&'a mut C, &'a Event) -> BoxFuture<'a, ModelResult<()>>
            + Send
            + Sync
            + 'static,
    {
        self.event(event_type, EventTestEntry::Exec(exec_fn(f)))
    }

    /// Register an executor implementation.
    #[must_use]
    pub fn executor(self, event_type: impl Into<String>, exec: Arc<dyn EventExecutor<C>>) -> Self {
        self.event(event_type, EventTestEntry::Exec(exec))
    }

    /// Register an executor closure with representative payloads.
    #[must_use]
    pub fn exec_cases<F>(
        self,
        event_type: impl Into<String>,
        cases: Vec<BTreeMap<String, Value>>,
        f: F,
    ) -> Self
    where
        F: for<'a> Fn(&'a mut C, &'a Event) -> BoxFuture<'a, ModelResult<()>>
            + Send
            + Sync
            + 'static,
    {
        self.event(
            event_type,
            EventTestEntry::Config {
                exec: Some(exec_fn(f)),
                cases: Some(cases),
            },
        )
    }

    /// Register payloads to explore without an executor.
    #[must_use]
    pub fn cases(self, event_type: impl Into<String>, cases: Vec<BTreeMap<String, Value>>) -> Self {
        self.event(
            event_type,
            EventTestEntry::Config {
                exec: None,
                cases: Some(cases),
            },
        )
    }

    /// Look up the entry for an event type.
    #[must_use]
    pub fn get(&self, event_type: &str) -> Option<&EventTestEntry<C>> {
        self.entries.get(event_type)
    }

    /// Iterate entries in event-type order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &EventTestEntry<C>)> {
        self.entries.iter()
    }

    /// Number of configured event types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no event type is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// State description: a literal or computed from the state.
pub enum Description<S> {
    /// Fixed text
    Text(String),
    /// Computed from the state
    Computed(Arc<dyn Fn(&S) -> String + Send + Sync>),
}

impl<S> Clone for Description<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Text(text) => Self::Text(text.clone()),
            Self::Computed(f) => Self::Computed(Arc::clone(f)),
        }
    }
}

impl<S> fmt::Debug for Description<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Computed(_) => f.write_str("Computed(<fn>)"),
        }
    }
}

/// Test metadata attached to one state node.
pub struct StateTestMeta<C: Send, S: Sync> {
    /// Assertion to run whenever the node is active
    pub test: Option<Arc<dyn StateAssertion<C, S>>>,
    /// Skip the assertion (and its coverage count)
    pub skip: bool,
    /// Description override
    pub description: Option<Description<S>>,
}

impl<C: Send, S: Sync> Default for StateTestMeta<C, S> {
    fn default() -> Self {
        Self {
            test: None,
            skip: false,
            description: None,
        }
    }
}

impl<C: Send, S: Sync> Clone for StateTestMeta<C, S> {
    fn clone(&self) -> Self {
        Self {
            test: self.test.clone(),
            skip: self.skip,
            description: self.description.clone(),
        }
    }
}

impl<C: Send, S: Sync> fmt::Debug for StateTestMeta<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTestMeta")
            .field("test", &self.test.as_ref().map(|_| "<fn>"))
            .field("skip", &self.skip)
            .field("description", &self.description)
            .finish()
    }
}

impl<C: Send + 'static, S: Sync + 'static> StateTestMeta<C, S> {
    /// Metadata with an assertion closure.
    #[must_use]
    pub fn test<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut C, &'a S) -> BoxFuture<'a, ModelResult<()>> + Send + Sync + 'static,
    {
        Self {
            test: Some(assert_fn(f)),
            ..Self::default()
        }
    }

    /// Metadata with an assertion implementation.
    #[must_use]
    pub fn assertion(test: Arc<dyn StateAssertion<C, S>>) -> Self {
        Self {
            test: Some(test),
            ..Self::default()
        }
    }

    /// Mark the assertion as skipped.
    #[must_use]
    pub fn skip(mut self) -> Self {
        self.skip = true;
        self
    }

    /// Use a literal description.
    #[must_use]
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(Description::Text(text.into()));
        self
    }

    /// Compute the description from the state.
    #[must_use]
    pub fn describe_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&S) -> String + Send + Sync + 'static,
    {
        self.description = Some(Description::Computed(Arc::new(f)));
        self
    }

    /// Whether the assertion should run.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.test.is_some() && !self.skip
    }
}

/// State node id -> test metadata.
pub struct StateTestConfig<C: Send, S: Sync> {
    nodes: BTreeMap<String, StateTestMeta<C, S>>,
}

impl<C: Send, S: Sync> Default for StateTestConfig<C, S> {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
        }
    }
}

impl<C: Send, S: Sync> Clone for StateTestConfig<C, S> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
        }
    }
}

impl<C: Send, S: Sync> fmt::Debug for StateTestConfig<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.nodes.iter()).finish()
    }
}

impl<C: Send + 'static, S: Sync + 'static> StateTestConfig<C, S> {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach metadata to a node id, replacing any previous entry.
    #[must_use]
    pub fn node(mut self, id: impl Into<String>, meta: StateTestMeta<C, S>) -> Self {
        self.nodes.insert(id.into(), meta);
        self
    }

    /// Attach an assertion closure to a node id.
    #[must_use]
    pub fn test<F>(self, id: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(&'a mut C, &'a S) -> BoxFuture<'a, ModelResult<()>> + Send + Sync + 'static,
    {
        self.node(id, StateTestMeta::test(f))
    }

    /// Metadata for a node id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&StateTestMeta<C, S>> {
        self.nodes.get(id)
    }
}

/// Predicate over machine states.
pub type StatePredicate<S> = Arc<dyn Fn(&S) -> bool + Send + Sync>;

/// Options for path exploration.
pub struct TraversalOptions<S> {
    /// States failing the filter are left out of the graph
    pub filter: Option<StatePredicate<S>>,
    /// Maximum simple-path length
    pub max_depth: Option<usize>,
}

impl<S> Default for TraversalOptions<S> {
    fn default() -> Self {
        Self {
            filter: None,
            max_depth: None,
        }
    }
}

impl<S> Clone for TraversalOptions<S> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            max_depth: self.max_depth,
        }
    }
}

impl<S> fmt::Debug for TraversalOptions<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraversalOptions")
            .field("filter", &self.filter.as_ref().map(|_| "<fn>"))
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl<S> TraversalOptions<S> {
    /// Default options: explore everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only reach states accepted by `filter`.
    #[must_use]
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Bound simple paths to at most `depth` steps.
    #[must_use]
    pub const fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub(crate) fn allows(&self, state: &S) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(state))
    }
}

/// Options for coverage reporting.
#[derive(Clone, Default)]
pub struct CoverageOptions {
    /// Only report nodes accepted by the filter
    pub filter: Option<Arc<dyn Fn(&StateNode) -> bool + Send + Sync>>,
}

impl fmt::Debug for CoverageOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoverageOptions")
            .field("filter", &self.filter.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl CoverageOptions {
    /// Report only nodes accepted by `filter`.
    #[must_use]
    pub fn with_filter<F>(filter: F) -> Self
    where
        F: Fn(&StateNode) -> bool + Send + Sync + 'static,
    {
        Self {
            filter: Some(Arc::new(filter)),
        }
    }
}

/// Everything a [`crate::TestModel`] is configured with.
pub struct ModelOptions<C: Send, S: Sync> {
    /// Event executors and sampled payloads
    pub events: EventTestConfig<C>,
    /// Per-node assertions and descriptions
    pub states: StateTestConfig<C, S>,
}

impl<C: Send, S: Sync> Default for ModelOptions<C, S> {
    fn default() -> Self {
        Self {
            events: EventTestConfig::default(),
            states: StateTestConfig::default(),
        }
    }
}

impl<C: Send, S: Sync> Clone for ModelOptions<C, S> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            states: self.states.clone(),
        }
    }
}

impl<C: Send, S: Sync> fmt::Debug for ModelOptions<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelOptions")
            .field("events", &self.events)
            .field("states", &self.states)
            .finish()
    }
}

impl<C: Send, S: Sync> ModelOptions<C, S> {
    /// Create default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the event configuration.
    #[must_use]
    pub fn with_events(mut self, events: EventTestConfig<C>) -> Self {
        self.events = events;
        self
    }

    /// Set the state test configuration.
    #[must_use]
    pub fn with_states(mut self, states: StateTestConfig<C, S>) -> Self {
        self.states = states;
        self
    }
}
