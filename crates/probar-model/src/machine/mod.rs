//! The state machine seam.
//!
//! The test engine never interprets transitions itself. Anything that can
//! answer "given this state and this event, what is the next state?" and
//! describe its state nodes can be explored and tested. [`Machine`] is a
//! ready-made flat implementation driven by a YAML or JSON definition.

pub mod definition;

pub use definition::{Machine, MachineDefinition, StateDefinition};

use crate::event::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of a state node in a (possibly hierarchical) machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Leaf node
    Atomic,
    /// Node with exactly one active child
    Compound,
    /// Node whose children are all active
    Parallel,
    /// Leaf node that completes its parent
    Final,
    /// Pseudo-node restoring a previous configuration
    History,
}

impl NodeKind {
    /// Atomic and final nodes are the leaves that describe a configuration.
    #[must_use]
    pub const fn is_leaf(self) -> bool {
        matches!(self, Self::Atomic | Self::Final)
    }
}

/// A declared state node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateNode {
    /// Globally unique node id, e.g. `toggle.active`
    pub id: String,
    /// Node kind
    pub kind: NodeKind,
}

impl StateNode {
    /// Create a node.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// A state machine the engine can explore and test.
pub trait StateMachine: Send + Sync + 'static {
    /// Machine state (value plus any extended context)
    type State: Clone + fmt::Debug + Send + Sync + 'static;

    /// The state the machine starts in.
    fn initial_state(&self) -> Self::State;

    /// The next state after `event`, or `None` when `state` does not handle it.
    fn transition(&self, state: &Self::State, event: &Event) -> Option<Self::State>;

    /// Event types `state` accepts.
    fn next_events(&self, state: &Self::State) -> Vec<String>;

    /// Every declared state node below the root.
    fn state_nodes(&self) -> Vec<StateNode>;

    /// Nodes active in `state`, ancestors included.
    fn configuration(&self, state: &Self::State) -> Vec<StateNode>;

    /// The state value, e.g. `"active"` or `{"form": "editing"}`.
    fn state_value(&self, state: &Self::State) -> Value;

    /// Extended state, if the machine carries any.
    fn state_context(&self, _state: &Self::State) -> Option<Value> {
        None
    }

    /// Whether `state` matches a (possibly partial) state value.
    fn matches(&self, state: &Self::State, value: &Value) -> bool {
        value_matches(value, &self.state_value(state))
    }

    /// Stable key identifying `state`; equal keys mean equal states.
    fn serialize_state(&self, state: &Self::State) -> String {
        let value = self.state_value(state).to_string();
        match self.state_context(state) {
            Some(context) => format!("{value} | {context}"),
            None => value,
        }
    }
}

/// Whether `child` lies within the partial state value `parent`.
///
/// A string parent matches a string child with the same name or an object
/// child with that key; an object parent requires every key to match.
#[must_use]
pub fn value_matches(parent: &Value, child: &Value) -> bool {
    match (parent, child) {
        (Value::String(p), Value::String(c)) => p == c,
        (Value::String(p), Value::Object(c)) => c.contains_key(p),
        (Value::Object(p), Value::Object(c)) => p.iter().all(|(key, sub)| {
            c.get(key)
                .is_some_and(|child_sub| value_matches(sub, child_sub))
        }),
        _ => false,
    }
}
