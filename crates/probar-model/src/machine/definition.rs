//! Declarative flat state machines.
//!
//! ```yaml
//! id: "toggle"
//! initial: "inactive"
//! states:
//!   inactive:
//!     on:
//!       TOGGLE: "active"
//!   active:
//!     on:
//!       TOGGLE: "inactive"
//! ```

use super::{NodeKind, StateMachine, StateNode};
use crate::event::Event;
use crate::result::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Machine definition: an initial state and named states with event handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineDefinition {
    /// Machine id; node ids are `<id>.<state>`
    pub id: String,
    /// Initial state name (must exist in states)
    pub initial: String,
    /// State definitions keyed by name
    pub states: BTreeMap<String, StateDefinition>,
}

/// A single named state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateDefinition {
    /// Event type -> target state name
    #[serde(default)]
    pub on: BTreeMap<String, String>,
    /// Whether this is a final state
    #[serde(default)]
    pub final_state: bool,
}

impl StateDefinition {
    /// Add an event handler.
    #[must_use]
    pub fn on(mut self, event_type: impl Into<String>, target: impl Into<String>) -> Self {
        self.on.insert(event_type.into(), target.into());
        self
    }

    /// Mark as final.
    #[must_use]
    pub const fn final_state(mut self) -> Self {
        self.final_state = true;
        self
    }
}

impl MachineDefinition {
    /// Start a definition with no states.
    #[must_use]
    pub fn new(id: impl Into<String>, initial: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            initial: initial.into(),
            states: BTreeMap::new(),
        }
    }

    /// Add a state.
    #[must_use]
    pub fn state(mut self, name: impl Into<String>, state: StateDefinition) -> Self {
        self.states.insert(name.into(), state);
        self
    }

    /// Parse a definition from YAML.
    ///
    /// # Errors
    /// Returns error if YAML is invalid or the definition fails validation.
    pub fn from_yaml(yaml: &str) -> ModelResult<Self> {
        let definition: Self =
            serde_yaml_ng::from_str(yaml).map_err(|e| ModelError::Parse(e.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Parse a definition from JSON.
    ///
    /// # Errors
    /// Returns error if JSON is invalid or the definition fails validation.
    pub fn from_json(json: &str) -> ModelResult<Self> {
        let definition: Self =
            serde_json::from_str(json).map_err(|e| ModelError::Parse(e.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Validate the definition structure.
    pub fn validate(&self) -> ModelResult<()> {
        if self.states.is_empty() {
            return Err(ModelError::InvalidDefinition(
                "states cannot be empty".to_string(),
            ));
        }

        if !self.states.contains_key(&self.initial) {
            return Err(ModelError::InvalidDefinition(format!(
                "initial state '{}' does not exist",
                self.initial
            )));
        }

        for (name, state) in &self.states {
            for (event, target) in &state.on {
                if !self.states.contains_key(target) {
                    return Err(ModelError::InvalidDefinition(format!(
                        "state '{name}' sends event '{event}' to non-existent state '{target}'"
                    )));
                }
            }
        }

        Ok(())
    }

    fn node_id(&self, name: &str) -> String {
        format!("{}.{}", self.id, name)
    }
}

/// A flat machine built from a validated [`MachineDefinition`].
///
/// States are plain state names; there is no extended context.
#[derive(Debug, Clone)]
pub struct Machine {
    definition: MachineDefinition,
}

impl Machine {
    /// Build a machine, validating the definition.
    ///
    /// # Errors
    /// Returns error if the definition fails validation.
    pub fn new(definition: MachineDefinition) -> ModelResult<Self> {
        definition.validate()?;
        Ok(Self { definition })
    }

    /// Parse and build from YAML.
    ///
    /// # Errors
    /// Returns error if YAML is invalid or the definition fails validation.
    pub fn from_yaml(yaml: &str) -> ModelResult<Self> {
        Ok(Self {
            definition: MachineDefinition::from_yaml(yaml)?,
        })
    }

    /// The underlying definition.
    #[must_use]
    pub const fn definition(&self) -> &MachineDefinition {
        &self.definition
    }

    fn kind_of(&self, name: &str) -> NodeKind {
        match self.definition.states.get(name) {
            Some(state) if state.final_state => NodeKind::Final,
            _ => NodeKind::Atomic,
        }
    }
}

impl StateMachine for Machine {
    type State = String;

    fn initial_state(&self) -> String {
        self.definition.initial.clone()
    }

    fn transition(&self, state: &String, event: &Event) -> Option<String> {
        self.definition
            .states
            .get(state)
            .and_then(|s| s.on.get(&event.event_type))
            .cloned()
    }

    fn next_events(&self, state: &String) -> Vec<String> {
        self.definition
            .states
            .get(state)
            .map(|s| s.on.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn state_nodes(&self) -> Vec<StateNode> {
        self.definition
            .states
            .keys()
            .map(|name| StateNode::new(self.definition.node_id(name), self.kind_of(name)))
            .collect()
    }

    fn configuration(&self, state: &String) -> Vec<StateNode> {
        vec![
            StateNode::new(self.definition.id.clone(), NodeKind::Compound),
            StateNode::new(self.definition.node_id(state), self.kind_of(state)),
        ]
    }

    fn state_value(&self, state: &String) -> Value {
        Value::String(state.clone())
    }
}
