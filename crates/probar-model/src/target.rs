//! Plan targets: a (partial) state value or a predicate over states.

use crate::machine::StateMachine;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// What a plan should reach.
pub enum Target<S> {
    /// Matches via [`StateMachine::matches`]
    Value(Value),
    /// Matches when the predicate returns true
    Predicate(Arc<dyn Fn(&S) -> bool + Send + Sync>),
}

impl<S> Target<S> {
    /// Target states satisfying `predicate`.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(predicate))
    }

    /// Whether `state` is a target state.
    pub fn matches<M>(&self, machine: &M, state: &S) -> bool
    where
        M: StateMachine<State = S>,
    {
        match self {
            Self::Value(value) => machine.matches(state, value),
            Self::Predicate(predicate) => predicate(state),
        }
    }
}

impl<S> Clone for Target<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Value(value) => Self::Value(value.clone()),
            Self::Predicate(predicate) => Self::Predicate(Arc::clone(predicate)),
        }
    }
}

impl<S> fmt::Display for Target<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => write!(f, "{value}"),
            Self::Predicate(_) => f.write_str("<predicate>"),
        }
    }
}

impl<S> fmt::Debug for Target<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Predicate(_) => f.write_str("Predicate(<fn>)"),
        }
    }
}

impl<S> From<&str> for Target<S> {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

impl<S> From<String> for Target<S> {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl<S> From<Value> for Target<S> {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::Machine;
    use serde_json::json;

    fn toggle() -> Machine {
        Machine::from_yaml(
            "id: toggle\ninitial: inactive\nstates:\n  inactive:\n    on: { TOGGLE: active }\n  active:\n    on: { TOGGLE: inactive }\n",
        )
        .expect("valid")
    }

    #[test]
    fn test_value_target_uses_machine_matching() {
        let machine = toggle();
        let target: Target<String> = "active".into();
        assert!(target.matches(&machine, &"active".to_string()));
        assert!(!target.matches(&machine, &"inactive".to_string()));
        assert_eq!(target.to_string(), "\"active\"");
    }

    #[test]
    fn test_predicate_target() {
        let machine = toggle();
        let target = Target::predicate(|s: &String| s.starts_with("in"));
        assert!(target.matches(&machine, &"inactive".to_string()));
        assert!(!target.matches(&machine, &"active".to_string()));
        assert_eq!(target.to_string(), "<predicate>");
    }

    #[test]
    fn test_json_target() {
        let target: Target<String> = json!({"form": "editing"}).into();
        assert!(matches!(target, Target::Value(Value::Object(_))));
    }
}
