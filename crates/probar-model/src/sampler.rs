//! Event sampling: turn an event configuration into concrete exploration input.

use crate::config::{EventTestConfig, EventTestEntry};
use crate::event::Event;

/// Expand an event configuration into representative events.
///
/// A bare executor yields one `{type}` sample; an entry with cases yields one
/// sample per case (a case may set its own `type`); an entry without cases
/// yields one bare sample.
pub fn sample_events<C: Send + 'static>(config: &EventTestConfig<C>) -> Vec<Event> {
    config
        .iter()
        .flat_map(|(event_type, entry)| match entry {
            EventTestEntry::Config {
                cases: Some(cases), ..
            } => cases
                .iter()
                .map(|payload| Event::from_payload(event_type.clone(), payload.clone()))
                .collect::<Vec<_>>(),
            _ => vec![Event::new(event_type.clone())],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn payload(pairs: &[(&str, serde_json::Value)]) -> BTreeMap<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_empty_config_samples_nothing() {
        let config = EventTestConfig::<()>::new();
        assert!(sample_events(&config).is_empty());
    }

    #[test]
    fn test_bare_exec_samples_type_only() {
        let config = EventTestConfig::<()>::new()
            .exec("TOGGLE", |_ctx: &mut (), _e: &Event| async { Ok(()) }.boxed());
        assert_eq!(sample_events(&config), vec![Event::new("TOGGLE")]);
    }

    #[test]
    fn test_cases_expand_one_sample_each_and_may_set_type() {
        let config = EventTestConfig::<()>::new().cases(
            "SUBMIT",
            vec![
                payload(&[("value", json!("good"))]),
                payload(&[("value", json!("")), ("type", json!("HIJACK"))]),
            ],
        );
        let samples = sample_events(&config);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0], Event::new("SUBMIT").with("value", "good"));
        assert_eq!(samples[1].event_type, "HIJACK");
        assert_eq!(samples[1].get("value"), Some(&json!("")));
        assert!(samples[1].get("type").is_none());
    }

    #[test]
    fn test_record_without_cases_samples_bare_event() {
        let config = EventTestConfig::<()>::new().event(
            "CLOSE",
            EventTestEntry::Config {
                exec: None,
                cases: None,
            },
        );
        assert_eq!(sample_events(&config), vec![Event::new("CLOSE")]);
    }
}
