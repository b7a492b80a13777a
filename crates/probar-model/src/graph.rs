//! Path search over a machine's reachable state graph.
//!
//! States are identified by [`StateMachine::serialize_state`]. Each state's
//! outgoing edges come from the event types it accepts: a type with sampled
//! events contributes every sample, any other type a bare `{type}` event.
//! Exploration order is deterministic, so repeated searches return the same
//! paths in the same order.

use crate::config::TraversalOptions;
use crate::event::Event;
use crate::machine::StateMachine;
use crate::result::{ModelError, ModelResult};
use std::collections::{HashMap, HashSet, VecDeque};

/// One step of a walk: the state held before `event` fires.
#[derive(Debug, Clone)]
pub struct Step<S> {
    /// State before the event
    pub state: S,
    /// Event advancing to the next state
    pub event: Event,
}

/// A walk from the initial state to `state`.
#[derive(Debug, Clone)]
pub struct RawPath<S> {
    /// Terminal state
    pub state: S,
    /// Ordered steps
    pub steps: Vec<Step<S>>,
    /// Step count
    pub weight: usize,
}

/// All paths found to one serialized state.
#[derive(Debug, Clone)]
pub struct StatePaths<S> {
    /// Serialized state
    pub key: String,
    /// The state itself
    pub state: S,
    /// Paths reaching it
    pub paths: Vec<RawPath<S>>,
}

/// Reachable states and the edges between them.
#[derive(Debug)]
pub struct Adjacency<S> {
    keys: Vec<String>,
    states: Vec<S>,
    edges: Vec<Vec<(Event, usize)>>,
}

impl<S: Clone> Adjacency<S> {
    /// Explore every state reachable from the machine's initial state.
    ///
    /// States rejected by the traversal filter are never added; the initial
    /// state always is.
    pub fn explore<M>(machine: &M, samples: &[Event], options: &TraversalOptions<S>) -> Self
    where
        M: StateMachine<State = S>,
    {
        let mut adjacency = Self {
            keys: Vec::new(),
            states: Vec::new(),
            edges: Vec::new(),
        };
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut queue = VecDeque::new();

        let initial = machine.initial_state();
        let initial_key = machine.serialize_state(&initial);
        index.insert(initial_key.clone(), 0);
        adjacency.push(initial_key, initial);
        queue.push_back(0);

        while let Some(current) = queue.pop_front() {
            let state = adjacency.states[current].clone();

            for event in candidate_events(machine, &state, samples) {
                let Some(next) = machine.transition(&state, &event) else {
                    continue;
                };
                if !options.allows(&next) {
                    continue;
                }
                let key = machine.serialize_state(&next);
                let target = match index.get(&key) {
                    Some(&existing) => existing,
                    None => {
                        let id = adjacency.keys.len();
                        index.insert(key.clone(), id);
                        adjacency.push(key, next);
                        queue.push_back(id);
                        id
                    }
                };
                adjacency.edges[current].push((event, target));
            }
        }

        adjacency
    }

    fn push(&mut self, key: String, state: S) {
        self.keys.push(key);
        self.states.push(state);
        self.edges.push(Vec::new());
    }

    /// Number of reachable states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether nothing was explored (never true for a real machine).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Serialized keys in discovery order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// One shortest path per reachable state, in discovery order.
    pub fn shortest_paths(&self) -> Vec<StatePaths<S>> {
        if self.is_empty() {
            return Vec::new();
        }

        let mut previous: Vec<Option<(usize, usize)>> = vec![None; self.len()];
        let mut seen = vec![false; self.len()];
        let mut order = Vec::with_capacity(self.len());
        let mut queue = VecDeque::new();
        seen[0] = true;
        queue.push_back(0);

        while let Some(current) = queue.pop_front() {
            order.push(current);
            for (edge, (_, target)) in self.edges[current].iter().enumerate() {
                if !seen[*target] {
                    seen[*target] = true;
                    previous[*target] = Some((current, edge));
                    queue.push_back(*target);
                }
            }
        }

        order
            .into_iter()
            .map(|node| {
                let mut steps = Vec::new();
                let mut cursor = node;
                while let Some((from, edge)) = previous[cursor] {
                    steps.push(Step {
                        state: self.states[from].clone(),
                        event: self.edges[from][edge].0.clone(),
                    });
                    cursor = from;
                }
                steps.reverse();
                StatePaths {
                    key: self.keys[node].clone(),
                    state: self.states[node].clone(),
                    paths: vec![RawPath {
                        state: self.states[node].clone(),
                        weight: steps.len(),
                        steps,
                    }],
                }
            })
            .collect()
    }

    /// Every simple (state-non-repeating) path to every reachable state.
    pub fn simple_paths(&self, max_depth: Option<usize>) -> Vec<StatePaths<S>> {
        if self.is_empty() {
            return Vec::new();
        }

        let mut found: Vec<Vec<RawPath<S>>> = vec![Vec::new(); self.len()];
        let mut first_seen = Vec::new();
        let mut on_path = HashSet::new();
        let mut walk = Vec::new();
        self.walk_simple(0, max_depth, &mut on_path, &mut walk, &mut found, &mut first_seen);

        first_seen
            .into_iter()
            .map(|node| StatePaths {
                key: self.keys[node].clone(),
                state: self.states[node].clone(),
                paths: std::mem::take(&mut found[node]),
            })
            .collect()
    }

    fn walk_simple(
        &self,
        node: usize,
        max_depth: Option<usize>,
        on_path: &mut HashSet<usize>,
        walk: &mut Vec<(usize, usize)>,
        found: &mut Vec<Vec<RawPath<S>>>,
        first_seen: &mut Vec<usize>,
    ) {
        on_path.insert(node);
        if found[node].is_empty() {
            first_seen.push(node);
        }
        found[node].push(RawPath {
            state: self.states[node].clone(),
            steps: walk
                .iter()
                .map(|&(from, edge)| Step {
                    state: self.states[from].clone(),
                    event: self.edges[from][edge].0.clone(),
                })
                .collect(),
            weight: walk.len(),
        });

        if max_depth.map_or(true, |depth| walk.len() < depth) {
            for (edge, (_, target)) in self.edges[node].iter().enumerate() {
                if !on_path.contains(target) {
                    walk.push((node, edge));
                    self.walk_simple(*target, max_depth, on_path, walk, found, first_seen);
                    walk.pop();
                }
            }
        }

        on_path.remove(&node);
    }
}

/// Events to try from `state`: samples for each accepted type, or a bare event.
pub fn candidate_events<M: StateMachine>(machine: &M, state: &M::State, samples: &[Event]) -> Vec<Event> {
    machine
        .next_events(state)
        .into_iter()
        .flat_map(|event_type| {
            let sampled: Vec<Event> = samples
                .iter()
                .filter(|sample| sample.event_type == event_type)
                .cloned()
                .collect();
            if sampled.is_empty() {
                vec![Event::new(event_type)]
            } else {
                sampled
            }
        })
        .collect()
}

/// Shortest path to every reachable state.
pub fn shortest_paths<M: StateMachine>(
    machine: &M,
    samples: &[Event],
    options: &TraversalOptions<M::State>,
) -> Vec<StatePaths<M::State>> {
    Adjacency::explore(machine, samples, options).shortest_paths()
}

/// Every simple path to every reachable state.
pub fn simple_paths<M: StateMachine>(
    machine: &M,
    samples: &[Event],
    options: &TraversalOptions<M::State>,
) -> Vec<StatePaths<M::State>> {
    Adjacency::explore(machine, samples, options).simple_paths(options.max_depth)
}

/// Replay a literal event sequence from the initial state.
///
/// # Errors
/// Returns [`ModelError::InvalidEvent`] when a state does not handle the next event.
pub fn path_from_events<M: StateMachine>(machine: &M, events: &[Event]) -> ModelResult<RawPath<M::State>> {
    let mut state = machine.initial_state();
    let mut steps = Vec::with_capacity(events.len());

    for event in events {
        let next = machine
            .transition(&state, event)
            .ok_or_else(|| ModelError::InvalidEvent {
                state: machine.serialize_state(&state),
                event: event.serialize(),
            })?;
        steps.push(Step {
            state,
            event: event.clone(),
        });
        state = next;
    }

    Ok(RawPath {
        state,
        weight: steps.len(),
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{Machine, MachineDefinition, StateDefinition};

    /// a -> b -> c, plus a shortcut a -> c and a loop c -> a
    fn triangle() -> Machine {
        Machine::new(
            MachineDefinition::new("tri", "a")
                .state("a", StateDefinition::default().on("NEXT", "b").on("SKIP", "c"))
                .state("b", StateDefinition::default().on("NEXT", "c"))
                .state("c", StateDefinition::default().on("RESET", "a")),
        )
        .expect("valid")
    }

    fn types(path: &RawPath<String>) -> Vec<&str> {
        path.steps.iter().map(|s| s.event.event_type.as_str()).collect()
    }

    #[test]
    fn test_explore_discovers_reachable_states() {
        let machine = triangle();
        let adjacency = Adjacency::explore(&machine, &[], &TraversalOptions::default());
        let keys: Vec<_> = adjacency.keys().collect();
        assert_eq!(keys, vec!["\"a\"", "\"b\"", "\"c\""]);
    }

    #[test]
    fn test_shortest_paths_take_shortcut() {
        let paths = shortest_paths(&triangle(), &[], &TraversalOptions::default());
        assert_eq!(paths.len(), 3);
        let to_c = paths.iter().find(|p| p.state == "c").expect("c reachable");
        assert_eq!(to_c.paths.len(), 1);
        assert_eq!(to_c.paths[0].weight, 1);
        assert_eq!(types(&to_c.paths[0]), vec!["SKIP"]);
        assert_eq!(paths[0].paths[0].weight, 0);
    }

    #[test]
    fn test_simple_paths_enumerate_all_routes() {
        let paths = simple_paths(&triangle(), &[], &TraversalOptions::default());
        let to_c = paths.iter().find(|p| p.state == "c").expect("c reachable");
        let mut routes: Vec<_> = to_c.paths.iter().map(types).collect();
        routes.sort();
        assert_eq!(routes, vec![vec!["NEXT", "NEXT"], vec!["SKIP"]]);

        let to_a = paths.iter().find(|p| p.state == "a").expect("initial");
        assert_eq!(to_a.paths.len(), 1);
        assert!(to_a.paths[0].steps.is_empty());
    }

    #[test]
    fn test_simple_paths_respect_max_depth() {
        let options = TraversalOptions::default().with_max_depth(1);
        let paths = simple_paths(&triangle(), &[], &options);
        let to_c = paths.iter().find(|p| p.state == "c").expect("c reachable");
        assert_eq!(to_c.paths.len(), 1);
        assert_eq!(to_c.paths[0].weight, 1);
    }

    #[test]
    fn test_filtered_states_are_left_out() {
        let options = TraversalOptions::default().with_filter(|s: &String| s != "c");
        let paths = shortest_paths(&triangle(), &[], &options);
        let states: Vec<_> = paths.iter().map(|p| p.state.as_str()).collect();
        assert_eq!(states, vec!["a", "b"]);
    }

    #[test]
    fn test_filter_keeps_initial_state() {
        let options = TraversalOptions::default().with_filter(|_: &String| false);
        let paths = shortest_paths(&triangle(), &[], &options);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].state, "a");
        assert!(paths[0].paths[0].steps.is_empty());
    }

    #[test]
    fn test_samples_replace_bare_events() {
        let machine = triangle();
        let samples = vec![
            Event::new("NEXT").with("speed", 1),
            Event::new("NEXT").with("speed", 2),
        ];
        let events = candidate_events(&machine, &"a".to_string(), &samples);
        assert_eq!(events.len(), 3);
        assert!(events.contains(&Event::new("SKIP")));
        assert!(!events.contains(&Event::new("NEXT")));
    }

    #[test]
    fn test_path_from_events_replays_literal_sequence() {
        let machine = triangle();
        let events = vec![Event::new("NEXT"), Event::new("NEXT"), Event::new("RESET")];
        let path = path_from_events(&machine, &events).expect("valid sequence");
        assert_eq!(path.state, "a");
        assert_eq!(path.weight, 3);
        let replayed: Vec<_> = path.steps.iter().map(|s| s.event.clone()).collect();
        assert_eq!(replayed, events);
        assert_eq!(path.steps[1].state, "b");
    }

    #[test]
    fn test_path_from_events_rejects_unhandled_event() {
        let machine = triangle();
        let err = path_from_events(&machine, &[Event::new("RESET")]).expect_err("a ignores RESET");
        assert!(matches!(err, ModelError::InvalidEvent { .. }));
        assert!(err.to_string().contains("RESET"));
    }
}
