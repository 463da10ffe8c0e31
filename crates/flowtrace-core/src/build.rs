//! Merges a static definition with an optional execution trace into a [`Graph`].
//!
//! All nodes are added before any edge. Trace edges are added last so they can tell
//! declared transitions (marked `active`) from undeclared ones (`unexpected`).

use crate::graph::{EdgeClass, EdgeStyle, Graph, Node, NodeClass, NodeStyle, node_dom_id};
use crate::model::{Definition, State, Workflow};

pub fn build_graph(definition: &Definition, workflow: Option<&Workflow>) -> Graph {
    let mut g = Graph::new();
    add_definition_nodes(&mut g, definition, workflow);
    if let Some(wf) = workflow {
        add_trace_nodes(&mut g, wf);
    }
    add_definition_edges(&mut g, definition, workflow);
    if let Some(wf) = workflow {
        add_trace_edges(&mut g, wf);
    }
    tracing::debug!(
        nodes = g.node_count(),
        edges = g.edge_count(),
        with_trace = workflow.is_some(),
        "built workflow graph"
    );
    g
}

pub fn node_style_class(state: &State, workflow: Option<&Workflow>) -> NodeClass {
    NodeClass {
        style: NodeStyle::from_state_type(state.state_type.as_ref()),
        passive: workflow.is_some_and(|wf| is_passive_state(&state.id, wf)),
    }
}

/// A state is passive when it is not current and no action touched it.
pub fn is_passive_state(state_id: &str, workflow: &Workflow) -> bool {
    workflow.state != state_id && !workflow.touches(state_id)
}

/// Counts retried actions for `state_id`, consecutive or not.
pub fn count_retries(state_id: &str, workflow: Option<&Workflow>) -> u32 {
    workflow
        .map(|wf| {
            wf.actions
                .iter()
                .filter(|a| a.state == state_id && a.is_retry())
                .count() as u32
        })
        .unwrap_or(0)
}

/// Where a failing state goes, or `None` when no error edge should be drawn.
pub fn failure_target<'a>(state: &'a State, definition: &'a Definition) -> Option<&'a str> {
    if state.is_end() {
        return None;
    }
    // An empty target means "unset" in definitions.
    let target = state
        .on_failure
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(definition.on_error.as_deref().filter(|s| !s.is_empty()))?;
    (target != state.id).then_some(target)
}

fn create_node(state: State, workflow: Option<&Workflow>) -> Node {
    Node {
        id: node_dom_id(&state.id),
        label: state.id.clone(),
        class: node_style_class(&state, workflow),
        retries: count_retries(&state.id, workflow),
        state,
    }
}

fn add_definition_nodes(g: &mut Graph, definition: &Definition, workflow: Option<&Workflow>) {
    for state in &definition.states {
        g.set_node(state.id.clone(), create_node(state.clone(), workflow));
    }
}

fn add_trace_nodes(g: &mut Graph, workflow: &Workflow) {
    for action in &workflow.actions {
        ensure_node(g, &action.state, Some(workflow));
    }
    ensure_node(g, &workflow.state, Some(workflow));
}

fn ensure_node(g: &mut Graph, state_id: &str, workflow: Option<&Workflow>) {
    if g.has_node(state_id) {
        return;
    }
    let node = create_node(State::placeholder(state_id), workflow);
    g.set_node(state_id, node);
}

fn set_edge(
    g: &mut Graph,
    source: &str,
    target: &str,
    style: EdgeStyle,
    workflow: Option<&Workflow>,
) {
    // Transitions may name states the definition never declares.
    ensure_node(g, source, workflow);
    ensure_node(g, target, workflow);
    g.set_edge(source, target, EdgeClass::new(style));
}

fn add_definition_edges(g: &mut Graph, definition: &Definition, workflow: Option<&Workflow>) {
    for state in &definition.states {
        for transition in &state.transitions {
            set_edge(g, &state.id, transition, EdgeStyle::Normal, workflow);
        }
        if let Some(target) = failure_target(state, definition) {
            set_edge(g, &state.id, target, EdgeStyle::Error, workflow);
        }
    }
}

fn add_trace_edges(g: &mut Graph, workflow: &Workflow) {
    let walk = workflow
        .actions
        .iter()
        .rev()
        .map(|a| a.state.as_str())
        .chain(std::iter::once(workflow.state.as_str()));

    let mut source: Option<&str> = None;
    for state in walk {
        if let Some(prev) = source {
            if prev != state {
                match g.edge_mut(prev, state) {
                    Some(edge) => edge.class.active = true,
                    None => set_edge(g, prev, state, EdgeStyle::Unexpected, Some(workflow)),
                }
            }
        }
        source = Some(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, StateType};

    #[test]
    fn failure_target_prefers_on_failure_and_skips_self_and_end() {
        let def = Definition::new(
            vec![
                State::new("a", StateType::Start),
                State::new("b", StateType::Normal).with_on_failure("c"),
                State::new("c", StateType::End),
                State::new("err", StateType::Error),
            ],
            Some("err".to_string()),
        );
        assert_eq!(failure_target(&def.states[0], &def), Some("err"));
        assert_eq!(failure_target(&def.states[1], &def), Some("c"));
        assert_eq!(failure_target(&def.states[2], &def), None);
        assert_eq!(failure_target(&def.states[3], &def), None);
    }

    #[test]
    fn empty_on_failure_falls_back_to_definition_error_state() {
        let def = Definition::new(
            vec![
                State::new("begin", StateType::Start).with_on_failure(""),
                State::new("error", StateType::Error),
            ],
            Some("error".to_string()),
        );
        assert_eq!(failure_target(&def.states[0], &def), Some("error"));
        let g = build_graph(&def, None);
        assert!(g.has_edge("begin", "error"));
        assert!(!g.has_node(""));

        let no_error = Definition::new(
            vec![State::new("begin", StateType::Start).with_on_failure("")],
            Some(String::new()),
        );
        assert_eq!(failure_target(&no_error.states[0], &no_error), None);
        assert_eq!(build_graph(&no_error, None).edge_count(), 0);
    }

    #[test]
    fn failure_target_is_none_without_any_error_state() {
        let def = Definition::new(vec![State::new("a", StateType::Start)], None);
        assert_eq!(failure_target(&def.states[0], &def), None);
    }

    #[test]
    fn retries_count_non_consecutive_attempts() {
        let wf = Workflow::new(
            "b",
            vec![
                Action::retry("b", 2),
                Action::new("a"),
                Action::retry("b", 1),
                Action::new("b"),
            ],
        );
        assert_eq!(count_retries("b", Some(&wf)), 2);
        assert_eq!(count_retries("a", Some(&wf)), 0);
        assert_eq!(count_retries("b", None), 0);
    }

    #[test]
    fn current_state_is_never_passive() {
        let wf = Workflow::new("x", Vec::new());
        assert!(!is_passive_state("x", &wf));
        assert!(is_passive_state("y", &wf));
    }
}
