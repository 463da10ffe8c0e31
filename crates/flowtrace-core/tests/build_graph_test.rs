use flowtrace_core::graph::EdgeStyle;
use flowtrace_core::{Action, Definition, State, StateType, Workflow, build_graph};

fn credit_definition() -> Definition {
    Definition::new(
        vec![
            State::new("A", StateType::Start).with_transitions(["B"]),
            State::new("B", StateType::Normal).with_transitions(["C"]),
            State::new("C", StateType::End),
        ],
        Some("A".to_string()),
    )
}

fn edge_class(g: &flowtrace_core::Graph, s: &str, t: &str) -> String {
    g.edge(s, t)
        .unwrap_or_else(|| panic!("missing edge {s}->{t}"))
        .class
        .to_string()
}

#[test]
fn static_definition_yields_one_node_per_state_and_declared_edges() {
    let def = Definition::new(
        vec![
            State::new("begin", StateType::Start).with_transitions(["process", "manual"]),
            State::new("process", StateType::Normal)
                .with_transitions(["done"])
                .with_on_failure("manual"),
            State::new("manual", StateType::Manual).with_transitions(["done"]),
            State::new("done", StateType::End),
            State::new("error", StateType::Error),
        ],
        Some("error".to_string()),
    );
    let g = build_graph(&def, None);

    assert_eq!(g.node_count(), 5);
    // 4 transitions + error edges from begin, process (to manual) and manual.
    assert_eq!(g.edge_count(), 7);
    for e in g.edges() {
        assert!(g.has_node(&e.source) && g.has_node(&e.target));
    }
    assert_eq!(edge_class(&g, "process", "manual"), "edge-error");
    assert_eq!(edge_class(&g, "begin", "error"), "edge-error");
    assert!(!g.has_edge("process", "error"));
    assert!(!g.has_edge("done", "error"));
    assert!(!g.has_edge("error", "error"));
    assert!(g.nodes().all(|n| !n.class.passive));
}

#[test]
fn empty_definition_yields_empty_graph() {
    let g = build_graph(&Definition::default(), None);
    assert!(g.is_empty());
    assert_eq!(g.edge_count(), 0);
}

#[test]
fn worked_example_marks_retries_activity_and_passivity() {
    let def = credit_definition();
    let wf = Workflow::new(
        "B",
        vec![Action::new("A"), Action::new("B"), Action::retry("B", 1)],
    );
    let g = build_graph(&def, Some(&wf));

    assert_eq!(g.node_count(), 3);
    assert_eq!(g.edge_count(), 3);
    assert_eq!(edge_class(&g, "A", "B"), "edge-normal active");
    assert_eq!(edge_class(&g, "B", "C"), "edge-normal");
    // Walk is B, B, A, B: the declared B->A failure edge was taken too.
    assert_eq!(edge_class(&g, "B", "A"), "edge-error active");
    assert!(!g.has_edge("A", "A"));
    assert!(!g.has_edge("C", "A"));

    let b = g.node("B").unwrap();
    assert_eq!(b.retries, 1);
    assert!(!b.class.passive);
    assert_eq!(g.node("A").unwrap().retries, 0);
    assert_eq!(g.node("C").unwrap().class.to_string(), "node-end node-passive");
}

#[test]
fn undeclared_transition_becomes_unexpected_edge() {
    let def = credit_definition();
    // Newest first: A, then C, then current C.
    let wf = Workflow::new("C", vec![Action::new("C"), Action::new("A")]);
    let g = build_graph(&def, Some(&wf));

    let e = g.edge("A", "C").unwrap();
    assert_eq!(e.class.style, EdgeStyle::Unexpected);
    assert!(!e.class.active);
    assert_eq!(e.id, "edge-A-C");
    assert_eq!(g.edge_count(), 4);
}

#[test]
fn trace_states_missing_from_definition_get_exactly_one_node() {
    let def = credit_definition();
    let wf = Workflow::new(
        "ghost",
        vec![
            Action::new("ghost"),
            Action::retry("ghost", 1),
            Action::new("ghost"),
            Action::new("A"),
        ],
    );
    let g = build_graph(&def, Some(&wf));

    assert_eq!(g.node_count(), 4);
    let ghost = g.node("ghost").unwrap();
    assert_eq!(ghost.label, "ghost");
    assert_eq!(ghost.id, "node_ghost");
    assert_eq!(ghost.class.to_string(), "node-normal");
    assert_eq!(ghost.retries, 1);
    assert_eq!(edge_class(&g, "A", "ghost"), "edge-unexpected");
}

#[test]
fn current_state_outside_trace_and_definition_still_gets_a_node() {
    let def = credit_definition();
    let wf = Workflow::new("limbo", Vec::new());
    let g = build_graph(&def, Some(&wf));

    assert!(g.has_node("limbo"));
    assert!(!g.node("limbo").unwrap().class.passive);
    assert!(g.node("A").unwrap().class.passive);
}

#[test]
fn passivity_only_applies_with_a_workflow() {
    let def = credit_definition();
    let without = build_graph(&def, None);
    assert!(without.nodes().all(|n| !n.class.passive));

    let wf = Workflow::new("A", Vec::new());
    let with = build_graph(&def, Some(&wf));
    assert!(!with.node("A").unwrap().class.passive);
    assert!(with.node("B").unwrap().class.passive);
    assert!(with.node("C").unwrap().class.passive);
}

#[test]
fn repeated_states_do_not_create_self_edges() {
    let def = credit_definition();
    let wf = Workflow::new(
        "B",
        vec![
            Action::retry("B", 2),
            Action::retry("B", 1),
            Action::new("B"),
            Action::new("A"),
        ],
    );
    let g = build_graph(&def, Some(&wf));

    assert!(!g.has_edge("B", "B"));
    assert_eq!(edge_class(&g, "A", "B"), "edge-normal active");
    assert_eq!(edge_class(&g, "B", "A"), "edge-error");
    assert_eq!(g.node("B").unwrap().retries, 2);
}

#[test]
fn building_twice_is_deterministic() {
    let def = credit_definition();
    let wf = Workflow::new("C", vec![Action::new("C"), Action::new("B"), Action::new("A")]);
    let a = build_graph(&def, Some(&wf));
    let b = build_graph(&def, Some(&wf));
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn graph_serializes_as_node_and_edge_lists() {
    let g = build_graph(&credit_definition(), None);
    let v = serde_json::to_value(&g).unwrap();
    assert_eq!(v["nodes"][0]["id"], "node_A");
    assert_eq!(v["nodes"][0]["class"], "node-start");
    assert_eq!(v["nodes"][0]["state"]["type"], "start");
    assert_eq!(v["edges"][0]["id"], "edge-A-B");
    assert_eq!(v["edges"][0]["class"], "edge-normal");
}
