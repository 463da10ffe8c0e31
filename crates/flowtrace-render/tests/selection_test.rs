use flowtrace_core::{Action, Definition, Graph, State, StateType, Workflow, build_graph};
use flowtrace_render::highlight::{
    mark_all_deselected, mark_current_state, mark_state_selected, set_node_selected,
};
use flowtrace_render::{Canvas, Scene};

fn fixture() -> (Graph, Workflow) {
    let def = Definition::new(
        vec![
            State::new("A", StateType::Start).with_transitions(["B"]),
            State::new("B", StateType::Normal).with_transitions(["C"]),
            State::new("C", StateType::End),
        ],
        Some("A".to_string()),
    );
    let wf = Workflow::new(
        "B",
        vec![Action::new("A"), Action::new("B"), Action::retry("B", 1)],
    );
    (build_graph(&def, Some(&wf)), wf)
}

fn rendered(graph: &Graph) -> Canvas {
    let mut canvas = Canvas::default();
    canvas.render(graph, |_| {}).unwrap();
    canvas
}

fn selected(scene: &Scene) -> Vec<String> {
    let nodes = scene.nodes().iter().map(|n| (&n.dom_id, &n.classes));
    let edges = scene.edges().iter().map(|e| (&e.dom_id, &e.classes));
    nodes
        .chain(edges)
        .filter(|(_, c)| c.contains("selected"))
        .map(|(id, _)| id.clone())
        .collect()
}

#[test]
fn selecting_a_node_marks_its_edges_in_both_directions() {
    let (g, _) = fixture();
    let mut canvas = rendered(&g);
    let scene = canvas.scene_mut().unwrap();

    mark_state_selected(&g, scene, Some("B"));
    assert_eq!(
        selected(scene),
        vec!["node_B", "edge-A-B", "edge-B-C", "edge-B-A"]
    );
}

#[test]
fn reselecting_moves_the_selection() {
    let (g, _) = fixture();
    let mut canvas = rendered(&g);
    let scene = canvas.scene_mut().unwrap();

    mark_state_selected(&g, scene, Some("B"));
    mark_state_selected(&g, scene, Some("A"));
    assert_eq!(selected(scene), vec!["node_A", "edge-A-B", "edge-B-A"]);

    mark_state_selected(&g, scene, None);
    assert!(selected(scene).is_empty());
}

#[test]
fn deselect_restores_original_class_lists() {
    let (g, wf) = fixture();
    let mut canvas = rendered(&g);
    let scene = canvas.scene_mut().unwrap();
    mark_current_state(scene, &wf);
    let before = scene.clone();

    set_node_selected(&g, scene, "B", true);
    assert_eq!(
        scene.classes("node_B").unwrap().to_string(),
        "node-normal current-state selected"
    );
    assert_eq!(
        scene.classes("edge-A-B").unwrap().to_string(),
        "edge-normal active selected"
    );
    mark_all_deselected(&g, scene);
    assert_eq!(*scene, before);
}

#[test]
fn current_state_is_independent_of_selection() {
    let (g, wf) = fixture();
    let mut canvas = rendered(&g);
    let scene = canvas.scene_mut().unwrap();

    mark_current_state(scene, &wf);
    mark_state_selected(&g, scene, Some("A"));
    mark_state_selected(&g, scene, None);
    assert!(scene.has_class("node_B", "current-state"));
    assert!(!scene.has_class("node_A", "current-state"));
}

#[test]
fn unknown_ids_are_ignored() {
    let (g, _) = fixture();
    let mut canvas = rendered(&g);
    let before = canvas.scene().unwrap().clone();
    let scene = canvas.scene_mut().unwrap();

    set_node_selected(&g, scene, "nope", true);
    mark_current_state(scene, &Workflow::new("nope", vec![]));
    assert_eq!(*scene, before);
}

#[test]
fn selection_shows_up_in_serialized_svg() {
    let (g, _) = fixture();
    let mut canvas = rendered(&g);
    mark_state_selected(&g, canvas.scene_mut().unwrap(), Some("C"));

    let svg = canvas.to_svg().unwrap();
    let doc = roxmltree::Document::parse(&svg).unwrap();
    let class_of = |id: &str| {
        doc.descendants()
            .find(|n| n.attribute("id") == Some(id))
            .and_then(|n| n.attribute("class"))
            .map(str::to_string)
    };
    assert_eq!(class_of("node_C").as_deref(), Some("node-end node-passive selected"));
    assert_eq!(class_of("edge-B-C").as_deref(), Some("edge-normal selected"));
    assert_eq!(class_of("edge-A-B").as_deref(), Some("edge-normal active"));
}

#[test]
fn hyphenated_state_ids_keep_separate_edge_elements() {
    let def = Definition::new(
        vec![
            State::new("a-b", StateType::Start).with_transitions(["c"]),
            State::new("a", StateType::Normal).with_transitions(["b-c"]),
            State::new("c", StateType::End),
            State::new("b-c", StateType::End),
        ],
        None,
    );
    let g = build_graph(&def, None);
    let mut canvas = rendered(&g);
    let scene = canvas.scene_mut().unwrap();
    assert_eq!(scene.edges().len(), 2);

    mark_state_selected(&g, scene, Some("a"));
    assert_eq!(selected(scene), vec!["node_a", "edge-a-b%2Dc"]);
    assert!(!scene.has_class("edge-a%2Db-c", "selected"));
}
