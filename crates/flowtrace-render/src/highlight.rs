//! Selection and current-state marking on an already rendered scene.

use crate::scene::Scene;
use flowtrace_core::graph::{edge_dom_id, node_dom_id};
use flowtrace_core::{Graph, Workflow};

pub const SELECTED_CLASS: &str = "selected";
pub const CURRENT_STATE_CLASS: &str = "current-state";

/// Toggles `selected` on a node and on every edge touching it, in both directions.
pub fn set_node_selected(graph: &Graph, scene: &mut Scene, node_id: &str, is_selected: bool) {
    for edge in graph.node_edges(node_id) {
        scene.set_class(
            &edge_dom_id(&edge.source, &edge.target),
            SELECTED_CLASS,
            is_selected,
        );
    }
    scene.set_class(&node_dom_id(node_id), SELECTED_CLASS, is_selected);
}

pub fn mark_all_deselected(graph: &Graph, scene: &mut Scene) {
    for id in graph.node_ids() {
        set_node_selected(graph, scene, id, false);
    }
}

/// Leaves at most `node_id` (and its edges) selected. `None` only clears the selection.
pub fn mark_state_selected(graph: &Graph, scene: &mut Scene, node_id: Option<&str>) {
    mark_all_deselected(graph, scene);
    if let Some(id) = node_id {
        set_node_selected(graph, scene, id, true);
    }
}

pub fn mark_current_state(scene: &mut Scene, workflow: &Workflow) {
    scene.set_class(&node_dom_id(&workflow.state), CURRENT_STATE_CLASS, true);
}
