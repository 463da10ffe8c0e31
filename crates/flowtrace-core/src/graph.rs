//! Abstract state graph handed to the layout/paint capability.
//!
//! Plain data: an insertion-ordered node map, an insertion-ordered edge map keyed by
//! `(source, target)`, and an adjacency list. No layout or DOM state lives here.

use crate::model::{State, StateType};
use indexmap::IndexMap;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;

pub fn node_dom_id(state_id: &str) -> String {
    format!("node_{state_id}")
}

/// `-` separates the endpoints, so it is percent-escaped inside them (with `%` itself).
const EDGE_ID_SEGMENT: &AsciiSet = &CONTROLS.add(b'%').add(b'-').add(b' ');

/// `edge-<source>-<target>`, unique per `(source, target)` pair even when ids contain `-`.
pub fn edge_dom_id(source: &str, target: &str) -> String {
    format!(
        "edge-{}-{}",
        utf8_percent_encode(source, EDGE_ID_SEGMENT),
        utf8_percent_encode(target, EDGE_ID_SEGMENT)
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStyle {
    Start,
    Normal,
    Manual,
    End,
    Error,
}

impl NodeStyle {
    pub fn from_state_type(state_type: Option<&StateType>) -> Self {
        match state_type {
            Some(StateType::Start) => NodeStyle::Start,
            Some(StateType::Manual) => NodeStyle::Manual,
            Some(StateType::End) => NodeStyle::End,
            Some(StateType::Error) => NodeStyle::Error,
            Some(StateType::Normal) | Some(StateType::Other(_)) | None => NodeStyle::Normal,
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            NodeStyle::Start => "node-start",
            NodeStyle::Normal => "node-normal",
            NodeStyle::Manual => "node-manual",
            NodeStyle::End => "node-end",
            NodeStyle::Error => "node-error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeClass {
    pub style: NodeStyle,
    pub passive: bool,
}

impl NodeClass {
    /// Individual class tokens, in the order they appear in the `class` attribute.
    pub fn tokens(&self) -> Vec<&'static str> {
        let mut out = vec![self.style.css_class()];
        if self.passive {
            out.push("node-passive");
        }
        out
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.style.css_class())?;
        if self.passive {
            f.write_str(" node-passive")?;
        }
        Ok(())
    }
}

impl Serialize for NodeClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeStyle {
    Normal,
    Error,
    Unexpected,
}

impl EdgeStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeStyle::Normal => "normal",
            EdgeStyle::Error => "error",
            EdgeStyle::Unexpected => "unexpected",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            EdgeStyle::Normal => "edge-normal",
            EdgeStyle::Error => "edge-error",
            EdgeStyle::Unexpected => "edge-unexpected",
        }
    }

    pub fn arrowhead_class(self) -> &'static str {
        match self {
            EdgeStyle::Normal => "arrowhead-normal",
            EdgeStyle::Error => "arrowhead-error",
            EdgeStyle::Unexpected => "arrowhead-unexpected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeClass {
    pub style: EdgeStyle,
    /// Set when the execution trace walked this edge.
    pub active: bool,
}

impl EdgeClass {
    pub fn new(style: EdgeStyle) -> Self {
        Self {
            style,
            active: false,
        }
    }

    pub fn tokens(&self) -> Vec<&'static str> {
        let mut out = vec![self.style.css_class()];
        if self.active {
            out.push("active");
        }
        out
    }
}

impl fmt::Display for EdgeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.style.css_class())?;
        if self.active {
            f.write_str(" active")?;
        }
        Ok(())
    }
}

impl Serialize for EdgeClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    /// DOM id (`node_<state id>`).
    pub id: String,
    pub label: String,
    pub class: NodeClass,
    pub retries: u32,
    pub state: State,
}

impl Node {
    pub fn state_id(&self) -> &str {
        &self.state.id
    }

    /// Hover text: `"<Type> state\n<description>"`.
    pub fn title(&self) -> String {
        let type_name = self
            .state
            .state_type
            .as_ref()
            .map(|t| capitalize(t.as_str()))
            .unwrap_or_default();
        format!("{type_name} state\n{}", self.state.description)
    }
}

fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    /// DOM id, see [`edge_dom_id`].
    pub id: String,
    pub source: String,
    pub target: String,
    pub class: EdgeClass,
}

impl Edge {
    pub fn arrowhead_class(&self) -> &'static str {
        self.class.style.arrowhead_class()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: IndexMap<String, Node>,
    edges: IndexMap<(String, String), Edge>,
    out_adj: IndexMap<String, Vec<String>>,
    in_adj: IndexMap<String, Vec<String>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Inserts or replaces the node keyed by `state_id`. Replacing keeps its position.
    pub fn set_node(&mut self, state_id: impl Into<String>, node: Node) {
        let state_id = state_id.into();
        self.out_adj.entry(state_id.clone()).or_default();
        self.in_adj.entry(state_id.clone()).or_default();
        self.nodes.insert(state_id, node);
    }

    pub fn has_node(&self, state_id: &str) -> bool {
        self.nodes.contains_key(state_id)
    }

    pub fn node(&self, state_id: &str) -> Option<&Node> {
        self.nodes.get(state_id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Inserts or replaces the edge `source -> target`. Endpoints must already be nodes.
    pub fn set_edge(&mut self, source: &str, target: &str, class: EdgeClass) {
        debug_assert!(self.has_node(source) && self.has_node(target));
        let key = (source.to_string(), target.to_string());
        if !self.edges.contains_key(&key) {
            self.out_adj
                .entry(source.to_string())
                .or_default()
                .push(target.to_string());
            self.in_adj
                .entry(target.to_string())
                .or_default()
                .push(source.to_string());
        }
        self.edges.insert(
            key,
            Edge {
                id: edge_dom_id(source, target),
                source: source.to_string(),
                target: target.to_string(),
                class,
            },
        );
    }

    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.edges
            .contains_key(&(source.to_string(), target.to_string()))
    }

    pub fn edge(&self, source: &str, target: &str) -> Option<&Edge> {
        self.edges.get(&(source.to_string(), target.to_string()))
    }

    pub fn edge_mut(&mut self, source: &str, target: &str) -> Option<&mut Edge> {
        self.edges
            .get_mut(&(source.to_string(), target.to_string()))
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn successors(&self, state_id: &str) -> &[String] {
        self.out_adj.get(state_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn predecessors(&self, state_id: &str) -> &[String] {
        self.in_adj.get(state_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every edge incident to `state_id`, incoming first, then outgoing. A self-loop is
    /// reported once.
    pub fn node_edges(&self, state_id: &str) -> Vec<&Edge> {
        let mut out: Vec<&Edge> = Vec::new();
        for src in self.predecessors(state_id) {
            if let Some(e) = self.edge(src, state_id) {
                out.push(e);
            }
        }
        for trg in self.successors(state_id) {
            if trg == state_id {
                continue;
            }
            if let Some(e) = self.edge(state_id, trg) {
                out.push(e);
            }
        }
        out
    }
}

impl Serialize for Graph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let nodes: Vec<&Node> = self.nodes.values().collect();
        let edges: Vec<&Edge> = self.edges.values().collect();
        let mut st = serializer.serialize_struct("Graph", 2)?;
        st.serialize_field("nodes", &nodes)?;
        st.serialize_field("edges", &edges)?;
        st.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_node(id: &str) -> Node {
        Node {
            id: node_dom_id(id),
            label: id.to_string(),
            class: NodeClass {
                style: NodeStyle::Normal,
                passive: false,
            },
            retries: 0,
            state: State::placeholder(id),
        }
    }

    #[test]
    fn set_edge_twice_replaces_attributes_without_duplicating_adjacency() {
        let mut g = Graph::new();
        g.set_node("a", plain_node("a"));
        g.set_node("b", plain_node("b"));
        g.set_edge("a", "b", EdgeClass::new(EdgeStyle::Normal));
        g.set_edge("a", "b", EdgeClass::new(EdgeStyle::Error));

        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.successors("a"), ["b".to_string()]);
        assert_eq!(g.edge("a", "b").unwrap().class.to_string(), "edge-error");
        assert_eq!(g.edge("a", "b").unwrap().id, "edge-a-b");
    }

    #[test]
    fn node_edges_covers_both_directions_and_self_loops_once() {
        let mut g = Graph::new();
        for id in ["a", "b", "c"] {
            g.set_node(id, plain_node(id));
        }
        g.set_edge("a", "b", EdgeClass::new(EdgeStyle::Normal));
        g.set_edge("b", "c", EdgeClass::new(EdgeStyle::Normal));
        g.set_edge("b", "b", EdgeClass::new(EdgeStyle::Normal));

        let ids: Vec<&str> = g.node_edges("b").iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["edge-a-b", "edge-b-b", "edge-b-c"]);
    }

    #[test]
    fn hyphenated_ids_get_distinct_edge_ids() {
        assert_eq!(edge_dom_id("a", "b"), "edge-a-b");
        assert_eq!(edge_dom_id("a-b", "c"), "edge-a%2Db-c");
        assert_ne!(edge_dom_id("a-b", "c"), edge_dom_id("a", "b-c"));
        assert_ne!(edge_dom_id("a%2D", "b"), edge_dom_id("a-", "b"));

        let mut g = Graph::new();
        for id in ["a-b", "c", "a", "b-c"] {
            g.set_node(id, plain_node(id));
        }
        g.set_edge("a-b", "c", EdgeClass::new(EdgeStyle::Normal));
        g.set_edge("a", "b-c", EdgeClass::new(EdgeStyle::Error));
        let ids: Vec<&str> = g.edges().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["edge-a%2Db-c", "edge-a-b%2Dc"]);
    }

    #[test]
    fn class_strings_match_stylesheet_tokens() {
        let mut class = EdgeClass::new(EdgeStyle::Unexpected);
        assert_eq!(class.to_string(), "edge-unexpected");
        class.active = true;
        assert_eq!(class.to_string(), "edge-unexpected active");
        assert_eq!(class.tokens(), ["edge-unexpected", "active"]);

        let node = NodeClass {
            style: NodeStyle::Manual,
            passive: true,
        };
        assert_eq!(node.to_string(), "node-manual node-passive");
    }

    #[test]
    fn title_capitalizes_type() {
        let mut node = plain_node("x");
        node.state = State::new("x", StateType::Manual).with_description("Wait for approval");
        assert_eq!(node.title(), "Manual state\nWait for approval");
    }
}
