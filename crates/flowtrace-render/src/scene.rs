//! Retained element tree produced by one render.
//!
//! Elements are addressed by DOM id (`node_<state>` / `edge-<source>-<target>`) and carry an
//! ordered class list, so selection changes made after painting show up in the serialized
//! SVG exactly as a browser would reflect them.

use crate::model::LayoutPoint;
use crate::viewport::ZoomTransform;
use rustc_hash::FxHashMap as HashMap;
use std::fmt;

/// Ordered, duplicate-free list of CSS class tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassList(Vec<String>);

impl ClassList {
    pub fn parse(raw: &str) -> Self {
        let mut out = Self::default();
        for token in raw.split_whitespace() {
            out.add(token);
        }
        out
    }

    pub fn add(&mut self, class: &str) {
        if !self.contains(class) {
            self.0.push(class.to_string());
        }
    }

    pub fn remove(&mut self, class: &str) {
        self.0.retain(|c| c != class);
    }

    /// `d3.classed(class, on)`.
    pub fn set(&mut self, class: &str, on: bool) {
        if on {
            self.add(class);
        } else {
            self.remove(class);
        }
    }

    pub fn contains(&self, class: &str) -> bool {
        self.0.iter().any(|c| c == class)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ClassList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

impl<'a> FromIterator<&'a str> for ClassList {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let mut out = Self::default();
        for token in iter {
            out.add(token);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryBadge {
    pub count: u32,
    /// Offset of the badge group relative to the node center.
    pub dx: f64,
    pub dy: f64,
}

impl RetryBadge {
    pub fn title(&self) -> String {
        format!("State was retried {} times.", self.count)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub dom_id: String,
    pub state_id: String,
    pub classes: ClassList,
    /// Box center in graph coordinates.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rx: f64,
    pub ry: f64,
    pub label: String,
    pub title: String,
    pub retry: Option<RetryBadge>,
}

impl SceneNode {
    pub fn contains(&self, p: LayoutPoint) -> bool {
        (p.x - self.x).abs() <= self.width / 2.0 && (p.y - self.y).abs() <= self.height / 2.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneEdge {
    pub dom_id: String,
    pub source: String,
    pub target: String,
    pub classes: ClassList,
    pub arrowhead_class: &'static str,
    /// Route in graph coordinates, first point on the source boundary.
    pub points: Vec<LayoutPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementRef {
    Node(usize),
    Edge(usize),
}

/// Everything one render painted: background, edges, nodes and the viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub diagram_id: String,
    /// Container size in pixels (`width` is the available width).
    pub width: f64,
    pub height: f64,
    /// Extent of the laid-out graph before the viewport transform.
    pub graph_width: f64,
    pub graph_height: f64,
    pub font_size: f64,
    pub transform: ZoomTransform,
    edges: Vec<SceneEdge>,
    nodes: Vec<SceneNode>,
    index: HashMap<String, ElementRef>,
}

impl Scene {
    pub(crate) fn new(diagram_id: String) -> Self {
        Self {
            diagram_id,
            width: 0.0,
            height: 0.0,
            graph_width: 0.0,
            graph_height: 0.0,
            font_size: 14.0,
            transform: ZoomTransform::IDENTITY,
            edges: Vec::new(),
            nodes: Vec::new(),
            index: HashMap::default(),
        }
    }

    pub(crate) fn push_node(&mut self, node: SceneNode) {
        self.index
            .insert(node.dom_id.clone(), ElementRef::Node(self.nodes.len()));
        self.nodes.push(node);
    }

    pub(crate) fn push_edge(&mut self, edge: SceneEdge) {
        self.index
            .insert(edge.dom_id.clone(), ElementRef::Edge(self.edges.len()));
        self.edges.push(edge);
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[SceneEdge] {
        &self.edges
    }

    pub fn node(&self, dom_id: &str) -> Option<&SceneNode> {
        match self.index.get(dom_id)? {
            ElementRef::Node(i) => self.nodes.get(*i),
            ElementRef::Edge(_) => None,
        }
    }

    pub fn edge(&self, dom_id: &str) -> Option<&SceneEdge> {
        match self.index.get(dom_id)? {
            ElementRef::Edge(i) => self.edges.get(*i),
            ElementRef::Node(_) => None,
        }
    }

    /// Class list of the element with the given DOM id.
    pub fn classes(&self, dom_id: &str) -> Option<&ClassList> {
        match *self.index.get(dom_id)? {
            ElementRef::Node(i) => self.nodes.get(i).map(|n| &n.classes),
            ElementRef::Edge(i) => self.edges.get(i).map(|e| &e.classes),
        }
    }

    pub fn classes_mut(&mut self, dom_id: &str) -> Option<&mut ClassList> {
        match *self.index.get(dom_id)? {
            ElementRef::Node(i) => self.nodes.get_mut(i).map(|n| &mut n.classes),
            ElementRef::Edge(i) => self.edges.get_mut(i).map(|e| &mut e.classes),
        }
    }

    /// Toggles `class` on one element. Unknown ids are ignored; returns whether it matched.
    pub fn set_class(&mut self, dom_id: &str, class: &str, on: bool) -> bool {
        match self.classes_mut(dom_id) {
            Some(list) => {
                list.set(class, on);
                true
            }
            None => false,
        }
    }

    pub fn has_class(&self, dom_id: &str, class: &str) -> bool {
        self.classes(dom_id).is_some_and(|c| c.contains(class))
    }

    /// Topmost node under a point in graph coordinates. Later nodes paint over earlier ones.
    pub fn node_at(&self, p: LayoutPoint) -> Option<&SceneNode> {
        self.nodes.iter().rev().find(|n| n.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_list_keeps_insertion_order_and_restores_on_remove() {
        let mut list = ClassList::parse("edge-normal active");
        let before = list.clone();
        list.add("selected");
        list.add("selected");
        assert_eq!(list.to_string(), "edge-normal active selected");
        list.remove("selected");
        assert_eq!(list, before);
    }

    #[test]
    fn set_class_on_unknown_id_is_a_noop() {
        let mut scene = Scene::new("t".into());
        scene.push_node(SceneNode {
            dom_id: "node_A".into(),
            state_id: "A".into(),
            classes: ClassList::parse("node-start"),
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            rx: 5.0,
            ry: 5.0,
            label: "A".into(),
            title: String::new(),
            retry: None,
        });
        assert!(!scene.set_class("node_missing", "selected", true));
        assert!(scene.set_class("node_A", "selected", true));
        assert!(scene.has_class("node_A", "selected"));
        assert!(scene.edge("node_A").is_none());
    }
}
