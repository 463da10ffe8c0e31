//! Layout capability for state graphs.
//!
//! The default engine hands the graph to `dugong` (a dagre port): greedy cycle breaking,
//! rank assignment and coordinate placement top to bottom. Self-loops stay out of the dagre
//! graph and are routed on the right side of their node afterwards.

use crate::model::{Bounds, LayoutEdge, LayoutNode, LayoutPoint, LayoutedGraph};
use crate::text::{TextMeasurer, TextStyle};
use crate::{Error, Result};
use dugong::graphlib::GraphOptions;
use dugong::{EdgeLabel, GraphLabel, NodeLabel, RankDir};
use flowtrace_core::Graph;
use rustc_hash::FxHashSet as HashSet;

/// Positions the nodes and routes the edges of an abstract graph.
pub trait LayoutEngine {
    fn layout(&self, graph: &Graph, measurer: &dyn TextMeasurer) -> Result<LayoutedGraph>;
}

type DagreGraph = dugong::graphlib::Graph<NodeLabel, EdgeLabel, GraphLabel>;

#[derive(Debug, Clone)]
pub struct DagreLayout {
    pub rank_sep: f64,
    pub node_sep: f64,
    pub edge_sep: f64,
    pub margin: f64,
    pub padding_x: f64,
    pub padding_y: f64,
    pub text_style: TextStyle,
}

impl Default for DagreLayout {
    fn default() -> Self {
        Self {
            rank_sep: 50.0,
            node_sep: 50.0,
            edge_sep: 20.0,
            margin: 0.0,
            padding_x: 10.0,
            padding_y: 10.0,
            text_style: TextStyle::default(),
        }
    }
}

impl LayoutEngine for DagreLayout {
    fn layout(&self, graph: &Graph, measurer: &dyn TextMeasurer) -> Result<LayoutedGraph> {
        let mut g = self.dagre_graph(graph, measurer)?;

        dugong::acyclic::run(&mut g);
        // Keys are in the original direction.
        let reversed: HashSet<(String, String)> = g
            .edges()
            .filter(|e| g.edge_by_key(e).is_some_and(|lbl| lbl.reversed))
            .map(|e| (e.w.clone(), e.v.clone()))
            .collect();
        dugong::layout(&mut g);
        dugong::acyclic::undo(&mut g);

        let mut nodes: Vec<LayoutNode> = Vec::with_capacity(graph.node_count());
        for node in graph.nodes() {
            let id = node.state_id();
            let placed = g.node(id).and_then(|n| Some((n.x?, n.y?, n.width, n.height)));
            let Some((x, y, width, height)) = placed else {
                return Err(Error::InvalidGraph {
                    message: format!("dagre left node {} unplaced", node.id),
                });
            };
            nodes.push(LayoutNode {
                id: id.to_string(),
                x,
                y,
                width,
                height,
            });
        }

        let mut edges: Vec<LayoutEdge> = Vec::with_capacity(graph.edge_count());
        for e in graph.edges() {
            let points = if e.source == e.target {
                let Some(n) = nodes.iter().find(|n| n.id == e.source) else {
                    return Err(Error::InvalidGraph {
                        message: format!("edge {} references an unknown node", e.id),
                    });
                };
                self.self_loop(n)
            } else {
                let Some(lbl) = g.edge(&e.source, &e.target, None) else {
                    return Err(Error::InvalidGraph {
                        message: format!("dagre did not route edge {}", e.id),
                    });
                };
                let was_reversed = reversed.contains(&(e.source.clone(), e.target.clone()));
                let mut points: Vec<LayoutPoint> =
                    lbl.points.iter().map(|p| LayoutPoint::new(p.x, p.y)).collect();
                if was_reversed {
                    points.reverse();
                }
                // Opposite edges between the same pair would overlap otherwise.
                if graph.has_edge(&e.target, &e.source) {
                    let dx = if was_reversed {
                        self.edge_sep / 2.0
                    } else {
                        -self.edge_sep / 2.0
                    };
                    let inner = points.len().saturating_sub(1);
                    for p in points.iter_mut().take(inner).skip(1) {
                        p.x += dx;
                    }
                }
                points
            };
            edges.push(LayoutEdge {
                source: e.source.clone(),
                target: e.target.clone(),
                points,
            });
        }

        let mut out = LayoutedGraph {
            nodes,
            edges,
            width: 0.0,
            height: 0.0,
        };
        self.translate_to_origin(&mut out);
        tracing::debug!(
            nodes = out.nodes.len(),
            edges = out.edges.len(),
            width = out.width,
            height = out.height,
            "dagre layout done"
        );
        Ok(out)
    }
}

impl DagreLayout {
    fn dagre_graph(&self, graph: &Graph, measurer: &dyn TextMeasurer) -> Result<DagreGraph> {
        let mut g = DagreGraph::new(GraphOptions {
            multigraph: true,
            compound: false,
        });
        g.set_graph(GraphLabel {
            rankdir: RankDir::TB,
            nodesep: self.node_sep,
            ranksep: self.rank_sep,
            edgesep: self.edge_sep,
            acyclicer: Some("greedy".to_string()),
            ..GraphLabel::default()
        });

        for node in graph.nodes() {
            let metrics = measurer.measure(&node.label, &self.text_style);
            g.set_node(
                node.state_id(),
                NodeLabel {
                    width: metrics.width + 2.0 * self.padding_x,
                    height: metrics.height + 2.0 * self.padding_y,
                    ..NodeLabel::default()
                },
            );
        }

        for e in graph.edges() {
            if !(g.has_node(&e.source) && g.has_node(&e.target)) {
                return Err(Error::InvalidGraph {
                    message: format!("edge {} references an unknown node", e.id),
                });
            }
            if e.source == e.target {
                continue;
            }
            g.set_edge_named(
                e.source.as_str(),
                e.target.as_str(),
                None::<String>,
                Some(EdgeLabel {
                    minlen: 1,
                    weight: 1.0,
                    ..EdgeLabel::default()
                }),
            );
        }
        Ok(g)
    }

    fn self_loop(&self, n: &LayoutNode) -> Vec<LayoutPoint> {
        let right = n.x + n.width / 2.0;
        vec![
            LayoutPoint::new(right, n.y - n.height / 4.0),
            LayoutPoint::new(right + self.edge_sep, n.y - n.height / 2.0),
            LayoutPoint::new(right + self.edge_sep, n.y + n.height / 2.0),
            LayoutPoint::new(right, n.y + n.height / 4.0),
        ]
    }

    fn translate_to_origin(&self, out: &mut LayoutedGraph) {
        let corners = out.nodes.iter().flat_map(|n| {
            [
                (n.x - n.width / 2.0, n.y - n.height / 2.0),
                (n.x + n.width / 2.0, n.y + n.height / 2.0),
            ]
        });
        let points = out
            .edges
            .iter()
            .flat_map(|e| e.points.iter().map(|p| (p.x, p.y)));
        let Some(bounds) = Bounds::from_points(corners.chain(points)) else {
            return;
        };

        let dx = self.margin - bounds.min_x;
        let dy = self.margin - bounds.min_y;
        for n in &mut out.nodes {
            n.x += dx;
            n.y += dy;
        }
        for e in &mut out.edges {
            for p in &mut e.points {
                p.x += dx;
                p.y += dy;
            }
        }
        out.width = bounds.width() + 2.0 * self.margin;
        out.height = bounds.height() + 2.0 * self.margin;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::DeterministicTextMeasurer;
    use flowtrace_core::{Action, Definition, State, StateType, Workflow, build_graph};

    fn layout(def: &Definition, wf: Option<&Workflow>) -> LayoutedGraph {
        let g = build_graph(def, wf);
        DagreLayout::default()
            .layout(&g, &DeterministicTextMeasurer::default())
            .unwrap()
    }

    fn chain_definition() -> Definition {
        Definition::new(
            vec![
                State::new("begin", StateType::Start).with_transitions(["process"]),
                State::new("process", StateType::Normal).with_transitions(["done"]),
                State::new("done", StateType::End),
            ],
            None,
        )
    }

    fn on_boundary(p: LayoutPoint, n: &LayoutNode) -> bool {
        (p.y - (n.y - n.height / 2.0)).abs() < 1e-6 || (p.y - (n.y + n.height / 2.0)).abs() < 1e-6
    }

    #[test]
    fn chain_is_stacked_top_to_bottom() {
        let out = layout(&chain_definition(), None);
        let begin = out.node("begin").unwrap();
        let process = out.node("process").unwrap();
        let done = out.node("done").unwrap();
        assert!(begin.y < process.y && process.y < done.y);
        assert!((begin.x - process.x).abs() < 1e-6);
        assert!(out.width > 0.0 && out.height > 0.0);
    }

    #[test]
    fn edges_start_and_end_on_node_boundaries() {
        let out = layout(&chain_definition(), None);
        let e = out.edge("begin", "process").unwrap();
        let begin = out.node("begin").unwrap();
        let process = out.node("process").unwrap();
        let first = e.points[0];
        let last = e.points[e.points.len() - 1];
        assert!((first.y - (begin.y + begin.height / 2.0)).abs() < 1e-6);
        assert!((last.y - (process.y - process.height / 2.0)).abs() < 1e-6);
    }

    #[test]
    fn cycles_keep_edge_direction_and_separate_twins() {
        let def = Definition::new(
            vec![
                State::new("a", StateType::Start).with_transitions(["b"]),
                State::new("b", StateType::Normal).with_transitions(["a"]),
            ],
            None,
        );
        let out = layout(&def, None);
        let a = out.node("a").unwrap();
        let b = out.node("b").unwrap();
        assert!((a.y - b.y).abs() > 1.0);

        let ab = out.edge("a", "b").unwrap();
        let ba = out.edge("b", "a").unwrap();
        assert!(on_boundary(ab.points[0], a));
        assert!(on_boundary(ab.points[ab.points.len() - 1], b));
        assert!(on_boundary(ba.points[0], b));
        assert!(on_boundary(ba.points[ba.points.len() - 1], a));
        assert!((ab.points[1].x - ba.points[1].x).abs() > 1.0);
    }

    #[test]
    fn layout_fits_inside_reported_size() {
        let def = Definition::new(
            vec![
                State::new("begin", StateType::Start).with_transitions(["x", "y", "z"]),
                State::new("x", StateType::Normal).with_transitions(["done"]),
                State::new("y", StateType::Normal).with_transitions(["y", "done"]),
                State::new("z", StateType::Manual).with_transitions(["done"]),
                State::new("done", StateType::End),
                State::new("error", StateType::Error),
            ],
            Some("error".to_string()),
        );
        let wf = Workflow::new("done", vec![Action::new("done"), Action::new("begin")]);
        let out = layout(&def, Some(&wf));
        for n in &out.nodes {
            assert!(n.x - n.width / 2.0 >= -1e-6);
            assert!(n.y - n.height / 2.0 >= -1e-6);
            assert!(n.x + n.width / 2.0 <= out.width + 1e-6);
            assert!(n.y + n.height / 2.0 <= out.height + 1e-6);
        }
        for e in &out.edges {
            for p in &e.points {
                assert!(p.x >= -1e-6 && p.x <= out.width + 1e-6);
            }
        }
        let self_loop = out.edge("y", "y").unwrap();
        assert_eq!(self_loop.points.len(), 4);
    }

    #[test]
    fn long_chains_lay_out_without_recursion() {
        let n = 2000;
        let states: Vec<State> = (0..n)
            .map(|i| {
                let state = State::new(format!("s{i}"), StateType::Normal);
                if i + 1 < n {
                    state.with_transitions([format!("s{}", i + 1)])
                } else {
                    state
                }
            })
            .collect();
        let out = layout(&Definition::new(states, None), None);
        assert_eq!(out.nodes.len(), n);
        assert!(out.node("s0").unwrap().y < out.node("s1999").unwrap().y);
    }

    #[test]
    fn layout_is_deterministic() {
        let def = chain_definition();
        assert_eq!(layout(&def, None), layout(&def, None));
    }

    #[test]
    fn empty_graph_lays_out_to_nothing() {
        let out = layout(&Definition::default(), None);
        assert!(out.nodes.is_empty());
        assert_eq!(out.width, 0.0);
    }
}
