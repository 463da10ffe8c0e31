//! The rendering container: owns one scene, its viewport and the node-selected callback.

use crate::layout::LayoutEngine;
use crate::model::{LayoutEdge, LayoutNode, LayoutPoint};
use crate::scene::{RetryBadge, Scene, SceneEdge, SceneNode};
use crate::svg::{SvgRenderOptions, render_scene_svg};
use crate::text::{DeterministicTextMeasurer, TextMeasurer};
use crate::viewport::{ZoomTransform, fit};
use crate::{Error, RenderOptions, Result};
use flowtrace_core::Graph;
use rustc_hash::FxHashMap as HashMap;
use std::sync::Arc;

/// Receives the state id of a clicked node, or `None` for a background click.
pub type NodeSelected = Box<dyn FnMut(Option<&str>)>;

const NODE_CORNER_RADIUS: f64 = 5.0;
const RETRY_BADGE_DY: f64 = -4.0;

pub struct Canvas {
    options: RenderOptions,
    layout: Box<dyn LayoutEngine>,
    text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
    scene: Option<Scene>,
    on_node_selected: Option<NodeSelected>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

impl Canvas {
    pub fn new(options: RenderOptions) -> Self {
        let layout = Box::new(options.dagre_layout());
        Self {
            options,
            layout,
            text_measurer: Arc::new(DeterministicTextMeasurer::default()),
            scene: None,
            on_node_selected: None,
        }
    }

    pub fn with_layout_engine(mut self, engine: impl LayoutEngine + 'static) -> Self {
        self.layout = Box::new(engine);
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn diagram_id(&self) -> &str {
        self.options.diagram_id.as_deref().unwrap_or("flowtrace")
    }

    /// Drops the scene and the callback.
    pub fn clear(&mut self) {
        self.scene = None;
        self.on_node_selected = None;
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    /// Lays out `graph`, paints it into a fresh scene and fits the viewport.
    ///
    /// Whatever was rendered before is discarded, including the previous callback.
    pub fn render(
        &mut self,
        graph: &Graph,
        on_node_selected: impl FnMut(Option<&str>) + 'static,
    ) -> Result<()> {
        self.clear();
        let laid = self.layout.layout(graph, self.text_measurer.as_ref())?;

        let layout_nodes: HashMap<&str, &LayoutNode> =
            laid.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        let layout_edges: HashMap<(&str, &str), &LayoutEdge> = laid
            .edges
            .iter()
            .map(|e| ((e.source.as_str(), e.target.as_str()), e))
            .collect();

        let mut scene = Scene::new(self.diagram_id().to_string());
        scene.font_size = self.options.font_size;

        for edge in graph.edges() {
            let Some(le) = layout_edges.get(&(edge.source.as_str(), edge.target.as_str())) else {
                return Err(Error::InvalidGraph {
                    message: format!("layout engine did not route edge {}", edge.id),
                });
            };
            scene.push_edge(SceneEdge {
                dom_id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                classes: edge.class.tokens().into_iter().collect(),
                arrowhead_class: edge.arrowhead_class(),
                points: le.points.clone(),
            });
        }

        for node in graph.nodes() {
            let Some(ln) = layout_nodes.get(node.state_id()) else {
                return Err(Error::InvalidGraph {
                    message: format!("layout engine did not place node {}", node.id),
                });
            };
            let retry = (node.retries > 0).then(|| RetryBadge {
                count: node.retries,
                dx: ln.width / 2.0,
                dy: RETRY_BADGE_DY,
            });
            scene.push_node(SceneNode {
                dom_id: node.id.clone(),
                state_id: node.state_id().to_string(),
                classes: node.class.tokens().into_iter().collect(),
                x: ln.x,
                y: ln.y,
                width: ln.width,
                height: ln.height,
                rx: NODE_CORNER_RADIUS,
                ry: NODE_CORNER_RADIUS,
                label: node.label.clone(),
                title: node.title(),
                retry,
            });
        }

        let fitted = fit(laid.width, laid.height, self.options.available_width);
        scene.width = self.options.available_width;
        scene.height = fitted.height;
        scene.graph_width = laid.width;
        scene.graph_height = laid.height;
        scene.transform = fitted.transform;

        tracing::debug!(
            nodes = scene.nodes().len(),
            edges = scene.edges().len(),
            height = scene.height,
            transform = %scene.transform,
            "rendered workflow graph"
        );
        self.scene = Some(scene);
        self.on_node_selected = Some(Box::new(on_node_selected));
        Ok(())
    }

    /// Delivers a click at a container-space point.
    ///
    /// Hits the topmost node under the point, otherwise the background. The callback sees the
    /// state id (or `None`) and the same value is returned. Before the first render this is a
    /// no-op returning `None`.
    pub fn click(&mut self, point: LayoutPoint) -> Option<String> {
        let scene = self.scene.as_ref()?;
        let hit = scene
            .node_at(scene.transform.invert(point))
            .map(|n| n.state_id.clone());
        if let Some(cb) = self.on_node_selected.as_mut() {
            cb(hit.as_deref());
        }
        hit
    }

    pub fn transform(&self) -> Option<ZoomTransform> {
        self.scene.as_ref().map(|s| s.transform)
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        if let Some(scene) = self.scene.as_mut() {
            scene.transform = scene.transform.pan(dx, dy);
        }
    }

    pub fn zoom_at(&mut self, anchor: LayoutPoint, factor: f64) {
        let (min_k, max_k) = (self.options.min_zoom, self.options.max_zoom);
        if let Some(scene) = self.scene.as_mut() {
            scene.transform = scene.transform.zoom_at(anchor, factor, min_k, max_k);
        }
    }

    pub fn to_svg(&self) -> Result<String> {
        self.to_svg_with(&SvgRenderOptions {
            font_family: self.options.font_family.clone(),
            xml_declaration: false,
        })
    }

    pub fn to_svg_with(&self, options: &SvgRenderOptions) -> Result<String> {
        let scene = self.scene.as_ref().ok_or(Error::NothingRendered)?;
        Ok(render_scene_svg(scene, options))
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("options", &self.options)
            .field("scene", &self.scene)
            .field("has_callback", &self.on_node_selected.is_some())
            .finish_non_exhaustive()
    }
}

/// Convenience for one-shot rendering without a click handler.
pub fn render_svg(graph: &Graph, options: RenderOptions) -> Result<String> {
    let mut canvas = Canvas::new(options);
    canvas.render(graph, |_| {})?;
    canvas.to_svg()
}
