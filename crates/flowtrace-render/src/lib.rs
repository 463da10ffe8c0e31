#![forbid(unsafe_code)]

//! Headless layout, painting and selection highlighting for workflow state graphs.

pub mod canvas;
pub mod highlight;
pub mod layout;
pub mod model;
pub mod scene;
pub mod svg;
pub mod text;
pub mod viewport;

pub use canvas::{Canvas, NodeSelected};
pub use layout::{DagreLayout, LayoutEngine};
pub use scene::{ClassList, Scene};
pub use viewport::ZoomTransform;

use crate::text::TextStyle;
use flowtrace_core::ExplorerConfig;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid graph: {message}")]
    InvalidGraph { message: String },
    #[error("nothing has been rendered into the canvas yet")]
    NothingRendered,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Knobs for layout and viewport fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Width of the hosting container in pixels.
    pub available_width: f64,
    pub padding_x: f64,
    pub padding_y: f64,
    pub rank_sep: f64,
    pub node_sep: f64,
    pub edge_sep: f64,
    pub font_size: f64,
    pub font_family: Option<String>,
    /// Inclusive zoom scale extent for pan/zoom gestures.
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Root `id` of the emitted SVG; scopes the stylesheet and marker ids.
    pub diagram_id: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            available_width: 1000.0,
            padding_x: 10.0,
            padding_y: 10.0,
            rank_sep: 50.0,
            node_sep: 50.0,
            edge_sep: 20.0,
            font_size: 14.0,
            font_family: None,
            min_zoom: 0.1,
            max_zoom: 4.0,
            diagram_id: None,
        }
    }
}

impl RenderOptions {
    /// Reads overrides from the `graph.*` keys of an explorer config; absent keys keep defaults.
    pub fn from_config(config: &ExplorerConfig) -> Self {
        let mut out = Self::default();
        let num = |key: &str, slot: &mut f64| {
            if let Some(v) = config.get_f64(key).filter(|v| v.is_finite()) {
                *slot = v;
            }
        };
        num("graph.width", &mut out.available_width);
        num("graph.paddingX", &mut out.padding_x);
        num("graph.paddingY", &mut out.padding_y);
        num("graph.rankSep", &mut out.rank_sep);
        num("graph.nodeSep", &mut out.node_sep);
        num("graph.edgeSep", &mut out.edge_sep);
        num("graph.fontSize", &mut out.font_size);
        num("graph.minZoom", &mut out.min_zoom);
        num("graph.maxZoom", &mut out.max_zoom);
        if let Some(family) = config.get_str("graph.fontFamily") {
            out.font_family = Some(family.to_string());
        }
        if let Some(id) = config.get_str("graph.diagramId") {
            out.diagram_id = Some(id.to_string());
        }
        if out.min_zoom > out.max_zoom {
            std::mem::swap(&mut out.min_zoom, &mut out.max_zoom);
        }
        out
    }

    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            font_family: self.font_family.clone(),
            font_size: self.font_size,
        }
    }

    pub fn dagre_layout(&self) -> DagreLayout {
        DagreLayout {
            rank_sep: self.rank_sep,
            node_sep: self.node_sep,
            edge_sep: self.edge_sep,
            padding_x: self.padding_x,
            padding_y: self.padding_y,
            text_style: self.text_style(),
            ..DagreLayout::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_overrides_graph_keys_only() {
        let cfg = ExplorerConfig::from_value(json!({
            "nflowUrl": "/api",
            "graph": { "width": "640", "rankSep": 80, "fontFamily": "monospace" }
        }))
        .unwrap();
        let opts = RenderOptions::from_config(&cfg);
        assert_eq!(opts.available_width, 640.0);
        assert_eq!(opts.rank_sep, 80.0);
        assert_eq!(opts.node_sep, 50.0);
        assert_eq!(opts.font_family.as_deref(), Some("monospace"));
        assert_eq!(opts.dagre_layout().rank_sep, 80.0);
    }

    #[test]
    fn inverted_zoom_extent_is_normalized() {
        let cfg = ExplorerConfig::from_value(json!({
            "graph": { "minZoom": 3, "maxZoom": 0.5 }
        }))
        .unwrap();
        let opts = RenderOptions::from_config(&cfg);
        assert_eq!((opts.min_zoom, opts.max_zoom), (0.5, 3.0));
    }
}
