#![forbid(unsafe_code)]

//! `flowtrace` renders workflow state machines with the live execution trace of one
//! workflow instance laid over the static definition.
//!
//! # Features
//!
//! - `render` (default): layout, SVG rendering, selection highlighting and the ports bridge
//! - `raster`: PNG/JPG output and image export via pure-Rust SVG rasterization

pub use flowtrace_core::*;

#[cfg(feature = "render")]
pub mod bridge;

#[cfg(feature = "raster")]
pub mod export;

#[cfg(feature = "render")]
pub mod render {
    pub use flowtrace_render::canvas::render_svg;
    pub use flowtrace_render::highlight::{
        mark_all_deselected, mark_current_state, mark_state_selected, set_node_selected,
    };
    pub use flowtrace_render::model::{LayoutPoint, LayoutedGraph};
    pub use flowtrace_render::svg::SvgRenderOptions;
    pub use flowtrace_render::text::{DeterministicTextMeasurer, TextMeasurer, TextStyle};
    pub use flowtrace_render::{
        Canvas, ClassList, DagreLayout, Error, LayoutEngine, RenderOptions, Result, Scene,
        ZoomTransform,
    };

    #[cfg(feature = "raster")]
    pub mod raster;

    /// Builds the graph for one update and renders it to an SVG document.
    pub fn render_workflow_svg(
        definition: &crate::Definition,
        workflow: Option<&crate::Workflow>,
        options: RenderOptions,
    ) -> Result<String> {
        let graph = crate::build_graph(definition, workflow);
        let mut canvas = Canvas::new(options);
        canvas.render(&graph, |_| {})?;
        if let (Some(wf), Some(scene)) = (workflow, canvas.scene_mut()) {
            mark_current_state(scene, wf);
        }
        canvas.to_svg()
    }
}
