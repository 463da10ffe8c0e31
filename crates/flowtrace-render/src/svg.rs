//! SVG serialization of a rendered [`Scene`].
//!
//! Element structure follows the dagre-d3 output the explorer styles against:
//! `g.output > g.edgePaths > g#edge-… > path.path` and `g.output > g.nodes > g#node_…`.

use crate::scene::{Scene, SceneEdge, SceneNode};
use std::fmt::Write as _;

mod css;
pub(crate) mod util;

use util::{curve_basis_path_d, escape_xml, escape_xml_into, fmt};

#[derive(Debug, Clone, Default)]
pub struct SvgRenderOptions {
    pub font_family: Option<String>,
    /// Emit an XML declaration before the root element (standalone `.svg` files).
    pub xml_declaration: bool,
}

pub fn render_scene_svg(scene: &Scene, options: &SvgRenderOptions) -> String {
    let id = escape_xml(&scene.diagram_id);
    let mut out = String::with_capacity(2048 + 512 * (scene.nodes().len() + scene.edges().len()));
    if options.xml_declaration {
        out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        out.push('\n');
    }
    let _ = write!(
        &mut out,
        r#"<svg id="{id}" xmlns="http://www.w3.org/2000/svg" class="svg-content-responsive" width="{}" height="{}" preserveAspectRatio="xMinYMin meet">"#,
        fmt(scene.width),
        fmt(scene.height)
    );
    let css = css::explorer_css(
        &scene.diagram_id,
        options.font_family.as_deref(),
        scene.font_size,
    );
    let _ = write!(&mut out, r#"<style type="text/css">{css}</style>"#);
    out.push_str(r#"<rect class="graph-background" width="100%" height="100%"/>"#);

    let _ = write!(
        &mut out,
        r#"<g class="output" transform="{}">"#,
        scene.transform
    );
    render_edges(&mut out, scene, &id);
    out.push_str(r#"<g class="nodes">"#);
    for node in scene.nodes() {
        render_node(&mut out, node, scene.font_size);
    }
    out.push_str("</g></g></svg>\n");
    out
}

fn marker_id(diagram_id: &str, arrowhead_class: &str) -> String {
    format!("{diagram_id}-{arrowhead_class}")
}

fn render_edges(out: &mut String, scene: &Scene, id: &str) {
    out.push_str(r#"<g class="edgePaths">"#);

    let mut arrowheads: Vec<&'static str> = Vec::new();
    for e in scene.edges() {
        if !arrowheads.contains(&e.arrowhead_class) {
            arrowheads.push(e.arrowhead_class);
        }
    }
    if !arrowheads.is_empty() {
        out.push_str("<defs>");
        for class in &arrowheads {
            let _ = write!(
                out,
                r#"<marker id="{}" viewBox="0 0 10 10" refX="9" refY="5" markerUnits="strokeWidth" markerWidth="8" markerHeight="6" orient="auto"><path d="M 0 0 L 10 5 L 0 10 z" class="{class}" style="stroke-width: 1; stroke-dasharray: 1,0;"/></marker>"#,
                marker_id(id, class)
            );
        }
        out.push_str("</defs>");
    }

    for e in scene.edges() {
        render_edge(out, e, id);
    }
    out.push_str("</g>");
}

fn render_edge(out: &mut String, e: &SceneEdge, id: &str) {
    let _ = write!(
        out,
        r#"<g class="{}" id="{}"><path class="path" d="{}" marker-end="url(#{})"/></g>"#,
        escape_xml(&e.classes.to_string()),
        escape_xml(&e.dom_id),
        curve_basis_path_d(&e.points),
        marker_id(id, e.arrowhead_class)
    );
}

fn render_node(out: &mut String, n: &SceneNode, font_size: f64) {
    let _ = write!(
        out,
        r#"<g id="{}" class="{}" transform="translate({},{})">"#,
        escape_xml(&n.dom_id),
        escape_xml(&n.classes.to_string()),
        fmt(n.x),
        fmt(n.y)
    );
    let _ = write!(
        out,
        r#"<rect rx="{}" ry="{}" x="{}" y="{}" width="{}" height="{}"/>"#,
        fmt(n.rx),
        fmt(n.ry),
        fmt(-n.width / 2.0),
        fmt(-n.height / 2.0),
        fmt(n.width),
        fmt(n.height)
    );
    let _ = write!(
        out,
        r#"<g class="label"><text text-anchor="middle" y="{}"><tspan>"#,
        fmt(font_size * 0.35)
    );
    escape_xml_into(out, &n.label);
    out.push_str("</tspan></text></g><title>");
    escape_xml_into(out, &n.title);
    out.push_str("</title>");

    if let Some(badge) = &n.retry {
        let _ = write!(
            out,
            r#"<g transform="translate({},{})"><ellipse cx="10" cy="-5" rx="20" ry="10" class="retry-indicator"/><text text-anchor="middle" x="10" y="0"><tspan>{}</tspan></text><title>"#,
            fmt(badge.dx),
            fmt(badge.dy),
            badge.count
        );
        escape_xml_into(out, &badge.title());
        out.push_str("</title></g>");
    }
    out.push_str("</g>");
}
