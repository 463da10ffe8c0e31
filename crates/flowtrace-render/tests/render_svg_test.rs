use flowtrace_core::{Action, Definition, Graph, State, StateType, Workflow, build_graph};
use flowtrace_render::model::{LayoutEdge, LayoutNode, LayoutPoint, LayoutedGraph};
use flowtrace_render::text::TextMeasurer;
use flowtrace_render::{Canvas, Error, LayoutEngine, RenderOptions};
use std::cell::RefCell;
use std::rc::Rc;

fn worked_example() -> Graph {
    let def = Definition::new(
        vec![
            State::new("A", StateType::Start)
                .with_description("Entry point")
                .with_transitions(["B"]),
            State::new("B", StateType::Normal)
                .with_description("Process <credit>")
                .with_transitions(["C"]),
            State::new("C", StateType::End),
        ],
        Some("A".to_string()),
    );
    let wf = Workflow::new(
        "B",
        vec![Action::new("A"), Action::new("B"), Action::retry("B", 1)],
    );
    build_graph(&def, Some(&wf))
}

fn by_id<'a>(doc: &'a roxmltree::Document<'a>, id: &str) -> roxmltree::Node<'a, 'a> {
    doc.descendants()
        .find(|n| n.attribute("id") == Some(id))
        .unwrap_or_else(|| panic!("no element #{id}"))
}

fn child<'a>(node: roxmltree::Node<'a, 'a>, tag: &str) -> roxmltree::Node<'a, 'a> {
    node.children()
        .find(|c| c.has_tag_name(tag))
        .unwrap_or_else(|| panic!("no <{tag}> child"))
}

fn center_on_screen(canvas: &Canvas, dom_id: &str) -> LayoutPoint {
    let scene = canvas.scene().unwrap();
    let n = scene.node(dom_id).unwrap();
    scene.transform.apply(LayoutPoint::new(n.x, n.y))
}

#[test]
fn svg_root_carries_stylesheet_background_and_viewport() {
    let mut canvas = Canvas::default();
    canvas.render(&worked_example(), |_| {}).unwrap();
    let svg = canvas.to_svg().unwrap();
    let doc = roxmltree::Document::parse(&svg).unwrap();
    let root = doc.root_element();

    assert_eq!(root.attribute("class"), Some("svg-content-responsive"));
    assert_eq!(root.attribute("preserveAspectRatio"), Some("xMinYMin meet"));
    assert_eq!(root.attribute("width"), Some("1000"));

    let elements: Vec<_> = root.children().filter(|c| c.is_element()).collect();
    assert!(elements[0].has_tag_name("style"));
    assert!(elements[0].text().unwrap().contains(".retry-indicator"));
    assert!(elements[1].has_tag_name("rect"));
    assert_eq!(elements[1].attribute("class"), Some("graph-background"));
    assert_eq!(elements[1].attribute("width"), Some("100%"));

    let output = elements[2];
    assert_eq!(output.attribute("class"), Some("output"));
    let scene = canvas.scene().unwrap();
    assert_eq!(
        output.attribute("transform"),
        Some(scene.transform.to_string().as_str())
    );
    assert!(scene.height >= 300.0);
}

#[test]
fn nodes_have_dom_ids_classes_titles_and_rounded_rects() {
    let mut canvas = Canvas::default();
    canvas.render(&worked_example(), |_| {}).unwrap();
    let svg = canvas.to_svg().unwrap();
    let doc = roxmltree::Document::parse(&svg).unwrap();

    let a = by_id(&doc, "node_A");
    assert_eq!(a.attribute("class"), Some("node-start"));
    let rect = child(a, "rect");
    assert_eq!(rect.attribute("rx"), Some("5"));
    assert_eq!(rect.attribute("ry"), Some("5"));
    assert_eq!(child(a, "title").text(), Some("Start state\nEntry point"));

    let b = by_id(&doc, "node_B");
    assert_eq!(child(b, "title").text(), Some("Normal state\nProcess <credit>"));

    let c = by_id(&doc, "node_C");
    assert_eq!(c.attribute("class"), Some("node-end node-passive"));
    let label: String = c
        .descendants()
        .filter(|n| n.has_tag_name("tspan"))
        .filter_map(|n| n.text())
        .collect();
    assert_eq!(label, "C");
}

#[test]
fn retried_node_gets_a_badge_with_count_and_title() {
    let mut canvas = Canvas::default();
    canvas.render(&worked_example(), |_| {}).unwrap();
    let svg = canvas.to_svg().unwrap();
    let doc = roxmltree::Document::parse(&svg).unwrap();

    let badge_of = |id: &str| {
        by_id(&doc, id)
            .descendants()
            .find(|n| n.attribute("class") == Some("retry-indicator"))
    };
    assert!(badge_of("node_A").is_none());

    let ellipse = badge_of("node_B").expect("badge on B");
    assert_eq!(ellipse.attribute("cx"), Some("10"));
    assert_eq!(ellipse.attribute("cy"), Some("-5"));
    assert_eq!(ellipse.attribute("rx"), Some("20"));
    assert_eq!(ellipse.attribute("ry"), Some("10"));

    let group = ellipse.parent().unwrap();
    let width = canvas.scene().unwrap().node("node_B").unwrap().width;
    assert_eq!(
        group.attribute("transform"),
        Some(format!("translate({},-4)", width / 2.0).as_str())
    );
    let count = group
        .descendants()
        .find(|n| n.has_tag_name("tspan"))
        .and_then(|n| n.text());
    assert_eq!(count, Some("1"));
    assert_eq!(
        child(group, "title").text(),
        Some("State was retried 1 times.")
    );
}

#[test]
fn edges_are_curves_with_style_classes_and_markers() {
    let mut canvas = Canvas::default();
    canvas.render(&worked_example(), |_| {}).unwrap();
    let svg = canvas.to_svg().unwrap();
    let doc = roxmltree::Document::parse(&svg).unwrap();

    let ab = by_id(&doc, "edge-A-B");
    assert_eq!(ab.attribute("class"), Some("edge-normal active"));
    let path = child(ab, "path");
    assert!(path.attribute("d").unwrap().starts_with('M'));
    assert_eq!(
        path.attribute("marker-end"),
        Some("url(#flowtrace-arrowhead-normal)")
    );

    let ba = by_id(&doc, "edge-B-A");
    assert_eq!(ba.attribute("class"), Some("edge-error active"));
    assert_eq!(
        child(ba, "path").attribute("marker-end"),
        Some("url(#flowtrace-arrowhead-error)")
    );

    let marker = by_id(&doc, "flowtrace-arrowhead-error");
    assert_eq!(child(marker, "path").attribute("class"), Some("arrowhead-error"));
    assert!(
        doc.descendants()
            .all(|n| n.attribute("id") != Some("flowtrace-arrowhead-unexpected"))
    );
}

#[test]
fn clicks_resolve_to_nodes_or_background() {
    let seen: Rc<RefCell<Vec<Option<String>>>> = Rc::default();
    let sink = Rc::clone(&seen);
    let mut canvas = Canvas::default();
    canvas
        .render(&worked_example(), move |id| {
            sink.borrow_mut().push(id.map(str::to_string))
        })
        .unwrap();

    let hit = canvas.click(center_on_screen(&canvas, "node_B"));
    assert_eq!(hit.as_deref(), Some("B"));
    assert_eq!(canvas.click(LayoutPoint::new(1.0, 1.0)), None);
    assert_eq!(*seen.borrow(), vec![Some("B".to_string()), None]);
}

#[test]
fn rerender_replaces_scene_and_callback() {
    let first: Rc<RefCell<usize>> = Rc::default();
    let second: Rc<RefCell<usize>> = Rc::default();
    let mut canvas = Canvas::default();

    let f = Rc::clone(&first);
    canvas
        .render(&worked_example(), move |_| *f.borrow_mut() += 1)
        .unwrap();

    let single = build_graph(
        &Definition::new(vec![State::new("only", StateType::Start)], None),
        None,
    );
    let s = Rc::clone(&second);
    canvas.render(&single, move |_| *s.borrow_mut() += 1).unwrap();

    assert_eq!(canvas.scene().unwrap().nodes().len(), 1);
    assert!(canvas.scene().unwrap().node("node_A").is_none());
    canvas.click(LayoutPoint::new(0.0, 0.0));
    assert_eq!((*first.borrow(), *second.borrow()), (0, 1));
}

#[test]
fn pan_and_zoom_move_the_root_transform() {
    let mut canvas = Canvas::default();
    canvas.render(&worked_example(), |_| {}).unwrap();
    let start = canvas.transform().unwrap();

    canvas.pan(10.0, -5.0);
    let panned = canvas.transform().unwrap();
    assert_eq!((panned.x, panned.y), (start.x + 10.0, start.y - 5.0));

    let anchor = center_on_screen(&canvas, "node_A");
    canvas.zoom_at(anchor, 1000.0);
    assert_eq!(canvas.transform().unwrap().k, canvas.options().max_zoom);
    assert_eq!(canvas.click(anchor).as_deref(), Some("A"));
}

#[test]
fn zoom_with_inverted_extent_does_not_panic() {
    let def = Definition::new(vec![State::new("only", StateType::Start)], None);
    let mut canvas = Canvas::new(RenderOptions {
        min_zoom: 4.0,
        max_zoom: 0.1,
        ..RenderOptions::default()
    });
    canvas.render(&build_graph(&def, None), |_| {}).unwrap();
    canvas.zoom_at(LayoutPoint::new(10.0, 10.0), 2.0);
    assert_eq!(canvas.transform().unwrap().k, 2.0);
}

#[test]
fn nothing_to_serialize_before_first_render() {
    let mut canvas = Canvas::default();
    assert!(matches!(canvas.to_svg(), Err(Error::NothingRendered)));
    assert_eq!(canvas.click(LayoutPoint::new(50.0, 50.0)), None);
}

#[test]
fn empty_graph_renders_background_only() {
    let mut canvas = Canvas::default();
    canvas.render(&Graph::new(), |_| {}).unwrap();
    let svg = canvas.to_svg().unwrap();
    let doc = roxmltree::Document::parse(&svg).unwrap();
    assert!(doc.descendants().all(|n| !n.has_tag_name("path")));
    assert_eq!(canvas.scene().unwrap().height, 300.0);
}

/// Puts every node on one row, 100px apart, with straight edges.
struct RowLayout;

impl LayoutEngine for RowLayout {
    fn layout(
        &self,
        graph: &Graph,
        _measurer: &dyn TextMeasurer,
    ) -> flowtrace_render::Result<LayoutedGraph> {
        let nodes: Vec<LayoutNode> = graph
            .node_ids()
            .enumerate()
            .map(|(i, id)| LayoutNode {
                id: id.to_string(),
                x: 40.0 + 100.0 * i as f64,
                y: 20.0,
                width: 80.0,
                height: 40.0,
            })
            .collect();
        let center = |id: &str| {
            let n = nodes.iter().find(|n| n.id == id).unwrap();
            LayoutPoint::new(n.x, n.y)
        };
        let edges = graph
            .edges()
            .map(|e| LayoutEdge {
                source: e.source.clone(),
                target: e.target.clone(),
                points: vec![center(&e.source), center(&e.target)],
            })
            .collect();
        Ok(LayoutedGraph {
            width: 100.0 * nodes.len() as f64,
            height: 40.0,
            nodes,
            edges,
        })
    }
}

#[test]
fn layout_engine_is_swappable() {
    let mut canvas = Canvas::new(RenderOptions {
        diagram_id: Some("row".to_string()),
        ..RenderOptions::default()
    })
    .with_layout_engine(RowLayout);
    canvas.render(&worked_example(), |_| {}).unwrap();

    let scene = canvas.scene().unwrap();
    assert_eq!(scene.node("node_C").unwrap().x, 240.0);
    let svg = canvas.to_svg().unwrap();
    assert!(svg.contains(r#"<svg id="row""#));
    assert!(svg.contains("url(#row-arrowhead-normal)"));
}
