use super::util::escape_xml;
use std::fmt::Write as _;

/// Stylesheet embedded in every rendered diagram, scoped to the root `id`.
pub(super) fn explorer_css(diagram_id: &str, font_family: Option<&str>, font_size: f64) -> String {
    let id = escape_xml(diagram_id);
    let font = escape_xml(font_family.unwrap_or(r#""Helvetica Neue",Helvetica,Arial,sans-serif"#));
    let mut out = String::new();
    let _ = write!(
        &mut out,
        r#"#{id}{{font-family:{font};font-size:{}px;}}"#,
        super::util::fmt(font_size)
    );
    let _ = write!(&mut out, r#"#{id} .graph-background{{fill:#ffffff;}}"#);

    // nodes
    let _ = write!(
        &mut out,
        r#"#{id} .nodes rect{{fill:#ffffff;stroke:#333333;stroke-width:1.5px;}}#{id} .nodes text{{fill:#333333;cursor:pointer;}}"#
    );
    let _ = write!(
        &mut out,
        r#"#{id} .node-start rect{{fill:#d9f2d9;stroke:#2e7d32;}}#{id} .node-manual rect{{fill:#fff4cc;stroke:#b38600;}}#{id} .node-end rect{{fill:#e0e0e0;stroke:#424242;}}#{id} .node-error rect{{fill:#fbd5d5;stroke:#c62828;}}"#
    );
    let _ = write!(
        &mut out,
        r#"#{id} .node-passive rect{{fill:#f5f5f5;stroke:#bdbdbd;}}#{id} .node-passive text{{fill:#9e9e9e;}}"#
    );
    let _ = write!(
        &mut out,
        r#"#{id} .current-state rect{{stroke:#1565c0;stroke-width:3px;}}#{id} .nodes .selected rect{{stroke:#ff6f00;stroke-width:3px;}}"#
    );
    let _ = write!(
        &mut out,
        r#"#{id} .retry-indicator{{fill:#ff9800;stroke:#e65100;stroke-width:1px;}}"#
    );

    // edges
    let _ = write!(
        &mut out,
        r#"#{id} .edgePaths path{{fill:none;stroke:#333333;stroke-width:1.5px;}}#{id} .edge-error path{{stroke:#c62828;stroke-dasharray:5,5;}}#{id} .edge-unexpected path{{stroke:#ff6f00;stroke-dasharray:2,3;}}"#
    );
    let _ = write!(
        &mut out,
        r#"#{id} .edgePaths .active path{{stroke-width:3px;}}#{id} .edgePaths .selected path{{stroke:#ff6f00;stroke-width:3px;}}"#
    );
    let _ = write!(
        &mut out,
        r#"#{id} .arrowhead-normal{{fill:#333333;}}#{id} .arrowhead-error{{fill:#c62828;}}#{id} .arrowhead-unexpected{{fill:#ff6f00;}}"#
    );
    out
}
