use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn fixture(name: &str) -> PathBuf {
    let path = repo_root().join("fixtures").join("workflows").join(name);
    assert!(path.exists(), "fixture missing: {}", path.display());
    path
}

fn cli() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo_bin!("flowtrace-cli"));
    cmd.current_dir(repo_root()).env_remove("RUST_LOG");
    cmd
}

fn png_size(bytes: &[u8]) -> (u32, u32) {
    let decoder = png::Decoder::new(bytes);
    let reader = decoder.read_info().expect("png header");
    let info = reader.info();
    (info.width, info.height)
}

#[test]
fn graph_prints_nodes_and_edges_as_json() {
    let output = cli()
        .args(["graph", fixture("unexpected_update.json").to_str().unwrap()])
        .output()
        .expect("run");
    assert!(output.status.success());

    let graph: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let ids: Vec<&str> = graph["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["node_begin", "node_end", "node_legacyCleanup"]);

    let edge = graph["edges"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["id"] == "edge-legacyCleanup-begin")
        .expect("unexpected edge");
    assert_eq!(edge["class"], "edge-unexpected");
}

#[test]
fn render_svg_from_definition_and_workflow_files() {
    let output = cli()
        .args([
            "render",
            "--workflow",
            fixture("credit_workflow.json").to_str().unwrap(),
            "--definition",
            fixture("credit_definition.json").to_str().unwrap(),
            "--select",
            "grantLoan",
        ])
        .output()
        .expect("run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let svg = String::from_utf8(output.stdout).unwrap();
    let doc = roxmltree::Document::parse(&svg).expect("valid svg");
    let class_of = |id: &str| {
        doc.descendants()
            .find(|n| n.attribute("id") == Some(id))
            .and_then(|n| n.attribute("class"))
            .unwrap_or_default()
            .to_string()
    };
    assert_eq!(class_of("node_grantLoan"), "node-normal selected");
    assert_eq!(class_of("node_manualProcessing"), "node-manual current-state");
    assert_eq!(class_of("node_done"), "node-end node-passive");
    assert_eq!(class_of("edge-grantLoan-manualProcessing"), "edge-error active selected");
    assert!(svg.contains("State was retried 2 times."));
}

#[test]
fn render_applies_config_file() {
    let output = cli()
        .args([
            "render",
            "--config",
            fixture("explorer_config.json").to_str().unwrap(),
            fixture("credit_update.json").to_str().unwrap(),
        ])
        .output()
        .expect("run");
    assert!(output.status.success());
    let svg = String::from_utf8(output.stdout).unwrap();
    assert!(svg.starts_with(r#"<svg id="credit""#));
    assert!(svg.contains(r#"width="640""#));
}

#[test]
fn repeated_config_files_are_merged_in_order() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let local = tmp.path().join("local.json");
    fs::write(&local, r#"{"graph": {"diagramId": "local"}}"#).expect("write config");
    let output = cli()
        .args([
            "render",
            "--config",
            fixture("explorer_config.json").to_str().unwrap(),
            "--config",
            local.to_str().unwrap(),
            fixture("credit_update.json").to_str().unwrap(),
        ])
        .output()
        .expect("run");
    assert!(output.status.success());
    let svg = String::from_utf8(output.stdout).unwrap();
    assert!(svg.starts_with(r#"<svg id="local""#));
    assert!(svg.contains(r#"width="640""#));
}

#[test]
fn missing_config_aborts_without_rendering() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let output = cli()
        .args([
            "render",
            "--config",
            tmp.path().join("nflow-explorer-config.json").to_str().unwrap(),
            fixture("credit_update.json").to_str().unwrap(),
        ])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Can't load explorer config"));
}

#[test]
fn render_png_to_out_path() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("credit.png");
    cli()
        .args([
            "render",
            "--format",
            "png",
            "--width",
            "500",
            "--out",
            out.to_str().unwrap(),
            fixture("credit_update.json").to_str().unwrap(),
        ])
        .assert()
        .success();

    let bytes = fs::read(&out).expect("read png");
    let (w, h) = png_size(&bytes);
    assert_eq!(w, 500);
    assert!(h >= 300);
}

#[test]
fn render_jpg_defaults_next_to_input() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("credit_update.json");
    fs::copy(fixture("credit_update.json"), &input).expect("copy fixture");

    cli()
        .args(["render", "--format", "jpg", input.to_str().unwrap()])
        .assert()
        .success();

    let bytes = fs::read(input.with_extension("jpg")).expect("read jpg");
    assert!(bytes.starts_with(&[0xFF, 0xD8, 0xFF]));
}

#[test]
fn render_reads_stdin() {
    let update = fs::read(fixture("unexpected_update.json")).unwrap();
    cli()
        .args(["render", "-"])
        .write_stdin(update)
        .assert()
        .success();
}

#[test]
fn export_redraws_svg_into_download_dir() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let svg_path = tmp.path().join("diagram.svg");
    let output = cli()
        .args([
            "render",
            "--out",
            svg_path.to_str().unwrap(),
            fixture("credit_update.json").to_str().unwrap(),
        ])
        .output()
        .expect("render");
    assert!(output.status.success());

    let downloads = tmp.path().join("downloads");
    cli()
        .args([
            "export",
            "--size",
            "300x200",
            "--out-dir",
            downloads.to_str().unwrap(),
            "--filename",
            "credit.png",
            svg_path.to_str().unwrap(),
        ])
        .assert()
        .success();
    let bytes = fs::read(downloads.join("credit.png")).expect("exported png");
    assert_eq!(png_size(&bytes), (300, 200));
}

#[test]
fn export_without_dir_prints_data_url() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let svg_path = tmp.path().join("square.svg");
    fs::write(
        &svg_path,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"><rect width="4" height="4"/></svg>"#,
    )
    .unwrap();

    let output = cli()
        .args(["export", "--size", "8x8", "--type", "image/jpeg", svg_path.to_str().unwrap()])
        .output()
        .expect("run");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("data:image/jpeg;base64,"));
}

#[test]
fn export_of_garbage_fails() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let junk = tmp.path().join("junk.bin");
    fs::write(&junk, b"definitely not an image").unwrap();
    let output = cli()
        .args(["export", "--size", "8x8", junk.to_str().unwrap()])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Image downloading failed"));
}

#[test]
fn bad_usage_exits_with_2() {
    let output = cli().args(["render", "--format", "pdf"]).output().expect("run");
    assert_eq!(output.status.code(), Some(2));
}
