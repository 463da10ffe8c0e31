#![cfg(feature = "raster")]

use flowtrace::export::{DataUrl, DataUrlLocation, DownloadDir, ExportOutcome, export_image};
use flowtrace::render::raster::{RasterOptions, svg_to_png};
use flowtrace::render::{RenderOptions, render_workflow_svg};
use flowtrace::{Action, Definition, State, StateType, Workflow};

fn diagram_svg() -> String {
    let def = Definition::new(
        vec![
            State::new("new", StateType::Start).with_transitions(["approve"]),
            State::new("approve", StateType::Manual).with_transitions(["done"]),
            State::new("done", StateType::End),
            State::new("failed", StateType::Error),
        ],
        Some("failed".to_string()),
    );
    let wf = Workflow::new("approve", vec![Action::new("new")]);
    render_workflow_svg(&def, Some(&wf), RenderOptions::default()).unwrap()
}

fn svg_data_url() -> String {
    DataUrl {
        mime: "image/svg+xml".to_string(),
        bytes: diagram_svg().into_bytes(),
    }
    .to_url()
}

/// Width and height from the IHDR chunk.
fn png_size(bytes: &[u8]) -> (u32, u32) {
    assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
    let be = |at: usize| u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
    (be(16), be(20))
}

#[test]
fn svg_source_is_downloaded_as_png_of_requested_size() {
    let tmp = tempfile::tempdir().unwrap();
    let mut target = DownloadDir::new(tmp.path());

    let outcome = export_image(
        (320, 240),
        &svg_data_url(),
        "workflow.png",
        "image/png",
        &mut target,
    );
    assert_eq!(outcome, ExportOutcome::Saved);
    let path = tmp.path().join("workflow.png");
    assert_eq!(target.saved(), [path.clone()]);
    assert_eq!(png_size(&std::fs::read(path).unwrap()), (320, 240));
}

#[test]
fn without_download_support_the_result_is_navigated_to() {
    let mut target = DataUrlLocation::default();
    let outcome = export_image(
        (100, 80),
        &svg_data_url(),
        "workflow.jpg",
        "image/jpeg",
        &mut target,
    );
    assert_eq!(outcome, ExportOutcome::Navigated);

    let href = target.href.expect("navigated");
    let decoded = DataUrl::parse(&href).unwrap();
    assert_eq!(decoded.mime, "image/jpeg");
    assert!(decoded.bytes.starts_with(&[0xFF, 0xD8, 0xFF]));
}

#[test]
fn raster_sources_are_redrawn_at_the_new_size() {
    let png = svg_to_png(&diagram_svg(), &RasterOptions::default()).unwrap();
    let source = DataUrl {
        mime: "image/png".to_string(),
        bytes: png,
    }
    .to_url();

    let tmp = tempfile::tempdir().unwrap();
    let mut target = DownloadDir::new(tmp.path());
    let outcome = export_image((50, 25), &source, "small.png", "image/png", &mut target);
    assert_eq!(outcome, ExportOutcome::Saved);
    let bytes = std::fs::read(tmp.path().join("small.png")).unwrap();
    assert_eq!(png_size(&bytes), (50, 25));
}

#[test]
fn decode_failure_skips_without_saving() {
    let tmp = tempfile::tempdir().unwrap();
    let out_dir = tmp.path().join("downloads");
    let mut target = DownloadDir::new(&out_dir);

    for source in [
        "not a data url",
        "data:image/png;base64,AAAA",
        "data:image/svg+xml,%3Cnot-svg",
    ] {
        let outcome = export_image((10, 10), source, "x.png", "image/png", &mut target);
        assert_eq!(outcome, ExportOutcome::Skipped, "{source}");
    }
    assert!(target.saved().is_empty());
    assert!(!out_dir.exists());
}

#[test]
fn download_keeps_only_the_file_name() {
    let tmp = tempfile::tempdir().unwrap();
    let inner = tmp.path().join("inner");
    let mut target = DownloadDir::new(&inner);
    let outcome = export_image(
        (16, 16),
        &svg_data_url(),
        "../escape.png",
        "image/png",
        &mut target,
    );
    assert_eq!(outcome, ExportOutcome::Saved);
    assert!(inner.join("escape.png").is_file());
    assert!(!tmp.path().join("escape.png").exists());
}

#[test]
fn zero_sized_export_is_skipped() {
    let mut target = DataUrlLocation::default();
    let outcome = export_image((0, 10), &svg_data_url(), "x.png", "image/png", &mut target);
    assert_eq!(outcome, ExportOutcome::Skipped);
    assert!(target.href.is_none());
}
