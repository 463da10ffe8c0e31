use flowtrace::bridge::GraphUpdate;
use flowtrace::export::{DataUrl, DataUrlLocation, DownloadDir, ExportOutcome, export_image};
use flowtrace::render::raster::{RasterOptions, svg_to_jpeg, svg_to_png};
use flowtrace::render::{Canvas, RenderOptions, mark_current_state, mark_state_selected};
use flowtrace::{Definition, ExplorerConfig, Workflow, build_graph};
use serde::Serialize;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

mod logging;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Config(flowtrace::Error),
    Model(flowtrace::Error),
    Render(flowtrace::render::Error),
    Raster(flowtrace::render::raster::RasterError),
    Json(serde_json::Error),
    ExportSkipped,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Config(err) => write!(f, "{err}"),
            CliError::Model(err) => write!(f, "{err}"),
            CliError::Render(err) => write!(f, "{err}"),
            CliError::Raster(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::ExportSkipped => write!(f, "Image export failed; nothing was saved"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<flowtrace::Error> for CliError {
    fn from(value: flowtrace::Error) -> Self {
        Self::Model(value)
    }
}

impl From<flowtrace::render::Error> for CliError {
    fn from(value: flowtrace::render::Error) -> Self {
        Self::Render(value)
    }
}

impl From<flowtrace::render::raster::RasterError> for CliError {
    fn from(value: flowtrace::render::raster::RasterError) -> Self {
        Self::Raster(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    Graph,
    #[default]
    Render,
    Export,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum RenderFormat {
    #[default]
    Svg,
    Png,
    Jpeg,
}

impl FromStr for RenderFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            _ => Err(()),
        }
    }
}

impl RenderFormat {
    fn ext(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    definition: Option<String>,
    workflow: Option<String>,
    configs: Vec<String>,
    select: Option<String>,
    pretty: bool,
    render_format: RenderFormat,
    render_scale: f32,
    background: Option<String>,
    width: Option<f64>,
    diagram_id: Option<String>,
    size: Option<(u32, u32)>,
    content_type: Option<String>,
    out_dir: Option<String>,
    filename: Option<String>,
    out: Option<String>,
}

fn usage() -> &'static str {
    "flowtrace-cli\n\
\n\
USAGE:\n\
  flowtrace-cli graph [--pretty] [--workflow <path>] [--definition <path>|<update.json>|-]\n\
  flowtrace-cli render [--format svg|png|jpg] [--scale <n>] [--background <css-color>] [--width <px>] [--id <diagram-id>] [--select <state>] [--config <path>]... [--out <path>] [--workflow <path>] [--definition <path>|<update.json>|-]\n\
  flowtrace-cli export --size <w>x<h> [--type image/png|image/jpeg] [--out-dir <dir>] [--filename <name>] [<image>|-]\n\
\n\
NOTES:\n\
  - Without --definition the input is an update object: {\"definition\": .., \"workflow\": .., \"selected\": ..}.\n\
  - If the input path is omitted or '-', it is read from stdin.\n\
  - graph prints the abstract state graph as JSON.\n\
  - render prints SVG to stdout by default; use --out to write a file.\n\
  - Repeated --config files are merged in order; later keys win.\n\
  - PNG/JPG output defaults to writing next to the input file (or ./out.png, ./out.jpg for stdin).\n\
  - export redraws an SVG/PNG/JPEG image at --size; without --out-dir the result is printed as a data URL.\n\
  - Log verbosity follows RUST_LOG (default: warn); logs go to stderr.\n\
"
}

fn next_value<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<&'a String, CliError> {
    it.next().ok_or(CliError::Usage(usage()))
}

fn parse_size(raw: &str) -> Option<(u32, u32)> {
    let (w, h) = raw.trim().split_once(['x', 'X'])?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args {
        render_scale: 1.0,
        ..Default::default()
    };

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "graph" => args.command = Command::Graph,
            "render" => args.command = Command::Render,
            "export" => args.command = Command::Export,
            "--pretty" => args.pretty = true,
            "--definition" => args.definition = Some(next_value(&mut it)?.clone()),
            "--workflow" => args.workflow = Some(next_value(&mut it)?.clone()),
            "--config" => args.configs.push(next_value(&mut it)?.clone()),
            "--select" => args.select = Some(next_value(&mut it)?.clone()),
            "--id" => args.diagram_id = Some(next_value(&mut it)?.clone()),
            "--out" => args.out = Some(next_value(&mut it)?.clone()),
            "--out-dir" => args.out_dir = Some(next_value(&mut it)?.clone()),
            "--filename" => args.filename = Some(next_value(&mut it)?.clone()),
            "--type" => args.content_type = Some(next_value(&mut it)?.clone()),
            "--format" => {
                args.render_format = next_value(&mut it)?
                    .parse::<RenderFormat>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--scale" => {
                args.render_scale = next_value(&mut it)?
                    .parse::<f32>()
                    .map_err(|_| CliError::Usage(usage()))?;
                if !(args.render_scale.is_finite() && args.render_scale > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
            }
            "--background" => {
                let bg = next_value(&mut it)?;
                if !bg.trim().is_empty() {
                    args.background = Some(bg.trim().to_string());
                }
            }
            "--width" => {
                let w = next_value(&mut it)?
                    .parse::<f64>()
                    .map_err(|_| CliError::Usage(usage()))?;
                if !(w.is_finite() && w > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
                args.width = Some(w);
            }
            "--size" => {
                args.size =
                    Some(parse_size(next_value(&mut it)?).ok_or(CliError::Usage(usage()))?);
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    if args.definition.is_some() && args.input.is_some() {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

fn read_bytes(input: Option<&str>) -> Result<Vec<u8>, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read(path)?),
    }
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    let bytes = read_bytes(input)?;
    String::from_utf8(bytes)
        .map_err(|e| CliError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Reads the graph input: a definition file plus optional workflow file, or one update object.
fn read_update(args: &Args) -> Result<GraphUpdate, CliError> {
    let mut update = match args.definition.as_deref() {
        Some(path) => {
            let definition = Definition::from_json_str(&read_input(Some(path))?)?;
            let workflow = match args.workflow.as_deref() {
                Some(path) => Some(Workflow::from_json_str(&read_input(Some(path))?)?),
                None => None,
            };
            GraphUpdate::new(definition, workflow)
        }
        None => {
            let mut update = GraphUpdate::from_json_str(&read_input(args.input.as_deref())?)?;
            if let Some(path) = args.workflow.as_deref() {
                update.workflow = Some(Workflow::from_json_str(&read_input(Some(path))?)?);
            }
            update
        }
    };
    if args.select.is_some() {
        update.selected.clone_from(&args.select);
    }
    Ok(update)
}

fn load_config(paths: &[String]) -> Result<ExplorerConfig, CliError> {
    let mut merged = ExplorerConfig::empty_object();
    for path in paths {
        let layer = ExplorerConfig::load(path).map_err(|err| {
            tracing::error!(path, error = %err, "Can't load explorer config");
            CliError::Config(err)
        })?;
        merged.deep_merge(layer.as_value());
    }
    Ok(merged)
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    let mut out = std::io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut out, value)?;
    } else {
        serde_json::to_writer(&mut out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_output(bytes: &[u8], out: Option<&Path>) -> Result<(), CliError> {
    match out {
        None => {
            std::io::stdout().lock().write_all(bytes)?;
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, bytes)?;
            Ok(())
        }
    }
}

fn default_raster_out_path(args: &Args, ext: &str) -> PathBuf {
    match args.definition.as_deref().or(args.input.as_deref()) {
        Some(path) if path != "-" => PathBuf::from(path).with_extension(ext),
        _ => PathBuf::from(format!("out.{ext}")),
    }
}

fn run_graph(args: &Args) -> Result<(), CliError> {
    let update = read_update(args)?;
    let graph = build_graph(&update.definition, update.workflow.as_ref());
    write_json(&graph, args.pretty)
}

fn run_render(args: &Args) -> Result<(), CliError> {
    let config = load_config(&args.configs)?;
    let mut options = RenderOptions::from_config(&config);
    if let Some(w) = args.width {
        options.available_width = w;
    }
    if args.diagram_id.is_some() {
        options.diagram_id.clone_from(&args.diagram_id);
    }

    let update = read_update(args)?;
    let graph = build_graph(&update.definition, update.workflow.as_ref());
    let mut canvas = Canvas::new(options);
    canvas.render(&graph, |_| {})?;
    if let Some(scene) = canvas.scene_mut() {
        if let Some(wf) = update.workflow.as_ref() {
            mark_current_state(scene, wf);
        }
        if update.selected.is_some() {
            mark_state_selected(&graph, scene, update.selected.as_deref());
        }
    }
    let svg = canvas.to_svg()?;

    let raster = RasterOptions {
        scale: args.render_scale,
        background: args.background.clone(),
        ..RasterOptions::default()
    };
    match args.render_format {
        RenderFormat::Svg => write_output(svg.as_bytes(), args.out.as_deref().map(Path::new)),
        format => {
            let bytes = if format == RenderFormat::Png {
                svg_to_png(&svg, &raster)?
            } else {
                svg_to_jpeg(&svg, &raster)?
            };
            let out = args
                .out
                .as_deref()
                .map(PathBuf::from)
                .unwrap_or_else(|| default_raster_out_path(args, format.ext()));
            write_output(&bytes, Some(&out))
        }
    }
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else {
        "image/svg+xml"
    }
}

fn run_export(args: &Args) -> Result<(), CliError> {
    let size = args.size.ok_or(CliError::Usage(usage()))?;
    let bytes = read_bytes(args.input.as_deref())?;
    let source = DataUrl {
        mime: sniff_mime(&bytes).to_string(),
        bytes,
    }
    .to_url();
    let content_type = args.content_type.as_deref().unwrap_or("image/png");
    let filename = args.filename.clone().unwrap_or_else(|| {
        let ext = if content_type.contains("jpeg") || content_type.contains("jpg") {
            "jpg"
        } else {
            "png"
        };
        format!("workflow.{ext}")
    });

    let outcome = match args.out_dir.as_deref() {
        Some(dir) => {
            let mut target = DownloadDir::new(dir);
            export_image(size, &source, &filename, content_type, &mut target)
        }
        None => {
            let mut target = DataUrlLocation::default();
            let outcome = export_image(size, &source, &filename, content_type, &mut target);
            if let Some(href) = target.href {
                println!("{href}");
            }
            outcome
        }
    };
    match outcome {
        ExportOutcome::Saved | ExportOutcome::Navigated => Ok(()),
        ExportOutcome::Skipped => Err(CliError::ExportSkipped),
    }
}

fn run(args: Args) -> Result<(), CliError> {
    match args.command {
        Command::Graph => run_graph(&args),
        Command::Render => run_render(&args),
        Command::Export => run_export(&args),
    }
}

fn main() {
    logging::init_tracing();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("flowtrace-cli")
            .chain(args.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn parses_render_flags() {
        let args = parse_args(&argv(&[
            "render", "--format", "JPG", "--width", "640", "--select", "B", "update.json",
        ]))
        .unwrap();
        assert!(matches!(args.command, Command::Render));
        assert_eq!(args.render_format, RenderFormat::Jpeg);
        assert_eq!(args.width, Some(640.0));
        assert_eq!(args.select.as_deref(), Some("B"));
        assert_eq!(args.input.as_deref(), Some("update.json"));
    }

    #[test]
    fn rejects_bad_usage() {
        for bad in [
            &["render", "--format", "pdf"][..],
            &["render", "--scale", "0"],
            &["render", "--width"],
            &["export", "--size", "10by10"],
            &["render", "a.json", "b.json"],
            &["render", "--definition", "d.json", "u.json"],
            &["--nope"],
        ] {
            assert!(
                matches!(parse_args(&argv(bad)), Err(CliError::Usage(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn size_accepts_both_separators() {
        assert_eq!(parse_size("800x600"), Some((800, 600)));
        assert_eq!(parse_size(" 10X20 "), Some((10, 20)));
        assert_eq!(parse_size("10"), None);
    }

    #[test]
    fn raster_out_path_follows_input() {
        let args = Args {
            definition: Some("fixtures/credit.json".to_string()),
            ..Default::default()
        };
        assert_eq!(
            default_raster_out_path(&args, "png"),
            PathBuf::from("fixtures/credit.png")
        );
        assert_eq!(
            default_raster_out_path(&Args::default(), "jpg"),
            PathBuf::from("out.jpg")
        );
    }
}
