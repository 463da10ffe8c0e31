#![forbid(unsafe_code)]

use crate::render::{RenderOptions, render_workflow_svg};
use crate::{Definition, Workflow};

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error(transparent)]
    Render(#[from] flowtrace_render::Error),
    #[error("failed to parse SVG")]
    SvgParse,
    #[error("failed to allocate a {width}x{height} pixmap")]
    PixmapAlloc { width: u32, height: u32 },
    #[error("failed to encode PNG")]
    PngEncode,
    #[error("invalid background color for JPG rendering")]
    JpegBackground,
    #[error("JPG rendering requires an opaque background color (e.g. white)")]
    JpegOpaqueBackgroundRequired,
    #[error("failed to encode JPG")]
    JpegEncode,
}

pub type Result<T> = std::result::Result<T, RasterError>;

#[derive(Debug, Clone)]
pub struct RasterOptions {
    pub scale: f32,
    pub background: Option<String>,
    pub jpeg_quality: u8,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            background: None,
            jpeg_quality: 92,
        }
    }
}

pub fn render_workflow_png(
    definition: &Definition,
    workflow: Option<&Workflow>,
    options: RenderOptions,
    raster: &RasterOptions,
) -> Result<Vec<u8>> {
    svg_to_png(&render_workflow_svg(definition, workflow, options)?, raster)
}

pub fn render_workflow_jpeg(
    definition: &Definition,
    workflow: Option<&Workflow>,
    options: RenderOptions,
    raster: &RasterOptions,
) -> Result<Vec<u8>> {
    svg_to_jpeg(&render_workflow_svg(definition, workflow, options)?, raster)
}

pub fn svg_to_png(svg: &str, options: &RasterOptions) -> Result<Vec<u8>> {
    let tree = parse_svg(svg)?;
    let size = tree.size();
    let pixmap = tree_to_pixmap(
        &tree,
        scaled_px(size.width(), options.scale),
        scaled_px(size.height(), options.scale),
        options.background.as_deref(),
    )?;
    pixmap.encode_png().map_err(|_| RasterError::PngEncode)
}

pub fn svg_to_jpeg(svg: &str, options: &RasterOptions) -> Result<Vec<u8>> {
    let bg = options.background.as_deref().unwrap_or("white");
    let Some(color) = parse_tiny_skia_color(bg) else {
        return Err(RasterError::JpegBackground);
    };
    if color.alpha() != 1.0 {
        return Err(RasterError::JpegOpaqueBackgroundRequired);
    }

    let tree = parse_svg(svg)?;
    let size = tree.size();
    let pixmap = tree_to_pixmap(
        &tree,
        scaled_px(size.width(), options.scale),
        scaled_px(size.height(), options.scale),
        Some(bg),
    )?;
    encode_jpeg(&pixmap, options.jpeg_quality)
}

/// Drops the alpha channel of an opaque pixmap and encodes it as baseline JPEG.
pub(crate) fn encode_jpeg(pixmap: &tiny_skia::Pixmap, quality: u8) -> Result<Vec<u8>> {
    let (w, h) = (pixmap.width(), pixmap.height());
    let mut rgb = vec![0u8; (w as usize) * (h as usize) * 3];
    for (src, dst) in pixmap.data().chunks_exact(4).zip(rgb.chunks_exact_mut(3)) {
        dst.copy_from_slice(&src[..3]);
    }

    let mut out = Vec::new();
    let mut enc = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
    enc.encode(&rgb, w, h, image::ExtendedColorType::Rgb8)
        .map_err(|_| RasterError::JpegEncode)?;
    Ok(out)
}

pub(crate) fn parse_svg(svg: &str) -> Result<usvg::Tree> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    opt.font_family = "Arial".to_string();
    usvg::Tree::from_str(svg, &opt).map_err(|_| RasterError::SvgParse)
}

fn scaled_px(len: f32, scale: f32) -> u32 {
    (len * scale).ceil().max(1.0) as u32
}

/// Renders `tree` stretched to exactly `width` x `height` pixels.
pub(crate) fn tree_to_pixmap(
    tree: &usvg::Tree,
    width: u32,
    height: u32,
    background: Option<&str>,
) -> Result<tiny_skia::Pixmap> {
    let mut pixmap = new_pixmap(width, height, background)?;
    let size = tree.size();
    let transform = tiny_skia::Transform::from_scale(
        width as f32 / size.width().max(1.0),
        height as f32 / size.height().max(1.0),
    );
    resvg::render(tree, transform, &mut pixmap.as_mut());
    Ok(pixmap)
}

pub(crate) fn new_pixmap(
    width: u32,
    height: u32,
    background: Option<&str>,
) -> Result<tiny_skia::Pixmap> {
    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(RasterError::PixmapAlloc { width, height })?;
    if let Some(color) = background.and_then(parse_tiny_skia_color) {
        pixmap.fill(color);
    }
    Ok(pixmap)
}

pub(crate) fn parse_tiny_skia_color(text: &str) -> Option<tiny_skia::Color> {
    let s = text.trim().to_ascii_lowercase();
    match s.as_str() {
        "transparent" => return Some(tiny_skia::Color::from_rgba8(0, 0, 0, 0)),
        "white" => return Some(tiny_skia::Color::from_rgba8(255, 255, 255, 255)),
        "black" => return Some(tiny_skia::Color::from_rgba8(0, 0, 0, 255)),
        _ => {}
    }

    let hex = s.strip_prefix('#')?;
    fn hex2(b: &[u8]) -> Option<u8> {
        let hi = (*b.first()? as char).to_digit(16)? as u8;
        let lo = (*b.get(1)? as char).to_digit(16)? as u8;
        Some((hi << 4) | lo)
    }
    fn hex1(c: u8) -> Option<u8> {
        let v = (c as char).to_digit(16)? as u8;
        Some((v << 4) | v)
    }

    let b = hex.as_bytes();
    let (r, g, bl, a) = match b.len() {
        3 => (hex1(b[0])?, hex1(b[1])?, hex1(b[2])?, 255),
        4 => (hex1(b[0])?, hex1(b[1])?, hex1(b[2])?, hex1(b[3])?),
        6 => (hex2(&b[0..2])?, hex2(&b[2..4])?, hex2(&b[4..6])?, 255),
        8 => (
            hex2(&b[0..2])?,
            hex2(&b[2..4])?,
            hex2(&b[4..6])?,
            hex2(&b[6..8])?,
        ),
        _ => return None,
    };
    Some(tiny_skia::Color::from_rgba8(r, g, bl, a))
}
