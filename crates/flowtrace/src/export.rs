//! Image export: decode a data URL, redraw it at a requested size, re-encode and save.
//!
//! The source may be an SVG document (as produced by [`crate::render::Canvas::to_svg`]) or an
//! already rasterized PNG/JPEG. Failures are logged and the export is skipped; nothing is
//! retried.

use crate::render::raster::{self, RasterError};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::percent_decode_str;
use std::io;
use std::path::{Path, PathBuf};

pub const PNG: &str = "image/png";
pub const JPEG: &str = "image/jpeg";
pub const SVG: &str = "image/svg+xml";

const JPEG_QUALITY: u8 = 92;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("not a data URL: {0}")]
    InvalidDataUrl(String),
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to decode {mime} image: {message}")]
    Decode { mime: String, message: String },
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error("failed to save exported image: {0}")]
    Save(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// A decoded `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    /// Parses `data:<mime>[;param]*[;base64],<payload>`. A missing mime means `text/plain`.
    pub fn parse(url: &str) -> Result<Self> {
        let rest = url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| ExportError::InvalidDataUrl(truncate(url)))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| ExportError::InvalidDataUrl(truncate(url)))?;

        let mut parts = header.split(';');
        let mime = match parts.next().map(str::trim) {
            Some(m) if !m.is_empty() => m.to_ascii_lowercase(),
            _ => "text/plain".to_string(),
        };
        let is_base64 = parts.any(|p| p.trim().eq_ignore_ascii_case("base64"));

        let bytes = if is_base64 {
            let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD.decode(compact)?
        } else {
            // Invalid escapes pass through literally, as browsers decode data URLs.
            percent_decode_str(payload).collect()
        };
        Ok(Self { mime, bytes })
    }

    pub fn to_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

fn truncate(url: &str) -> String {
    url.chars().take(32).collect()
}

/// Where exported images end up.
pub trait SaveTarget {
    /// Whether [`SaveTarget::download`] can save under a file name.
    fn supports_download(&self) -> bool;

    fn download(&mut self, filename: &str, bytes: &[u8]) -> io::Result<()>;

    /// Fallback when named downloads are unsupported: hand over the encoded image as a data URL.
    fn navigate(&mut self, data_url: &str) -> io::Result<()>;
}

/// Saves downloads as files inside one directory.
#[derive(Debug, Clone)]
pub struct DownloadDir {
    dir: PathBuf,
    saved: Vec<PathBuf>,
}

impl DownloadDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            saved: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written so far, in order.
    pub fn saved(&self) -> &[PathBuf] {
        &self.saved
    }
}

impl SaveTarget for DownloadDir {
    fn supports_download(&self) -> bool {
        true
    }

    fn download(&mut self, filename: &str, bytes: &[u8]) -> io::Result<()> {
        // Only the final path component is honored.
        let name = Path::new(filename).file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a file name: {filename:?}"),
            )
        })?;
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        std::fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Download via file");
        self.saved.push(path);
        Ok(())
    }

    fn navigate(&mut self, _data_url: &str) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "download directories do not navigate",
        ))
    }
}

/// A location that can only be pointed at a URL; named downloads are unsupported.
#[derive(Debug, Clone, Default)]
pub struct DataUrlLocation {
    pub href: Option<String>,
}

impl SaveTarget for DataUrlLocation {
    fn supports_download(&self) -> bool {
        false
    }

    fn download(&mut self, filename: &str, _bytes: &[u8]) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("cannot download {filename:?}: named downloads are unsupported"),
        ))
    }

    fn navigate(&mut self, data_url: &str) -> io::Result<()> {
        tracing::debug!("Download via location.href");
        self.href = Some(data_url.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Saved through [`SaveTarget::download`].
    Saved,
    /// Handed to [`SaveTarget::navigate`] as a data URL.
    Navigated,
    /// Decoding, encoding or saving failed; nothing was saved.
    Skipped,
}

/// Redraws the image in `source_data_url` at `size` (width, height), encodes it as
/// `content_type` and saves it under `filename`.
///
/// Unsupported content types fall back to PNG. JPEG output is flattened onto white.
pub fn export_image(
    size: (u32, u32),
    source_data_url: &str,
    filename: &str,
    content_type: &str,
    target: &mut dyn SaveTarget,
) -> ExportOutcome {
    tracing::info!(filename, content_type, "Downloading image");

    let encoded = match decode_and_draw(size, source_data_url, content_type) {
        Ok(encoded) => encoded,
        Err(err) => {
            tracing::error!(error = %err, "Image downloading failed");
            return ExportOutcome::Skipped;
        }
    };
    match save(target, filename, &encoded) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(error = %err, filename, "Saving exported image failed");
            ExportOutcome::Skipped
        }
    }
}

fn decode_and_draw(size: (u32, u32), source_data_url: &str, content_type: &str) -> Result<DataUrl> {
    let source = DataUrl::parse(source_data_url)?;
    let (width, height) = size;
    let mime = output_mime(content_type);
    let background = (mime == JPEG).then_some("white");
    let pixmap = draw(&source, width, height, background)?;

    let bytes = if mime == JPEG {
        raster::encode_jpeg(&pixmap, JPEG_QUALITY)?
    } else {
        pixmap.encode_png().map_err(|_| RasterError::PngEncode)?
    };
    Ok(DataUrl {
        mime: mime.to_string(),
        bytes,
    })
}

fn output_mime(content_type: &str) -> &'static str {
    match content_type.trim().to_ascii_lowercase().as_str() {
        JPEG | "image/jpg" => JPEG,
        PNG => PNG,
        other => {
            tracing::warn!(content_type = other, "unsupported export type, using PNG");
            PNG
        }
    }
}

fn draw(
    source: &DataUrl,
    width: u32,
    height: u32,
    background: Option<&str>,
) -> Result<tiny_skia::Pixmap> {
    if source.mime == SVG {
        let text = std::str::from_utf8(&source.bytes).map_err(|e| ExportError::Decode {
            mime: source.mime.clone(),
            message: e.to_string(),
        })?;
        let tree = raster::parse_svg(text)?;
        return Ok(raster::tree_to_pixmap(&tree, width, height, background)?);
    }

    let decoded = image::load_from_memory(&source.bytes).map_err(|e| ExportError::Decode {
        mime: source.mime.clone(),
        message: e.to_string(),
    })?;
    let rgba = decoded.to_rgba8();
    let (src_w, src_h) = rgba.dimensions();
    let mut src = raster::new_pixmap(src_w, src_h, None)?;
    for (dst, px) in src.pixels_mut().iter_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = px.0;
        *dst = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
    }

    let mut out = raster::new_pixmap(width, height, background)?;
    let paint = tiny_skia::PixmapPaint {
        quality: tiny_skia::FilterQuality::Bilinear,
        ..tiny_skia::PixmapPaint::default()
    };
    let transform = tiny_skia::Transform::from_scale(
        width as f32 / src_w as f32,
        height as f32 / src_h as f32,
    );
    out.draw_pixmap(0, 0, src.as_ref(), &paint, transform, None);
    Ok(out)
}

fn save(target: &mut dyn SaveTarget, filename: &str, encoded: &DataUrl) -> Result<ExportOutcome> {
    if target.supports_download() {
        target.download(filename, &encoded.bytes)?;
        Ok(ExportOutcome::Saved)
    } else {
        target.navigate(&encoded.to_url())?;
        Ok(ExportOutcome::Navigated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base64_and_percent_encoded_urls() {
        let b64 = DataUrl::parse("data:image/png;base64,AAEC").unwrap();
        assert_eq!(b64.mime, "image/png");
        assert_eq!(b64.bytes, vec![0, 1, 2]);

        let pct = DataUrl::parse("data:image/svg+xml;charset=utf-8,%3Csvg%2F%3E").unwrap();
        assert_eq!(pct.mime, SVG);
        assert_eq!(pct.bytes, b"<svg/>");

        let bare = DataUrl::parse("data:,hi").unwrap();
        assert_eq!(bare.mime, "text/plain");
    }

    #[test]
    fn rejects_malformed_urls() {
        assert!(matches!(
            DataUrl::parse("http://example.com/a.png"),
            Err(ExportError::InvalidDataUrl(_))
        ));
        assert!(matches!(
            DataUrl::parse("data:image/png;base64"),
            Err(ExportError::InvalidDataUrl(_))
        ));
    }

    #[test]
    fn invalid_percent_escapes_stay_literal() {
        assert_eq!(DataUrl::parse("data:text/plain,%G1").unwrap().bytes, b"%G1");
        assert_eq!(DataUrl::parse("data:text/plain,%+1").unwrap().bytes, b"%+1");
        assert_eq!(DataUrl::parse("data:text/plain,100%").unwrap().bytes, b"100%");
        assert_eq!(DataUrl::parse("data:text/plain,a%20b").unwrap().bytes, b"a b");
    }

    #[test]
    fn data_url_round_trips_through_base64() {
        let url = DataUrl {
            mime: PNG.to_string(),
            bytes: vec![137, 80, 78, 71],
        };
        assert_eq!(DataUrl::parse(&url.to_url()).unwrap(), url);
    }

    #[test]
    fn unknown_content_types_fall_back_to_png() {
        assert_eq!(output_mime("image/webp"), PNG);
        assert_eq!(output_mime("IMAGE/JPG"), JPEG);
    }
}
