//! Pan/zoom transform of the root group, with d3-zoom semantics.

use crate::model::LayoutPoint;
use crate::svg::util::fmt;
use std::fmt as std_fmt;

/// `translate(x,y) scale(k)`: a graph point `p` lands at `p * k + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomTransform {
    pub k: f64,
    pub x: f64,
    pub y: f64,
}

impl ZoomTransform {
    pub const IDENTITY: Self = Self {
        k: 1.0,
        x: 0.0,
        y: 0.0,
    };

    pub fn scale(self, k: f64) -> Self {
        Self { k: self.k * k, ..self }
    }

    /// Translation in the transform's own (scaled) coordinate system.
    pub fn translate(self, tx: f64, ty: f64) -> Self {
        Self {
            x: self.x + self.k * tx,
            y: self.y + self.k * ty,
            ..self
        }
    }

    pub fn apply(&self, p: LayoutPoint) -> LayoutPoint {
        LayoutPoint::new(p.x * self.k + self.x, p.y * self.k + self.y)
    }

    pub fn invert(&self, p: LayoutPoint) -> LayoutPoint {
        LayoutPoint::new((p.x - self.x) / self.k, (p.y - self.y) / self.k)
    }

    /// Drag by a screen-space delta.
    pub fn pan(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    /// Multiplies the scale by `factor`, clamped to the extent spanned by `min_k` and `max_k`,
    /// keeping the graph point under `anchor` (screen space) fixed.
    pub fn zoom_at(self, anchor: LayoutPoint, factor: f64, min_k: f64, max_k: f64) -> Self {
        if !factor.is_finite() || factor <= 0.0 {
            return self;
        }
        let (lo, hi) = zoom_extent(min_k, max_k);
        let k = (self.k * factor).clamp(lo, hi);
        let g = self.invert(anchor);
        Self {
            k,
            x: anchor.x - g.x * k,
            y: anchor.y - g.y * k,
        }
    }
}

/// Orders a zoom extent and drops bounds that are not finite and positive.
pub fn zoom_extent(min_k: f64, max_k: f64) -> (f64, f64) {
    let usable = |k: f64| k.is_finite() && k > 0.0;
    let lo = if usable(min_k) { min_k } else { f64::MIN_POSITIVE };
    let hi = if usable(max_k) { max_k } else { f64::MAX };
    (lo.min(hi), lo.max(hi))
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl std_fmt::Display for ZoomTransform {
    fn fmt(&self, f: &mut std_fmt::Formatter<'_>) -> std_fmt::Result {
        write!(
            f,
            "translate({},{}) scale({})",
            fmt(self.x),
            fmt(self.y),
            fmt(self.k)
        )
    }
}

/// Container height and initial transform for a laid-out graph of the given size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
    pub height: f64,
    pub transform: ZoomTransform,
}

pub const FIT_OFFSET_X: f64 = 35.0;
pub const FIT_OFFSET_Y: f64 = 30.0;
const FIT_EXTRA_HEIGHT: f64 = 60.0;
const FIT_MIN_HEIGHT: f64 = 300.0;
const FIT_EXTRA_WIDTH: f64 = 70.0;

pub fn fit(graph_width: f64, graph_height: f64, available_width: f64) -> Fit {
    let aspect = if graph_width > 0.0 {
        graph_height / graph_width
    } else {
        0.0
    };
    let height = ((available_width * aspect).min(graph_width * aspect) + FIT_EXTRA_HEIGHT)
        .max(FIT_MIN_HEIGHT);
    let k = (available_width / (graph_width + FIT_EXTRA_WIDTH)).min(1.0);
    Fit {
        height,
        transform: ZoomTransform::IDENTITY
            .scale(k)
            .translate(FIT_OFFSET_X, FIT_OFFSET_Y),
    }
}
