// Number formatting, XML escaping and path emitters shared by the SVG writer.

use crate::model::LayoutPoint;
use std::fmt::Write as _;

/// Formats an attribute number the way D3 stringifies them: shortest round-trip decimal,
/// no `-0`, and float noise from our own arithmetic snapped away.
pub(crate) fn fmt(v: f64) -> String {
    let mut out = String::new();
    fmt_into(&mut out, v);
    out
}

pub(crate) fn fmt_into(out: &mut String, v: f64) {
    if !v.is_finite() {
        out.push('0');
        return;
    }
    let mut v = if v.abs() < 1e-9 { 0.0 } else { v };
    let nearest = v.round();
    if (v - nearest).abs() < 1e-6 {
        v = nearest;
    }
    if v == 0.0 {
        v = 0.0;
    }
    let _ = write!(out, "{v}");
}

/// Path coordinates use three fractional digits, like `d3-path`.
fn fmt_path_into(out: &mut String, v: f64) {
    if !v.is_finite() || v.abs() < 0.0005 {
        out.push('0');
        return;
    }
    let k = (v * 1000.0 + 0.5).floor() as i64;
    if k == 0 {
        out.push('0');
        return;
    }
    if k < 0 {
        out.push('-');
    }
    let abs = k.unsigned_abs();
    let _ = write!(out, "{}", abs / 1000);
    let frac = abs % 1000;
    if frac != 0 {
        let digits = format!("{frac:03}");
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_xml_into(&mut out, text);
    out
}

pub(crate) fn escape_xml_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}

fn emit_pair(out: &mut String, cmd: char, x: f64, y: f64) {
    out.push(cmd);
    fmt_path_into(out, x);
    out.push(',');
    fmt_path_into(out, y);
}

fn emit_cubic(out: &mut String, c: [f64; 6]) {
    out.push('C');
    for (i, v) in c.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        fmt_path_into(out, *v);
    }
}

/// Uniform cubic B-spline through `points` (D3 `curveBasis`).
pub(crate) fn curve_basis_path_d(points: &[LayoutPoint]) -> String {
    let mut out = String::with_capacity(points.len().saturating_mul(64));
    let Some(first) = points.first() else {
        return out;
    };
    emit_pair(&mut out, 'M', first.x, first.y);
    match points.len() {
        1 => return out,
        2 => {
            emit_pair(&mut out, 'L', points[1].x, points[1].y);
            return out;
        }
        _ => {}
    }

    let basis = |out: &mut String, p0: LayoutPoint, p1: LayoutPoint, p: LayoutPoint| {
        emit_cubic(
            out,
            [
                (2.0 * p0.x + p1.x) / 3.0,
                (2.0 * p0.y + p1.y) / 3.0,
                (p0.x + 2.0 * p1.x) / 3.0,
                (p0.y + 2.0 * p1.y) / 3.0,
                (p0.x + 4.0 * p1.x + p.x) / 6.0,
                (p0.y + 4.0 * p1.y + p.y) / 6.0,
            ],
        );
    };

    let (p0, p1) = (points[0], points[1]);
    emit_pair(
        &mut out,
        'L',
        (5.0 * p0.x + p1.x) / 6.0,
        (5.0 * p0.y + p1.y) / 6.0,
    );
    for w in points.windows(3) {
        basis(&mut out, w[0], w[1], w[2]);
    }
    let n = points.len();
    let (a, b) = (points[n - 2], points[n - 1]);
    basis(&mut out, a, b, b);
    emit_pair(&mut out, 'L', b.x, b.y);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_snaps_noise_and_negative_zero() {
        assert_eq!(fmt(f64::NAN), "0");
        assert_eq!(fmt(-0.0), "0");
        assert_eq!(fmt(1.0000004), "1");
        assert_eq!(fmt(12.5), "12.5");
        assert_eq!(fmt(-3.0), "-3");
    }

    #[test]
    fn basis_curve_starts_and_ends_on_endpoints() {
        let pts = [
            LayoutPoint::new(0.0, 0.0),
            LayoutPoint::new(10.0, 20.0),
            LayoutPoint::new(0.0, 40.0),
        ];
        let d = curve_basis_path_d(&pts);
        assert!(d.starts_with("M0,0L1.667,3.333C"));
        assert!(d.ends_with("L0,40"));
    }

    #[test]
    fn two_point_curve_is_a_line() {
        let pts = [LayoutPoint::new(1.5, 2.0), LayoutPoint::new(3.0, 4.25)];
        assert_eq!(curve_basis_path_d(&pts), "M1.5,2L3,4.25");
    }

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(escape_xml(r#"a<b & "c">"#), "a&lt;b &amp; &quot;c&quot;&gt;");
    }
}
