use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: Option<String>,
    pub font_size: f64,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: None,
            font_size: 14.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
    pub line_count: usize,
}

pub trait TextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics;
}

/// Font-free measurer: every display column is `font_size * char_width_factor` wide.
///
/// Output depends only on the input text, so layouts are stable across machines.
#[derive(Debug, Clone, Default)]
pub struct DeterministicTextMeasurer {
    pub char_width_factor: f64,
    pub line_height_factor: f64,
}

impl TextMeasurer for DeterministicTextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics {
        let char_width_factor = if self.char_width_factor == 0.0 {
            0.6
        } else {
            self.char_width_factor
        };
        let line_height_factor = if self.line_height_factor == 0.0 {
            1.2
        } else {
            self.line_height_factor
        };

        let font_size = style.font_size.max(1.0);
        let mut line_count = 0usize;
        let mut max_columns = 0usize;
        for line in text.split('\n') {
            line_count += 1;
            max_columns = max_columns.max(UnicodeWidthStr::width(line));
        }

        TextMetrics {
            width: max_columns as f64 * font_size * char_width_factor,
            height: line_count as f64 * font_size * line_height_factor,
            line_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_characters_take_two_columns() {
        let m = DeterministicTextMeasurer::default();
        let style = TextStyle {
            font_size: 10.0,
            ..Default::default()
        };
        let ascii = m.measure("ab", &style);
        let wide = m.measure("審査", &style);
        assert!((ascii.width - 12.0).abs() < 1e-9);
        assert!((wide.width - 24.0).abs() < 1e-9);
        assert_eq!(wide.line_count, 1);
    }

    #[test]
    fn height_scales_with_lines() {
        let m = DeterministicTextMeasurer::default();
        let metrics = m.measure("one\ntwo\nthree", &TextStyle::default());
        assert_eq!(metrics.line_count, 3);
        assert!((metrics.height - 3.0 * 14.0 * 1.2).abs() < 1e-9);
    }
}
