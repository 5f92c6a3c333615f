// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Label layout: greedy word wrap and centring.
//
// All coordinates are PDF points with the origin at the bottom-left corner
// of the page, which is what `printpdf` expects for `SetTextCursor`.

use pex_core::error::{PexError, Result};
use pex_core::{LabelFont, LabelStyle, PaperGeometry};
use printpdf::Mm;
use tracing::debug;

use super::metrics::text_width;

/// Horizontal margin subtracted from the page width before wrapping.
pub const MARGIN_MM: f32 = 2.0;

/// One wrapped line with its final position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    /// Left edge of the text.
    pub x: f32,
    /// Baseline.
    pub y: f32,
    /// Measured width.
    pub width: f32,
}

/// A fully laid out label page.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelLayout {
    pub geometry: PaperGeometry,
    pub page_width: f32,
    pub page_height: f32,
    /// Maximum line width before wrapping kicks in.
    pub max_line_width: f32,
    pub style: LabelStyle,
    pub lines: Vec<PlacedLine>,
}

impl LabelLayout {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// Greedy word wrap of a single input line.
///
/// Words are accumulated while the measured width stays within `max_width`.
/// A word is never split; one that is wider than `max_width` on its own ends
/// up alone on its line. Whitespace-only input produces no lines.
pub fn wrap_line(text: &str, font: LabelFont, font_size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if text_width(font, &candidate, font_size) <= max_width {
            current = candidate;
        } else {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current = word.to_string();
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Lay out `lines` on a page of `geometry`, wrapping each input line and
/// centring the whole block vertically and every line horizontally.
pub fn layout_label<S: AsRef<str>>(
    lines: &[S],
    geometry: &PaperGeometry,
    style: &LabelStyle,
) -> Result<LabelLayout> {
    if !(style.font_size > 0.0 && style.line_height > 0.0) {
        return Err(PexError::Render(format!(
            "font size and line height must be positive, got {} / {}",
            style.font_size, style.line_height
        )));
    }

    let page_width = Mm(geometry.width_mm() as f32).into_pt().0;
    let page_height = Mm(geometry.height_mm() as f32).into_pt().0;
    let max_line_width = page_width - Mm(MARGIN_MM).into_pt().0;

    let wrapped: Vec<String> = lines
        .iter()
        .flat_map(|line| wrap_line(line.as_ref(), style.font, style.font_size, max_line_width))
        .collect();

    let total_height = style.line_height * wrapped.len() as f32;
    let first_baseline = (page_height + total_height) / 2.0 - style.font_size;

    let placed = wrapped
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let width = text_width(style.font, &text, style.font_size);
            PlacedLine {
                x: (page_width - width) / 2.0,
                y: first_baseline - i as f32 * style.line_height,
                width,
                text,
            }
        })
        .collect::<Vec<_>>();

    debug!(
        input_lines = lines.len(),
        wrapped_lines = placed.len(),
        page_width,
        page_height,
        "label layout complete"
    );

    Ok(LabelLayout {
        geometry: *geometry,
        page_width,
        page_height,
        max_line_width,
        style: *style,
        lines: placed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a6() -> PaperGeometry {
        PaperGeometry::new(105.0, 148.0).unwrap()
    }

    #[test]
    fn short_lines_are_not_wrapped() {
        let style = LabelStyle::default();
        let layout = layout_label(&["MODEL-X", "#TAG1"], &a6(), &style).unwrap();
        let texts: Vec<&str> = layout.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["MODEL-X", "#TAG1"]);
    }

    #[test]
    fn wrap_never_splits_words() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda";
        let wrapped = wrap_line(text, LabelFont::HelveticaBold, 10.0, 60.0);
        assert!(wrapped.len() > 1);

        let rejoined: Vec<&str> = wrapped.iter().flat_map(|l| l.split(' ')).collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);
    }

    #[test]
    fn wrapped_lines_fit_unless_single_word() {
        let max = 50.0;
        let text = "a supercalifragilisticexpialidocious word and more text here";
        for line in wrap_line(text, LabelFont::HelveticaBold, 10.0, max) {
            let width = text_width(LabelFont::HelveticaBold, &line, 10.0);
            assert!(width <= max || !line.contains(' '), "line too wide: {line}");
        }
    }

    #[test]
    fn over_wide_word_gets_its_own_line() {
        let wrapped = wrap_line(
            "ab SUPERCALIFRAGILISTIC cd",
            LabelFont::HelveticaBold,
            10.0,
            40.0,
        );
        assert_eq!(wrapped, ["ab", "SUPERCALIFRAGILISTIC", "cd"]);
    }

    #[test]
    fn blank_input_yields_no_lines() {
        assert!(wrap_line("   ", LabelFont::Helvetica, 10.0, 100.0).is_empty());
        let layout = layout_label(&["", "  "], &a6(), &LabelStyle::default()).unwrap();
        assert_eq!(layout.line_count(), 0);
    }

    #[test]
    fn block_is_vertically_centred() {
        let style = LabelStyle {
            font: LabelFont::HelveticaBold,
            font_size: 10.0,
            line_height: 12.0,
        };
        let layout = layout_label(&["one", "two", "three"], &a6(), &style).unwrap();

        let expected_first = (layout.page_height + 36.0) / 2.0 - 10.0;
        assert!((layout.lines[0].y - expected_first).abs() < 1e-3);
        assert!((layout.lines[0].y - layout.lines[1].y - 12.0).abs() < 1e-3);
        assert!((layout.lines[1].y - layout.lines[2].y - 12.0).abs() < 1e-3);
    }

    #[test]
    fn each_line_is_horizontally_centred() {
        let layout = layout_label(&["W", "WWWW"], &a6(), &LabelStyle::default()).unwrap();
        for line in &layout.lines {
            let right_gap = layout.page_width - (line.x + line.width);
            assert!((line.x - right_gap).abs() < 1e-3);
        }
        assert!(layout.lines[0].x > layout.lines[1].x);
    }

    #[test]
    fn layout_is_deterministic() {
        let style = LabelStyle::default();
        let input = ["A long product description that will need wrapping", "#TAG1"];
        let first = layout_label(&input, &a6(), &style).unwrap();
        let second = layout_label(&input, &a6(), &style).unwrap();
        assert_eq!(first.line_count(), second.line_count());
        let xs = |l: &LabelLayout| l.lines.iter().map(|p| p.x).collect::<Vec<_>>();
        assert_eq!(xs(&first), xs(&second));
    }

    #[test]
    fn page_size_is_converted_to_points() {
        let layout = layout_label(&["x"], &a6(), &LabelStyle::default()).unwrap();
        // 1mm = 72 / 25.4 pt
        assert!((layout.page_width - 105.0 * 72.0 / 25.4).abs() < 0.05);
        assert!((layout.page_height - 148.0 * 72.0 / 25.4).abs() < 0.05);
    }

    #[test]
    fn non_positive_sizes_are_rejected() {
        let style = LabelStyle {
            font_size: 0.0,
            ..LabelStyle::default()
        };
        assert!(matches!(
            layout_label(&["x"], &a6(), &style),
            Err(PexError::Render(_))
        ));
    }
}
