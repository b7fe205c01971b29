//! Single character matching.

use crate::{Color, FontDefinition, Image, OcrTuning, can_blend};

/// Which edge of the glyph is anchored at the scan position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Left edge at `x`, reading left-to-right.
    Forward,
    /// Right edge at `x`, reading right-to-left.
    Backward,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlyphMatch {
    pub character: char,
    /// Index of the winning glyph in the font table.
    pub glyph: usize,
    pub width: u32,
    pub secondary: bool,
    /// Anchor position as passed in (baseline y).
    pub x: i32,
    pub y: i32,
    /// Summed blend penalty.
    pub score: f32,
    /// `score - bonus`, the ranking key.
    pub size_score: f32,
}

/// Find the glyph that best explains the pixels at `(x, y)`.
///
/// `y` is the text baseline. Returns `None` when the font's box does not fit in
/// the frame at this anchor, or when even the best glyph scores above the
/// rejection threshold.
#[allow(clippy::too_many_arguments)]
pub fn match_glyph(
    image: Image,
    ref_color: Color,
    font: &FontDefinition,
    x: i32,
    y: i32,
    direction: Direction,
    allow_secondary: bool,
    tuning: &OcrTuning,
) -> Option<GlyphMatch> {
    let top = y - font.base_y();
    let width = image.width() as i64;
    let height = image.height() as i64;
    let font_w = font.width() as i64;

    if top < 0 || top as i64 + font.height() as i64 >= height {
        return None;
    }
    let fits = match direction {
        Direction::Forward => x >= 0 && x as i64 + font_w <= width,
        Direction::Backward => x as i64 - font_w >= 0 && x as i64 <= width,
    };
    if !fits {
        return None;
    }

    let ink = ref_color.channels();
    let mut best: Option<(usize, f32, f32)> = None;

    for (index, glyph) in font.glyphs().iter().enumerate() {
        if glyph.secondary && !allow_secondary {
            continue;
        }

        let left = match direction {
            Direction::Forward => x,
            Direction::Backward => x - glyph.width as i32,
        };

        let mut score = 0.0f32;
        for px in &glyph.pixels {
            let Some(pixel) = image.checked_pixel(left + px.dx as i32, top + px.dy as i32) else {
                // Template wider than its advance hanging off the frame edge.
                score = f32::INFINITY;
                break;
            };

            let expected = match px.shadow {
                Some(lum) if font.shadow() => {
                    let lum = lum as f32 / 255.0;
                    [ink[0] * lum, ink[1] * lum, ink[2] * lum]
                }
                _ => ink,
            };
            score += can_blend(pixel, expected, px.coverage as f32 / 255.0).max(0.0);
        }

        let size_score = score - glyph.bonus as f32;
        // Strict comparison keeps the earliest glyph on ties.
        if best.is_none_or(|(_, _, best_size)| size_score < best_size) {
            best = Some((index, score, size_score));
        }
    }

    let (index, score, size_score) = best?;
    if score > tuning.reject_threshold_for(font) {
        return None;
    }

    let glyph = &font.glyphs()[index];
    Some(GlyphMatch {
        character: glyph.character,
        glyph: index,
        width: glyph.width,
        secondary: glyph.secondary,
        x,
        y,
        score,
        size_score,
    })
}
