//! Reading a run of same-colored characters.

use super::{Direction, Rectangle, match_glyph};
use crate::{Color, FontDefinition, Image, OcrTuning};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineScan {
    /// Also read leftwards from the start position.
    pub backward: bool,
    pub forward: bool,
    /// The start position is a guess: refuse secondary glyphs until the first
    /// real character, and give up entirely if nothing is there.
    pub scan_mode: bool,
}

impl Default for LineScan {
    fn default() -> Self {
        Self {
            backward: false,
            forward: true,
            scan_mode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct OcrLine {
    pub text: String,
    pub area: Rectangle,
}

/// Read characters starting at baseline position `(x, y)`.
///
/// A single unreadable position is taken as a space; two in a row end the line.
/// Secondary glyphs are held back until a primary glyph follows them, so a line
/// never ends on one.
pub fn read_chat_line(
    image: Image,
    ref_color: Color,
    font: &FontDefinition,
    x: i32,
    y: i32,
    scan: LineScan,
    tuning: &OcrTuning,
) -> OcrLine {
    let space = font.space_width() as i32;
    let mut text = String::new();
    let mut left = x;
    let mut right = x;
    let mut backward = scan.backward;

    if scan.forward {
        let mut shift = 0i32;
        let mut last_missed = false;
        let mut pending = String::new();

        loop {
            let at_start = scan.scan_mode && text.is_empty();
            let Some(m) = match_glyph(image, ref_color, font, x + shift, y, Direction::Forward, !at_start, tuning) else {
                if at_start {
                    backward = false;
                    break;
                }
                if last_missed {
                    break;
                }
                pending.push(' ');
                shift += space;
                last_missed = true;
                continue;
            };

            last_missed = false;
            shift += m.width as i32;
            if m.secondary {
                pending.push(m.character);
                continue;
            }

            text.push_str(&pending);
            text.push(m.character);
            pending.clear();
            right = x + shift;
        }
    }

    if backward {
        let mut shift = 0i32;
        let mut last_missed = false;
        let mut pending = String::new();

        loop {
            let Some(m) = match_glyph(image, ref_color, font, x + shift, y, Direction::Backward, true, tuning) else {
                if last_missed {
                    break;
                }
                pending.insert(0, ' ');
                shift -= space;
                last_missed = true;
                continue;
            };

            last_missed = false;
            shift -= m.width as i32;
            if m.secondary {
                pending.insert(0, m.character);
                continue;
            }

            pending.insert(0, m.character);
            pending.push_str(&text);
            text = std::mem::take(&mut pending);
            left = x + shift;
        }
    }

    OcrLine {
        text,
        area: Rectangle::new(left, y - font.base_y(), right - left, font.height() as i32),
    }
}
