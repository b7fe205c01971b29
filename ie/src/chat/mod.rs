//! Chat panel text reader.
//!
//! Chat text is a small bitmap font drawn in a handful of known colors. Rather
//! than running a general OCR engine, each character position is scored
//! against every glyph template of the font and the best fit wins:
//!
//! * [`glyph`] scores one position,
//! * [`line`] walks a run of same-colored characters,
//! * [`chatbox`] stitches differently-colored runs into one line,
//! * [`probe`] guesses which color the next run is drawn in.

pub mod chatbox;
pub mod glyph;
pub mod line;
pub mod probe;

pub use chatbox::{ChatboxFragment, ChatboxLine, ChatboxOptions, read_chatbox_line};
pub use glyph::{Direction, GlyphMatch, match_glyph};
pub use line::{LineScan, OcrLine, read_chat_line};
pub use probe::probe_chat_color;

/// Axis-aligned rectangle in frame coordinates. May start at negative coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }
}

/// Synthetic fonts and frames shared by the reader tests.
#[cfg(test)]
pub(crate) mod testfont {
    use crate::{Color, FontDefinition, FontMetrics, Glyph, OwnedImage, PixelWeight};

    pub const BASE_Y: i32 = 9;
    pub const SPACE: u32 = 3;

    /// Full-coverage sample points from an ASCII bitmap ('#' = ink).
    pub fn glyph(character: char, width: u32, rows: &[&str]) -> Glyph {
        let pixels = rows
            .iter()
            .enumerate()
            .flat_map(|(dy, row)| {
                row.chars().enumerate().filter(|(_, c)| *c == '#').map(move |(dx, _)| PixelWeight {
                    dx: dx as u8,
                    dy: dy as u8,
                    coverage: 255,
                    shadow: None,
                })
            })
            .collect::<Vec<_>>();
        let bonus = pixels.len() as i32;

        Glyph {
            character,
            width,
            bonus,
            secondary: false,
            pixels,
        }
    }

    pub fn glyph_a() -> Glyph {
        glyph('A', 6, &[
            "", "", "",
            " ## ",
            "#  #",
            "#  #",
            "####",
            "#  #",
            "#  #",
            "#  #",
        ])
    }

    pub fn glyph_b() -> Glyph {
        glyph('B', 6, &[
            "", "", "",
            "### ",
            "#  #",
            "#  #",
            "### ",
            "#  #",
            "#  #",
            "### ",
        ])
    }

    pub fn glyph_c() -> Glyph {
        glyph('C', 5, &[
            "", "", "",
            " ###",
            "#   ",
            "#   ",
            "#   ",
            "#   ",
            "#   ",
            " ###",
        ])
    }

    /// Narrow apostrophe-like mark, only valid after other text.
    pub fn glyph_tick() -> Glyph {
        Glyph {
            secondary: true,
            ..glyph('\'', 2, &["", "", "", "#", "#"])
        }
    }

    pub fn font_with(glyphs: Vec<Glyph>) -> FontDefinition {
        FontDefinition::new(
            glyphs,
            FontMetrics {
                space_width: SPACE,
                shadow: false,
                base_y: BASE_Y,
                min_rating: None,
                height: Some(10),
            },
        )
        .unwrap()
    }

    pub fn font() -> FontDefinition {
        font_with(vec![glyph_a(), glyph_b(), glyph_c(), glyph_tick()])
    }

    pub fn blank(width: u32, height: u32) -> OwnedImage {
        OwnedImage::filled(width, height, Color::BLACK)
    }

    /// Draw `text` starting at baseline `(x, y)`, advancing by glyph width.
    /// Spaces advance by [`SPACE`]. Returns the x after the last glyph.
    pub fn draw_text(frame: &mut OwnedImage, font: &FontDefinition, text: &str, x: i32, y: i32, color: Color) -> i32 {
        let mut cursor = x;
        for ch in text.chars() {
            if ch == ' ' {
                cursor += SPACE as i32;
                continue;
            }
            let glyph = font
                .glyphs()
                .iter()
                .find(|g| g.character == ch)
                .unwrap_or_else(|| panic!("no glyph for {ch:?}"));
            for px in &glyph.pixels {
                let px_x = cursor + px.dx as i32;
                let px_y = y - font.base_y() + px.dy as i32;
                if px_x >= 0 && px_y >= 0 {
                    frame.put_pixel(px_x as u32, px_y as u32, color);
                }
            }
            cursor += glyph.width as i32;
        }
        cursor
    }
}
