//! Guessing the ink color of an upcoming chat run.

use super::Rectangle;
use crate::{Color, Image, OcrTuning};

/// Pixels fainter than this fraction of a candidate color are background.
const MIN_COVERAGE: f32 = 0.25;
/// Total support (in fully-covered pixel equivalents) needed to accept a color.
const MIN_SUPPORT: f32 = 1.0;

/// Pick the candidate color best supported by the pixels in `area`.
///
/// Every pixel is projected onto each candidate; a pixel supports the candidate
/// when it is a plausible darker copy of it (anti-aliasing over a dark chat
/// background). Parts of `area` outside the frame are ignored.
pub fn probe_chat_color(image: Image, area: Rectangle, colors: &[Color], tuning: &OcrTuning) -> Option<Color> {
    let mut best: Option<(Color, f32)> = None;

    for &color in colors {
        let ink = color.channels();
        let norm = ink.iter().map(|v| v * v).sum::<f32>();
        if norm == 0.0 {
            // Black ink is indistinguishable from the background.
            continue;
        }

        let mut support = 0.0f32;
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                let Some(pixel) = image.checked_pixel(x, y) else {
                    continue;
                };

                let p = pixel.channels();
                let alpha = ((p[0] * ink[0] + p[1] * ink[1] + p[2] * ink[2]) / norm).clamp(0.0, 1.0);
                if alpha < MIN_COVERAGE {
                    continue;
                }

                let residual = (0..3)
                    .map(|i| (p[i] - alpha * ink[i]).abs())
                    .fold(0.0f32, f32::max);
                if residual < tuning.probe_tolerance {
                    support += alpha;
                }
            }
        }

        if best.is_none_or(|(_, best_support)| support > best_support) {
            best = Some((color, support));
        }
    }

    best.filter(|(_, support)| *support >= MIN_SUPPORT)
        .map(|(color, _)| color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::testfont;

    const RED: Color = Color::new(255, 0, 0);
    const WHITE: Color = Color::WHITE;
    const CYAN: Color = Color::new(0, 200, 200);

    #[test]
    fn test_picks_drawn_color() {
        let font = testfont::font();
        let mut frame = testfont::blank(60, 30);
        testfont::draw_text(&mut frame, &font, "A", 10, 20, CYAN);

        let area = Rectangle::new(10, 12, 6, 8);
        let got = probe_chat_color(frame.as_image(), area, &[RED, WHITE, CYAN], &OcrTuning::default());
        assert_eq!(got, Some(CYAN));
    }

    #[test]
    fn test_accepts_dimmed_ink() {
        let mut frame = testfont::blank(10, 10);
        for x in 0..4 {
            frame.put_pixel(x, 2, Color::new(128, 0, 0));
        }
        let got = probe_chat_color(frame.as_image(), Rectangle::new(0, 0, 6, 8), &[WHITE, RED], &OcrTuning::default());
        assert_eq!(got, Some(RED));
    }

    #[test]
    fn test_blank_area_has_no_color() {
        let frame = testfont::blank(20, 20);
        let got = probe_chat_color(frame.as_image(), Rectangle::new(2, 2, 6, 8), &[RED, WHITE], &OcrTuning::default());
        assert_eq!(got, None);
    }

    #[test]
    fn test_area_outside_frame() {
        let frame = crate::OwnedImage::filled(5, 5, WHITE);
        let got = probe_chat_color(frame.as_image(), Rectangle::new(-20, -20, 6, 8), &[WHITE], &OcrTuning::default());
        assert_eq!(got, None);
    }
}
