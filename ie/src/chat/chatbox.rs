//! Reading a whole chat line made of differently-colored runs.

use super::{LineScan, Rectangle, probe_chat_color, read_chat_line};
use crate::{Color, FontDefinition, Image, OcrTuning, pack_rgb};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct ChatboxOptions {
    /// Let the first run also extend leftwards from the start position.
    pub backwards: bool,
    /// Keep searching across gaps wider than one glyph.
    pub allow_gap: bool,
    /// Gap steps allowed before giving up. Defaults to [`OcrTuning::default_budget`].
    pub budget: Option<i32>,
    /// Keep reading after a gap once the first run was found.
    pub allow_multi_column: bool,
}

impl Default for ChatboxOptions {
    fn default() -> Self {
        Self {
            backwards: false,
            allow_gap: false,
            budget: None,
            allow_multi_column: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ChatboxFragment {
    /// `0xRRGGBB` of the run's ink.
    pub color: u32,
    pub text: String,
    /// Character offset of `text` within the full line.
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ChatboxLine {
    pub fragments: Vec<ChatboxFragment>,
    pub text: String,
    /// Union of the areas of every run that was read.
    pub area: Rectangle,
}

/// Probe area relative to the scan position and baseline.
const PROBE_DX: i32 = 0;
const PROBE_DY: i32 = -8;
const PROBE_W: i32 = 6;
const PROBE_H: i32 = 8;

/// Read one chat line starting at baseline position `(x, y)`.
///
/// `colors` lists the inks chat text may be drawn in. Consecutive runs of the
/// same color are merged into one fragment; a gap of a couple of pixels between
/// runs becomes a single space attached to the earlier fragment.
///
/// Returns `None` when nothing was read or the longest fragment is too short to
/// be real text.
pub fn read_chatbox_line(
    image: Image,
    x: i32,
    y: i32,
    colors: &[Color],
    font: &FontDefinition,
    options: ChatboxOptions,
    tuning: &OcrTuning,
) -> Option<ChatboxLine> {
    let font_w = font.width() as i32;
    let space = font.space_width() as i32;
    let mut budget = options.budget.unwrap_or(tuning.default_budget);

    let mut scan_x = x;
    let mut gap = 0i32;
    let mut text = String::new();
    let mut text_chars = 0usize;
    let mut fragments: Vec<ChatboxFragment> = Vec::new();
    let mut area: Option<Rectangle> = None;

    loop {
        let probe = Rectangle::new(scan_x + PROBE_DX, y + PROBE_DY, PROBE_W, PROBE_H);
        let scan = LineScan {
            backward: options.backwards && fragments.is_empty(),
            forward: true,
            scan_mode: true,
        };
        let run = probe_chat_color(image, probe, colors, tuning)
            .map(|color| (color, read_chat_line(image, color, font, scan_x, y, scan, tuning)))
            .filter(|(_, line)| !line.text.is_empty() && line.area.width > 0);

        let Some((color, line)) = run else {
            if !options.allow_multi_column && !fragments.is_empty() {
                break;
            }
            if gap >= font_w
                && (!options.allow_gap
                    || gap >= tuning.gap_run_limit
                    || scan_x - x >= tuning.gap_span_limit
                    || budget < 0)
            {
                break;
            }

            // Right after a run the line reader has already looked one space ahead.
            let step = if gap != 0 || fragments.is_empty() { 1 } else { space.max(1) };
            scan_x += step;
            gap += step;
            budget -= 1;
            continue;
        };

        if gap >= tuning.small_gap
            && let Some(last) = fragments.last_mut()
        {
            last.text.push(' ');
            text.push(' ');
            text_chars += 1;
        }

        let code = pack_rgb(color);
        match fragments.last_mut() {
            Some(last) if last.color == code => last.text.push_str(&line.text),
            _ => fragments.push(ChatboxFragment {
                color: code,
                text: line.text.clone(),
                index: text_chars,
            }),
        }

        text.push_str(&line.text);
        text_chars += line.text.chars().count();
        area = Some(match area {
            Some(a) => {
                let left = a.x.min(line.area.x);
                Rectangle::new(left, a.y, a.right().max(line.area.right()) - left, a.height)
            }
            None => line.area,
        });
        scan_x = (scan_x + space).max(line.area.right());
        gap = 0;
    }

    let longest = fragments
        .iter()
        .map(|f| f.text.trim().chars().count())
        .max()
        .unwrap_or(0);
    if longest < tuning.min_fragment_chars {
        tracing::trace!(x, y, longest, "chat line rejected as noise");
        return None;
    }

    Some(ChatboxLine {
        fragments,
        text,
        area: area.unwrap_or_default(),
    })
}
