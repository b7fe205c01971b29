//! Empirical constants of the chat reader.
//!
//! These values were tuned for the stock 8px chat font. Fonts with a different
//! pixel density need their own values, so they are loadable from config.

/// Thresholds and gap limits used while scanning chat lines.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct OcrTuning {
    /// A glyph whose raw score exceeds this is not a match.
    pub reject_threshold: f32,
    /// Longest horizontal gap (px) bridged between fragments when gaps are allowed.
    pub gap_run_limit: i32,
    /// Furthest distance (px) from the start position the gap search may reach.
    pub gap_span_limit: i32,
    /// Default number of single-pixel gap steps a chatbox read may take.
    pub default_budget: i32,
    /// Gaps at least this wide become a space between fragments.
    pub small_gap: i32,
    /// Lines whose longest fragment is shorter than this are treated as noise.
    pub min_fragment_chars: usize,
    /// Largest per-channel residual for a pixel to count toward a probed color.
    pub probe_tolerance: f32,
}

impl OcrTuning {
    pub const CHAT_8PX: Self = Self {
        reject_threshold: 400.0,
        gap_run_limit: 20,
        gap_span_limit: 100,
        default_budget: 15,
        small_gap: 2,
        min_fragment_chars: 3,
        probe_tolerance: 30.0,
    };

    /// Rejection threshold for `font`, honoring a per-font override.
    pub fn reject_threshold_for(&self, font: &crate::FontDefinition) -> f32 {
        font.min_rating().unwrap_or(self.reject_threshold)
    }
}

impl Default for OcrTuning {
    fn default() -> Self {
        Self::CHAT_8PX
    }
}
