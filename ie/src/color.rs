//! Packed color codes and blend scoring.

use crate::Color;

/// Straight-alpha RGBA color as used by overlay commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Deserialize, serde::Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Decode a `0xAARRGGBB` integer.
#[inline]
pub const fn decode_color(packed: u32) -> Rgba {
    Rgba {
        r: (packed >> 16) as u8,
        g: (packed >> 8) as u8,
        b: packed as u8,
        a: (packed >> 24) as u8,
    }
}

/// Inverse of [`decode_color`].
#[inline]
pub const fn encode_color(color: Rgba) -> u32 {
    (color.a as u32) << 24 | (color.r as u32) << 16 | (color.g as u32) << 8 | color.b as u32
}

/// `0xRRGGBB` code used to tag chat fragments.
#[inline]
pub const fn pack_rgb(color: Color) -> u32 {
    (color.r as u32) << 16 | (color.g as u32) << 8 | color.b as u32
}

/// Largest factor by which an off-target pixel is amplified.
const MAX_BLEND_FACTOR: f32 = 51.0;

/// Penalty for explaining `observed` as `expected` ink drawn with `coverage`
/// (0..=1) over some unknown background.
///
/// A pixel is feasible when a background in `0..=255` exists for every channel,
/// i.e. the observed value lies in `[c*e, c*e + (1-c)*255]`. The penalty is the
/// largest per-channel distance to that interval, scaled by `1 / (1 - c)` (how
/// far the implied background leaves its range), capped at [`MAX_BLEND_FACTOR`].
///
/// Zero coverage is always feasible. At full coverage the penalty is zero only
/// when `observed == expected`.
pub fn can_blend(observed: Color, expected: [f32; 3], coverage: f32) -> f32 {
    let coverage = coverage.clamp(0.0, 1.0);
    if coverage == 0.0 {
        return 0.0;
    }

    let factor = if coverage >= 1.0 {
        MAX_BLEND_FACTOR
    } else {
        (1.0 / (1.0 - coverage)).min(MAX_BLEND_FACTOR)
    };

    let observed = observed.channels();
    let mut worst = 0.0f32;
    for i in 0..3 {
        let low = coverage * expected[i];
        let high = low + (1.0 - coverage) * 255.0;
        let distance = if observed[i] < low {
            low - observed[i]
        } else if observed[i] > high {
            observed[i] - high
        } else {
            0.0
        };
        worst = worst.max(distance);
    }

    worst * factor
}
