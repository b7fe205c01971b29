//! Bitmap font tables for the chat reader.
//!
//! A font is a list of glyph templates. Each template is a set of sample points
//! relative to the glyph's top-left corner, with the ink coverage expected at
//! that point (and, for shadowed fonts, how bright the ink is there).
//!
//! Fonts are compiled ahead of time; this module only parses and validates the
//! compiled JSON tables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail, ensure};
use serde::Deserialize;

/// One sample point of a glyph template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWeight {
    pub dx: u8,
    pub dy: u8,
    /// Ink alpha at this point (0..=255).
    pub coverage: u8,
    /// Ink luminance at this point for shadowed fonts (0 = shadow, 255 = full ink).
    pub shadow: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct Glyph {
    pub character: char,
    /// Horizontal advance.
    pub width: u32,
    /// Subtracted from the raw match score before ranking.
    pub bonus: i32,
    /// Only considered when the caller allows secondary glyphs.
    pub secondary: bool,
    pub pixels: Vec<PixelWeight>,
}

#[derive(Debug, Clone)]
pub struct FontDefinition {
    glyphs: Vec<Glyph>,
    width: u32,
    height: u32,
    space_width: u32,
    shadow: bool,
    base_y: i32,
    min_rating: Option<f32>,
}

/// Font-wide metrics that accompany a glyph table.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontMetrics {
    pub space_width: u32,
    pub shadow: bool,
    /// Distance from the top of the glyph box to the baseline.
    pub base_y: i32,
    /// Per-font override of the rejection threshold.
    pub min_rating: Option<f32>,
    /// Box height. Derived from the glyph footprints when `None`.
    pub height: Option<u32>,
}

impl FontDefinition {
    /// Build and validate a font. Fails when the table is empty, a glyph has no
    /// sample points, or shadow data is missing/unexpected.
    pub fn new(glyphs: Vec<Glyph>, metrics: FontMetrics) -> Result<Self> {
        ensure!(!glyphs.is_empty(), "font has no glyphs");

        for glyph in &glyphs {
            ensure!(
                !glyph.pixels.is_empty(),
                "glyph {:?} has no pixel weights",
                glyph.character
            );
            ensure!(glyph.width > 0, "glyph {:?} has zero width", glyph.character);
            for px in &glyph.pixels {
                ensure!(
                    px.shadow.is_some() == metrics.shadow,
                    "glyph {:?}: shadow data does not match the font's shadow flag",
                    glyph.character
                );
            }
        }

        let width = glyphs.iter().map(|g| g.width).max().unwrap_or(0);
        let footprint = glyphs
            .iter()
            .flat_map(|g| g.pixels.iter().map(|p| p.dy as u32 + 1))
            .max()
            .unwrap_or(0);
        let height = metrics.height.unwrap_or(footprint).max(footprint);

        Ok(Self {
            glyphs,
            width,
            height,
            space_width: metrics.space_width,
            shadow: metrics.shadow,
            base_y: metrics.base_y,
            min_rating: metrics.min_rating,
        })
    }

    /// Parse a compiled font table.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawFont = serde_json::from_str(json).context("parse font table")?;
        raw.try_into_font()
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    /// Widest glyph advance.
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn space_width(&self) -> u32 {
        self.space_width
    }

    pub fn shadow(&self) -> bool {
        self.shadow
    }

    pub fn base_y(&self) -> i32 {
        self.base_y
    }

    pub fn min_rating(&self) -> Option<f32> {
        self.min_rating
    }
}

// ----------

#[derive(Debug, Deserialize)]
struct RawFont {
    chars: Vec<RawGlyph>,
    spacewidth: u32,
    #[serde(default)]
    shadow: bool,
    basey: i32,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    minrating: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct RawGlyph {
    chr: String,
    width: u32,
    #[serde(default)]
    bonus: i32,
    #[serde(default)]
    secondary: bool,
    pixels: Vec<i64>,
}

impl RawFont {
    fn try_into_font(self) -> Result<FontDefinition> {
        let stride = if self.shadow { 4 } else { 3 };

        let glyphs = self
            .chars
            .into_iter()
            .map(|raw| {
                let mut chars = raw.chr.chars();
                let (Some(character), None) = (chars.next(), chars.next()) else {
                    bail!("glyph {:?} must be exactly one character", raw.chr);
                };
                ensure!(
                    raw.pixels.len() % stride == 0,
                    "glyph {character:?}: pixel list length {} is not a multiple of {stride}",
                    raw.pixels.len()
                );

                let pixels = raw
                    .pixels
                    .chunks_exact(stride)
                    .map(|p| {
                        let byte = |v: i64| {
                            u8::try_from(v).with_context(|| {
                                format!("glyph {character:?}: pixel value {v} out of range")
                            })
                        };
                        Ok(PixelWeight {
                            dx: byte(p[0])?,
                            dy: byte(p[1])?,
                            coverage: byte(p[2])?,
                            shadow: if stride == 4 { Some(byte(p[3])?) } else { None },
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;

                Ok(Glyph {
                    character,
                    width: raw.width,
                    bonus: raw.bonus,
                    secondary: raw.secondary,
                    pixels,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        FontDefinition::new(
            glyphs,
            FontMetrics {
                space_width: self.spacewidth,
                shadow: self.shadow,
                base_y: self.basey,
                min_rating: self.minrating,
                height: self.height,
            },
        )
    }
}

// ----------

/// Loads fonts by name from a directory and keeps them for the process lifetime.
///
/// Font `name` lives at `<dir>/<name>.fontdef.json`.
pub struct FontRegistry {
    dir: PathBuf,
    loaded: Mutex<HashMap<String, Arc<FontDefinition>>>,
}

impl FontRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Register an already-built font under `name`, replacing any previous one.
    pub fn insert(&self, name: impl Into<String>, font: FontDefinition) -> Arc<FontDefinition> {
        let font = Arc::new(font);
        self.loaded
            .lock()
            .expect("font registry lock poisoned")
            .insert(name.into(), font.clone());
        font
    }

    pub fn get(&self, name: &str) -> Result<Arc<FontDefinition>> {
        if let Some(font) = self
            .loaded
            .lock()
            .expect("font registry lock poisoned")
            .get(name)
        {
            return Ok(font.clone());
        }

        ensure!(
            !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
            "invalid font name {name:?}"
        );

        // Parse without holding the lock; a racing load of the same font is harmless.
        let path = self.dir.join(format!("{name}.fontdef.json"));
        let json = std::fs::read_to_string(&path).with_context(|| format!("read {:?}", path))?;
        let font = FontDefinition::from_json(&json).with_context(|| format!("load font {name:?}"))?;
        tracing::debug!(font = name, glyphs = font.glyphs().len(), "loaded font");

        let font = Arc::new(font);
        Ok(self
            .loaded
            .lock()
            .expect("font registry lock poisoned")
            .entry(name.to_string())
            .or_insert(font)
            .clone())
    }
}
