//! Software renderer for the overlay canvas.
//!
//! Everything is painted on the CPU into a transparent RGBA buffer the size of
//! the tracked window; the host decides how to put that buffer on screen.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use ab_glyph::{FontArc, PxScale};
use anyhow::{Context, Result, ensure};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{Rgba as Pixel, RgbaImage};
use imageproc::drawing::{Blend, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::GroupStore;
use crate::primitive::{MAX_IMAGE_BYTES, Primitive, Shape};

/// Maximum decoded images kept around (LRU eviction when exceeded).
const IMAGE_CACHE_MAX_ENTRIES: usize = 64;

/// Key for the image cache: (payload hash, payload length, row width).
type ImageCacheKey = (u64, usize, u32);

struct CachedImage {
	image: Arc<RgbaImage>,
	/// LRU tracking: bumped on each access.
	last_used: u64,
}

/// Decoded image payloads, so redrawing the same image every frame is cheap.
pub struct ImageCache {
	entries: HashMap<ImageCacheKey, CachedImage>,
	access_counter: u64,
	max_entries: usize,
}

impl Default for ImageCache {
	fn default() -> Self {
		Self::new(IMAGE_CACHE_MAX_ENTRIES)
	}
}

impl ImageCache {
	pub fn new(max_entries: usize) -> Self {
		Self {
			entries: HashMap::new(),
			access_counter: 0,
			max_entries: max_entries.max(1),
		}
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Decode base64 BGRA `data` with `width` pixels per row.
	pub fn decode(&mut self, data: &str, width: u32) -> Result<Arc<RgbaImage>> {
		let mut hasher = DefaultHasher::new();
		data.hash(&mut hasher);
		let key = (hasher.finish(), data.len(), width);

		self.access_counter += 1;
		if let Some(cached) = self.entries.get_mut(&key) {
			cached.last_used = self.access_counter;
			return Ok(cached.image.clone());
		}

		let image = Arc::new(decode_bgra(data, width)?);
		self.entries.insert(
			key,
			CachedImage {
				image: image.clone(),
				last_used: self.access_counter,
			},
		);
		self.evict_lru_if_needed();
		Ok(image)
	}

	/// Drop the least recently used quarter once over capacity.
	fn evict_lru_if_needed(&mut self) {
		if self.entries.len() <= self.max_entries {
			return;
		}

		let target = self.max_entries * 3 / 4;
		let mut by_age = self
			.entries
			.iter()
			.map(|(key, cached)| (*key, cached.last_used))
			.collect::<Vec<_>>();
		by_age.sort_by_key(|(_, last_used)| *last_used);

		let excess = self.entries.len() - target;
		for (key, _) in by_age.into_iter().take(excess) {
			self.entries.remove(&key);
		}
	}
}

fn decode_bgra(data: &str, width: u32) -> Result<RgbaImage> {
	ensure!(width > 0, "image width must be positive");
	let data = data.trim();
	let max_encoded = base64::encoded_len(MAX_IMAGE_BYTES, true).unwrap_or(usize::MAX);
	ensure!(data.len() <= max_encoded, "image data is {} base64 bytes, over the {max_encoded} byte limit", data.len());

	let mut bytes = STANDARD.decode(data).context("decode base64 image data")?;
	ensure!(
		bytes.len() <= MAX_IMAGE_BYTES,
		"image data is {} bytes, over the {MAX_IMAGE_BYTES} byte limit",
		bytes.len()
	);

	let stride = width as usize * 4;
	ensure!(
		!bytes.is_empty() && bytes.len() % stride == 0,
		"image data is {} bytes, not a whole number of {width}px rows",
		bytes.len()
	);

	ie::swap_red_blue(&mut bytes);
	let height = (bytes.len() / stride) as u32;
	RgbaImage::from_raw(width, height, bytes).context("image buffer size mismatch")
}

// ----------

pub struct Renderer {
	font: Option<FontArc>,
	images: ImageCache,
}

impl Default for Renderer {
	fn default() -> Self {
		Self::new(None)
	}
}

impl Renderer {
	/// Text primitives are skipped when `font` is `None`.
	pub fn new(font: Option<FontArc>) -> Self {
		Self {
			font,
			images: ImageCache::default(),
		}
	}

	/// Load a TTF/OTF font for text primitives.
	pub fn load_font(path: impl AsRef<Path>) -> Result<FontArc> {
		let path = path.as_ref();
		let bytes = std::fs::read(path).with_context(|| format!("read {:?}", path))?;
		FontArc::try_from_vec(bytes).with_context(|| format!("parse font {:?}", path))
	}

	pub fn set_font(&mut self, font: Option<FontArc>) {
		self.font = font;
	}

	pub fn images(&mut self) -> &mut ImageCache {
		&mut self.images
	}

	/// Paint every live primitive, bottom z first, onto a transparent canvas.
	pub fn render(&self, store: &GroupStore, width: u32, height: u32) -> RgbaImage {
		let mut canvas = Blend(RgbaImage::new(width, height));
		for primitive in store.visible() {
			self.paint(&mut canvas, primitive);
		}
		canvas.0
	}

	fn paint(&self, canvas: &mut Blend<RgbaImage>, primitive: &Primitive) {
		match &primitive.shape {
			Shape::Rect { color, x, y, width, height, line_width } => {
				let color = pixel(*color);
				let (cw, ch) = canvas.0.dimensions();
				let lw = (*line_width).max(1) as i64;
				// Thick outlines grow both inwards and outwards from the edge.
				for i in 0..lw {
					let inset = i - (lw - 1) / 2;
					// Edges past the canvas are clipped to one pixel outside it.
					let left = (*x as i64 + inset).max(-1);
					let top = (*y as i64 + inset).max(-1);
					let right = (*x as i64 + *width as i64 - inset).min(cw as i64 + 1);
					let bottom = (*y as i64 + *height as i64 - inset).min(ch as i64 + 1);
					if right > left && bottom > top {
						let rect = Rect::at(left as i32, top as i32).of_size((right - left) as u32, (bottom - top) as u32);
						draw_hollow_rect_mut(canvas, rect, color);
					}
				}
			}
			Shape::Line { color, line_width, from, to } => {
				let color = pixel(*color);
				let (x1, y1) = (from.0 as f64, from.1 as f64);
				let (x2, y2) = (to.0 as f64, to.1 as f64);
				let len = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();
				let (nx, ny) = if len > 0.0 { (-(y2 - y1) / len, (x2 - x1) / len) } else { (0.0, 0.0) };

				let lw = (*line_width).max(1);
				let (cw, ch) = canvas.0.dimensions();
				let bounds = (-1.0, -1.0, cw as f64 + 1.0, ch as f64 + 1.0);
				for i in 0..lw {
					let offset = i as f64 - (lw - 1) as f64 / 2.0;
					let (ox, oy) = (nx * offset, ny * offset);
					if let Some((a, b)) = clip_segment((x1 + ox, y1 + oy), (x2 + ox, y2 + oy), bounds) {
						draw_line_segment_mut(canvas, (a.0 as f32, a.1 as f32), (b.0 as f32, b.1 as f32), color);
					}
				}
			}
			Shape::Text { message, color, size, x, y, centered, shadow } => {
				let Some(font) = &self.font else {
					tracing::trace!(text = %message, "no overlay font loaded; skipping text");
					return;
				};
				let scale = PxScale::from(*size as f32);
				let (mut x, mut y) = (*x, *y);
				if *centered {
					let (w, h) = text_size(scale, font, message);
					x -= w as i32 / 2;
					y -= h as i32 / 2;
				}
				if *shadow {
					let black = Pixel([0, 0, 0, color.a]);
					draw_text_mut(canvas, black, x + 1, y + 1, scale, font, message);
				}
				draw_text_mut(canvas, pixel(*color), x, y, scale, font, message);
			}
			Shape::Image { x, y, image } => {
				image::imageops::overlay(&mut canvas.0, image.as_ref(), *x as i64, *y as i64);
			}
			Shape::Composite(children) => {
				for child in children {
					self.paint(canvas, child);
				}
			}
		}
	}
}

/// Part of the segment `a`-`b` inside `(min_x, min_y, max_x, max_y)` (Liang-Barsky).
fn clip_segment(a: (f64, f64), b: (f64, f64), (min_x, min_y, max_x, max_y): (f64, f64, f64, f64)) -> Option<((f64, f64), (f64, f64))> {
	let (dx, dy) = (b.0 - a.0, b.1 - a.1);
	let (mut t0, mut t1) = (0.0f64, 1.0f64);
	for (p, q) in [(-dx, a.0 - min_x), (dx, max_x - a.0), (-dy, a.1 - min_y), (dy, max_y - a.1)] {
		if p == 0.0 {
			if q < 0.0 {
				return None;
			}
			continue;
		}
		let t = q / p;
		if p < 0.0 {
			t0 = t0.max(t);
		} else {
			t1 = t1.min(t);
		}
		if t0 > t1 {
			return None;
		}
	}
	Some(((a.0 + t0 * dx, a.1 + t0 * dy), (a.0 + t1 * dx, a.1 + t1 * dy)))
}

fn pixel(color: ie::Rgba) -> Pixel<u8> {
	Pixel([color.r, color.g, color.b, color.a])
}
