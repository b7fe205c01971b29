use std::sync::Arc;
use std::time::{Duration, Instant};

use ie::Rgba;
use image::RgbaImage;

pub const MIN_TIMEOUT_MS: i64 = 1;
pub const MAX_TIMEOUT_MS: i64 = 20_000;
/// Lifetime of the composite produced by flushing a frozen group.
pub const COMPOSITE_TIMEOUT: Duration = Duration::from_secs(20);
pub const MAX_TEXT_SIZE: i32 = 50;
/// Thickest outline or line, in pixels.
pub const MAX_LINE_WIDTH: i32 = 16;
/// Largest image payload accepted, in bytes, before and after base64 decoding.
pub const MAX_IMAGE_BYTES: usize = 4_000_000;

/// Clamp a requested timeout to `[1 ms, 20 s]`.
pub fn clamp_timeout(timeout_ms: i64) -> Duration {
	Duration::from_millis(timeout_ms.clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS) as u64)
}

/// What a primitive looks like. Coordinates are relative to the tracked window.
#[derive(Debug, Clone)]
pub enum Shape {
	Rect {
		color: Rgba,
		x: i32,
		y: i32,
		width: i32,
		height: i32,
		line_width: u32,
	},
	Line {
		color: Rgba,
		line_width: u32,
		from: (i32, i32),
		to: (i32, i32),
	},
	Text {
		message: String,
		color: Rgba,
		/// Pixel height, at most [`MAX_TEXT_SIZE`].
		size: u32,
		x: i32,
		y: i32,
		centered: bool,
		shadow: bool,
	},
	Image {
		x: i32,
		y: i32,
		image: Arc<RgbaImage>,
	},
	/// Contents of a frozen group, shown together.
	Composite(Vec<Primitive>),
}

#[derive(Debug, Clone)]
pub struct Primitive {
	pub shape: Shape,
	pub z: i32,
	pub expires_at: Instant,
}

impl Primitive {
	pub fn new(shape: Shape, z: i32, timeout: Duration, now: Instant) -> Self {
		Self {
			shape,
			z,
			expires_at: now + timeout,
		}
	}

	pub fn is_expired(&self, now: Instant) -> bool {
		now >= self.expires_at
	}

	/// Drop expired composite children. Returns `false` when the primitive
	/// itself should go.
	pub fn prune(&mut self, now: Instant) -> bool {
		if self.is_expired(now) {
			return false;
		}
		match &mut self.shape {
			Shape::Composite(children) => {
				children.retain_mut(|child| child.prune(now));
				!children.is_empty()
			}
			_ => true,
		}
	}

	/// Earliest moment anything in this primitive expires.
	pub fn next_deadline(&self) -> Instant {
		match &self.shape {
			Shape::Composite(children) => children
				.iter()
				.map(Primitive::next_deadline)
				.fold(self.expires_at, Instant::min),
			_ => self.expires_at,
		}
	}

	pub(crate) fn set_z(&mut self, z: i32) {
		self.z = z;
		if let Shape::Composite(children) = &mut self.shape {
			children.iter_mut().for_each(|child| child.set_z(z));
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn rect() -> Shape {
		Shape::Rect { color: Rgba::new(255, 0, 0, 255), x: 0, y: 0, width: 4, height: 4, line_width: 1 }
	}

	#[test]
	fn test_timeout_clamp() {
		assert_eq!(clamp_timeout(999_999), Duration::from_millis(20_000));
		assert_eq!(clamp_timeout(0), Duration::from_millis(1));
		assert_eq!(clamp_timeout(-5), Duration::from_millis(1));
		assert_eq!(clamp_timeout(250), Duration::from_millis(250));
	}

	#[test]
	fn test_composite_prunes_children() {
		let now = Instant::now();
		let short = Primitive::new(rect(), 0, Duration::from_millis(10), now);
		let long = Primitive::new(rect(), 0, Duration::from_millis(100), now);
		let mut composite = Primitive::new(Shape::Composite(vec![short, long]), 0, COMPOSITE_TIMEOUT, now);

		assert_eq!(composite.next_deadline(), now + Duration::from_millis(10));
		assert!(composite.prune(now + Duration::from_millis(50)));
		let Shape::Composite(children) = &composite.shape else { unreachable!() };
		assert_eq!(children.len(), 1);

		assert!(!composite.prune(now + Duration::from_millis(100)));
	}
}
