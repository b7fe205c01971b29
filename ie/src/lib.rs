mod image;
pub use image::*;
mod color;
pub use color::*;
mod font;
pub use font::*;
mod tuning;
pub use tuning::*;

pub mod capture;
pub mod chat;
pub use chat::{ChatboxLine, ChatboxOptions, LineScan, OcrLine, Rectangle};

use std::path::PathBuf;

/// Chat reader bound to a font directory and a set of tuning constants.
pub struct Ie {
	fonts: FontRegistry,
	tuning: OcrTuning,
}

impl Ie {
	pub fn try_new(font_dir: impl Into<PathBuf>, tuning: OcrTuning) -> anyhow::Result<Self> {
		let font_dir = font_dir.into();
		anyhow::ensure!(font_dir.is_dir(), "font directory {font_dir:?} does not exist");

		Ok(Self {
			fonts: FontRegistry::new(font_dir),
			tuning,
		})
	}

	/// Reader over fonts that are registered by hand instead of loaded from disk.
	pub fn with_registry(fonts: FontRegistry, tuning: OcrTuning) -> Self {
		Self { fonts, tuning }
	}

	pub fn fonts(&self) -> &FontRegistry {
		&self.fonts
	}

	pub fn tuning(&self) -> &OcrTuning {
		&self.tuning
	}

	/// Read a multi-colored chat line at baseline `(x, y)` using the font called `font_name`.
	pub fn read_chatbox_line(
		&self,
		image: Image,
		x: i32,
		y: i32,
		colors: &[Color],
		font_name: &str,
		options: ChatboxOptions,
	) -> anyhow::Result<Option<ChatboxLine>> {
		let font = self.fonts.get(font_name)?;
		if write_image_enabled() {
			let width = image.width().saturating_sub(x.max(0) as u32);
			let region = image.crop_padded(x, y - font.base_y(), width, font.height());
			debug_dump(region.as_image(), &format!("chatbox_{y}"));
		}

		Ok(chat::read_chatbox_line(image, x, y, colors, &font, options, &self.tuning))
	}

	/// Read a single-colored run at baseline `(x, y)`.
	pub fn read_chat_line(
		&self,
		image: Image,
		color: Color,
		x: i32,
		y: i32,
		font_name: &str,
		scan: LineScan,
	) -> anyhow::Result<OcrLine> {
		let font = self.fonts.get(font_name)?;
		Ok(chat::read_chat_line(image, color, &font, x, y, scan, &self.tuning))
	}

	/// Guess which of `colors` the text in `area` is drawn in.
	pub fn probe_color(&self, image: Image, area: Rectangle, colors: &[Color]) -> Option<Color> {
		chat::probe_chat_color(image, area, colors, &self.tuning)
	}
}

fn write_image_enabled() -> bool {
	std::env::var_os("GLYPHWATCH_WRITE_IMAGE").is_some_and(|v| v == "1")
}

/// Writes `image` to `<name>.png` in the working directory.
fn debug_dump(image: Image, name: &str) {
	let path = format!("{name}.png");
	if let Err(err) = image.save_png(&path) {
		tracing::warn!(error = %err, path, "failed to write debug image");
	}
}
