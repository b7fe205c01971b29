//! Draw and group requests accepted by the overlay.

use serde::{Deserialize, Deserializer, Serialize};

/// One overlay request. Requests arrive as JSON objects tagged by `func`,
/// e.g. `{"func": "overlay_rect", "color": 4294901760, "x": 10, ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "func")]
pub enum OverlayCommand {
	/// Later draws attach to `name`.
	#[serde(rename = "overlay_set_group")]
	SetGroup { name: String },
	#[serde(rename = "overlay_clear_group")]
	ClearGroup { name: String },
	/// Draws into `name` are staged instead of shown.
	#[serde(rename = "overlay_freeze_group")]
	FreezeGroup { name: String },
	/// Show everything staged for `name` at once.
	#[serde(rename = "overlay_continue_group")]
	ContinueGroup { name: String },
	#[serde(rename = "overlay_refresh_group")]
	RefreshGroup { name: String },
	#[serde(rename = "overlay_set_group_z_index")]
	SetGroupZOrder { name: String, z_index: i32 },
	#[serde(rename = "overlay_rect")]
	Rect {
		#[serde(deserialize_with = "packed_color")]
		color: u32,
		x: i32,
		y: i32,
		w: i32,
		h: i32,
		timeout: i64,
		line_width: i32,
	},
	#[serde(rename = "overlay_line")]
	Line {
		#[serde(deserialize_with = "packed_color")]
		color: u32,
		line_width: i32,
		x1: i32,
		y1: i32,
		x2: i32,
		y2: i32,
		timeout: i64,
	},
	#[serde(rename = "overlay_text")]
	Text {
		message: String,
		#[serde(deserialize_with = "packed_color")]
		color: u32,
		size: i32,
		x: i32,
		y: i32,
		timeout: i64,
		#[serde(default)]
		font_name: String,
		#[serde(default)]
		centered: bool,
		#[serde(default)]
		shadow: bool,
	},
	/// `data` is base64 encoded BGRA, `width` pixels per row.
	#[serde(rename = "overlay_image")]
	Image {
		x: i32,
		y: i32,
		data: String,
		width: u32,
		timeout: i64,
	},
}

impl OverlayCommand {
	/// Barriers only run in strict call id order; draws run as soon as they are dequeued.
	pub fn is_barrier(&self) -> bool {
		matches!(
			self,
			Self::SetGroup { .. }
				| Self::ClearGroup { .. }
				| Self::FreezeGroup { .. }
				| Self::ContinueGroup { .. }
				| Self::RefreshGroup { .. }
		)
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::SetGroup { .. } => "overlay_set_group",
			Self::ClearGroup { .. } => "overlay_clear_group",
			Self::FreezeGroup { .. } => "overlay_freeze_group",
			Self::ContinueGroup { .. } => "overlay_continue_group",
			Self::RefreshGroup { .. } => "overlay_refresh_group",
			Self::SetGroupZOrder { .. } => "overlay_set_group_z_index",
			Self::Rect { .. } => "overlay_rect",
			Self::Line { .. } => "overlay_line",
			Self::Text { .. } => "overlay_text",
			Self::Image { .. } => "overlay_image",
		}
	}

	pub fn from_json(json: &str) -> anyhow::Result<Self> {
		use anyhow::Context;
		serde_json::from_str(json).context("parse overlay command")
	}
}

/// Colors are `0xAARRGGBB`; callers working with signed 32-bit integers send
/// opaque colors as negative numbers.
fn packed_color<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
	let value = i64::deserialize(deserializer)?;
	if value < i32::MIN as i64 || value > u32::MAX as i64 {
		return Err(serde::de::Error::custom(format!("color {value} does not fit in 32 bits")));
	}
	Ok(value as u32)
}
