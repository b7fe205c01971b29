use std::sync::mpsc::Sender;

use anyhow::{Result, anyhow};

use crate::OverlayCommand;

/// Sends overlay requests to the thread that owns the [`Overlay`](crate::Overlay).
///
/// Requests are queued until the owner calls [`Overlay::pump`](crate::Overlay::pump).
#[derive(Debug, Clone)]
pub struct OverlayHandle {
	pub(crate) tx: Sender<(u32, OverlayCommand)>,
}

impl OverlayHandle {
	pub fn send(&self, call_id: u32, command: OverlayCommand) -> Result<()> {
		self.tx
			.send((call_id, command))
			.map_err(|_| anyhow!("overlay has shut down"))
	}

	/// Parse a JSON request (`{"func": "overlay_rect", ...}`) and send it.
	pub fn send_json(&self, call_id: u32, json: &str) -> Result<()> {
		self.send(call_id, OverlayCommand::from_json(json)?)
	}
}
