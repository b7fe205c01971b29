use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use overlay::{WindowBounds, WindowEvent, WindowTracker};
use xcap::image::EncodableLayout;

pub fn find_window(app_name: &str) -> Option<xcap::Window> {
	let windows = xcap::Window::all().ok()?;
	windows
		.into_iter()
		.find(|window| window.app_name().ok().as_deref() == Some(app_name))
}

pub fn window_bounds(app_name: &str) -> Option<WindowBounds> {
	let window = find_window(app_name)?;
	if window.is_minimized().unwrap_or(false) {
		return None;
	}

	Some(WindowBounds {
		x: window.x().ok()?,
		y: window.y().ok()?,
		width: window.width().ok()?,
		height: window.height().ok()?,
	})
}

/// Captures the first window whose app name matches.
pub struct XcapWindow {
	app_name: String,
}

impl XcapWindow {
	pub fn new(app_name: impl Into<String>) -> Self {
		Self { app_name: app_name.into() }
	}
}

impl ie::capture::FrameSource for XcapWindow {
	fn grab(&self) -> Result<ie::OwnedImage> {
		let window = find_window(&self.app_name).with_context(|| format!("no window named {:?}", self.app_name))?;
		let img = window.capture_image().context("capture window")?;
		ie::OwnedImage::from_rgba(img.width() as usize, img.as_bytes())
	}
}

type Subscribers = Arc<Mutex<Vec<Sender<WindowEvent>>>>;

/// Polls the window's geometry on a background thread and reports changes.
pub struct XcapTracker {
	app_name: String,
	subscribers: Subscribers,
}

impl XcapTracker {
	pub fn spawn(app_name: impl Into<String>, interval: Duration) -> Self {
		let app_name = app_name.into();
		let subscribers: Subscribers = Arc::new(Mutex::new(Vec::new()));

		let app_name_thread = app_name.clone();
		let subscribers_thread = subscribers.clone();
		std::thread::spawn(move || {
			let mut last = window_bounds(&app_name_thread);
			loop {
				std::thread::sleep(interval);

				let next = window_bounds(&app_name_thread);
				let Some(event) = geometry_change(last, next) else {
					continue;
				};
				last = next;
				tracing::debug!(?event, "tracked window changed");

				// Forget receivers that were dropped.
				subscribers_thread
					.lock()
					.expect("subscribers lock poisoned")
					.retain(|tx| tx.send(event).is_ok());
			}
		});

		Self { app_name, subscribers }
	}
}

impl WindowTracker for XcapTracker {
	fn current_position(&self) -> Option<WindowBounds> {
		window_bounds(&self.app_name)
	}

	fn subscribe(&self) -> Receiver<WindowEvent> {
		let (tx, rx) = channel();
		self.subscribers.lock().expect("subscribers lock poisoned").push(tx);
		rx
	}
}

/// Event describing the step from `last` to `next`, if anything changed.
fn geometry_change(last: Option<WindowBounds>, next: Option<WindowBounds>) -> Option<WindowEvent> {
	match (last, next) {
		(Some(_), None) => Some(WindowEvent::Closed),
		(None, Some(next)) => Some(WindowEvent::Geometry(next)),
		(Some(last), Some(next)) if last != next => {
			let moved = (last.x, last.y) != (next.x, next.y);
			let resized = (last.width, last.height) != (next.width, next.height);
			Some(match (moved, resized) {
				(true, false) => WindowEvent::Moved { x: next.x, y: next.y },
				(false, true) => WindowEvent::Resized {
					width: next.width,
					height: next.height,
				},
				_ => WindowEvent::Geometry(next),
			})
		}
		_ => None,
	}
}
