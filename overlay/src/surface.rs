use std::sync::mpsc::{Receiver, TryRecvError};

use crate::{WindowBounds, WindowEvent, WindowTracker};

/// The transparent canvas laid over the tracked window.
///
/// Primitives are stored relative to the window; the surface only records where
/// on screen that window currently is.
#[derive(Debug)]
pub struct Surface {
	bounds: WindowBounds,
	events: Option<Receiver<WindowEvent>>,
}

impl Surface {
	/// Fixed surface with no tracker behind it.
	pub fn new(bounds: WindowBounds) -> Self {
		Self { bounds, events: None }
	}

	/// Follow `tracker`. `None` when the window is not there.
	pub fn attach(tracker: &dyn WindowTracker) -> Option<Self> {
		let bounds = tracker.current_position()?;
		let events = tracker.subscribe();
		Some(Self {
			bounds,
			events: Some(events),
		})
	}

	pub fn bounds(&self) -> WindowBounds {
		self.bounds
	}

	/// Apply one event. Returns `false` once the window is gone.
	pub fn apply(&mut self, event: WindowEvent) -> bool {
		match event {
			WindowEvent::Moved { x, y } => {
				self.bounds.x = x;
				self.bounds.y = y;
			}
			WindowEvent::Resized { width, height } => {
				self.bounds.width = width;
				self.bounds.height = height;
			}
			WindowEvent::Geometry(bounds) => self.bounds = bounds,
			WindowEvent::Closed => return false,
		}
		true
	}

	/// Apply every queued tracker event. Returns `false` once the window is gone.
	pub fn sync(&mut self) -> bool {
		let Some(events) = self.events.take() else {
			return true;
		};
		loop {
			match events.try_recv() {
				Ok(event) => {
					if !self.apply(event) {
						return false;
					}
				}
				Err(TryRecvError::Empty) => break,
				// Tracker dropped: keep the last known geometry.
				Err(TryRecvError::Disconnected) => return true,
			}
		}
		self.events = Some(events);
		true
	}

	/// Window-relative point to screen coordinates.
	pub fn to_screen(&self, x: i32, y: i32) -> (i32, i32) {
		(self.bounds.x + x, self.bounds.y + y)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Mutex;
	use std::sync::mpsc::{Sender, channel};

	#[derive(Default)]
	struct FakeTracker {
		position: Option<WindowBounds>,
		subscribers: Mutex<Vec<Sender<WindowEvent>>>,
	}

	impl FakeTracker {
		fn emit(&self, event: WindowEvent) {
			for tx in self.subscribers.lock().unwrap().iter() {
				tx.send(event).unwrap();
			}
		}
	}

	impl WindowTracker for FakeTracker {
		fn current_position(&self) -> Option<WindowBounds> {
			self.position
		}

		fn subscribe(&self) -> Receiver<WindowEvent> {
			let (tx, rx) = channel();
			self.subscribers.lock().unwrap().push(tx);
			rx
		}
	}

	const START: WindowBounds = WindowBounds { x: 100, y: 50, width: 800, height: 600 };

	#[test]
	fn test_follows_window() {
		let tracker = FakeTracker { position: Some(START), ..Default::default() };
		let mut surface = Surface::attach(&tracker).unwrap();
		assert_eq!(surface.to_screen(10, 10), (110, 60));

		tracker.emit(WindowEvent::Moved { x: 300, y: 0 });
		tracker.emit(WindowEvent::Resized { width: 1024, height: 768 });
		assert!(surface.sync());
		assert_eq!(surface.bounds(), WindowBounds { x: 300, y: 0, width: 1024, height: 768 });
		assert_eq!(surface.to_screen(10, 10), (310, 10));

		tracker.emit(WindowEvent::Geometry(START));
		assert!(surface.sync());
		assert_eq!(surface.bounds(), START);
	}

	#[test]
	fn test_closed_window() {
		let tracker = FakeTracker { position: Some(START), ..Default::default() };
		let mut surface = Surface::attach(&tracker).unwrap();
		tracker.emit(WindowEvent::Closed);
		assert!(!surface.sync());
	}

	#[test]
	fn test_missing_window_has_no_surface() {
		let tracker = FakeTracker::default();
		for _ in 0..3 {
			assert!(Surface::attach(&tracker).is_none());
		}
		// Retries while the window is gone leave no subscriptions behind.
		assert!(tracker.subscribers.lock().unwrap().is_empty());
	}
}
