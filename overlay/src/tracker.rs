use std::sync::mpsc::Receiver;

/// Screen rectangle of the tracked window, in physical pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowBounds {
	pub x: i32,
	pub y: i32,
	pub width: u32,
	pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
	Moved { x: i32, y: i32 },
	Resized { width: u32, height: u32 },
	/// Position and size changed together.
	Geometry(WindowBounds),
	Closed,
}

/// Source of the tracked window's position.
pub trait WindowTracker {
	/// `None` while the window does not exist.
	fn current_position(&self) -> Option<WindowBounds>;

	/// Receive every later change. Each call returns an independent receiver.
	fn subscribe(&self) -> Receiver<WindowEvent>;
}
