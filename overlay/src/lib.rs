mod command;
pub use command::*;
mod group;
pub use group::*;
mod handle;
pub use handle::*;
pub mod primitive;
pub use primitive::{Primitive, Shape};
mod queue;
pub use queue::*;
mod renderer;
pub use renderer::*;
mod surface;
pub use surface::*;
mod tracker;
pub use tracker::*;

use std::sync::mpsc::{Receiver, channel};
use std::time::Instant;

use anyhow::{Context, Result};
use image::RgbaImage;

use primitive::{MAX_LINE_WIDTH, MAX_TEXT_SIZE, clamp_timeout};

/// Owner of all overlay state. Lives on one thread; other threads talk to it
/// through an [`OverlayHandle`].
///
/// While no [`Surface`] is attached every request is silently dropped.
pub struct Overlay {
	queue: CallQueue,
	groups: GroupStore,
	surface: Option<Surface>,
	renderer: Renderer,
	requests: Receiver<(u32, OverlayCommand)>,
	handle: OverlayHandle,
}

impl Overlay {
	pub fn new(surface: Option<Surface>, renderer: Renderer, policy: QueuePolicy) -> Self {
		let (tx, requests) = channel();
		Self {
			queue: CallQueue::new(policy),
			groups: GroupStore::new(),
			surface,
			renderer,
			requests,
			handle: OverlayHandle { tx },
		}
	}

	pub fn handle(&self) -> OverlayHandle {
		self.handle.clone()
	}

	pub fn is_available(&self) -> bool {
		self.surface.is_some()
	}

	pub fn surface(&self) -> Option<&Surface> {
		self.surface.as_ref()
	}

	pub fn attach(&mut self, surface: Surface) {
		self.surface = Some(surface);
	}

	/// Drop the surface together with everything drawn on it.
	pub fn detach(&mut self) {
		self.surface = None;
		self.groups.reset();
		self.queue.reset();
	}

	pub fn groups(&self) -> &GroupStore {
		&self.groups
	}

	pub fn queue(&self) -> &CallQueue {
		&self.queue
	}

	/// Queue a request without running anything. Call id 0 starts a new session:
	/// every group and pending request is dropped first.
	pub fn enqueue(&mut self, call_id: u32, command: OverlayCommand) {
		if self.surface.is_none() {
			tracing::trace!(call_id, command = command.name(), "no overlay surface; dropping call");
			return;
		}

		if call_id == 0 {
			tracing::info!("overlay call id reset");
			self.groups.reset();
			self.queue.reset();
		}
		self.queue.push(call_id, command);
	}

	pub fn process_queue(&mut self) {
		self.process_queue_at(Instant::now());
	}

	/// Run queued requests until the queue is empty or a barrier has to wait.
	pub fn process_queue_at(&mut self, now: Instant) {
		while let Some((call_id, command)) = self.queue.pop_ready(now) {
			if let Err(err) = self.execute(&command, now) {
				tracing::error!(call_id, func = command.name(), ?command, error = %err, "overlay call failed");
			}
		}
	}

	pub fn submit(&mut self, call_id: u32, command: OverlayCommand) {
		self.submit_at(call_id, command, Instant::now());
	}

	pub fn submit_at(&mut self, call_id: u32, command: OverlayCommand, now: Instant) {
		self.enqueue(call_id, command);
		self.process_queue_at(now);
	}

	pub fn pump(&mut self) -> usize {
		self.pump_at(Instant::now())
	}

	/// Follow the window, take every request sent through handles, run what can
	/// run, and expire old primitives. Returns how many requests arrived.
	///
	/// All requests that arrived since the last pump are queued before any runs,
	/// so a batch delivered out of order still executes in call id order.
	pub fn pump_at(&mut self, now: Instant) -> usize {
		let closed = self.surface.as_mut().is_some_and(|surface| !surface.sync());
		if closed {
			tracing::info!("tracked window closed; overlay unavailable");
			self.detach();
		}

		let mut received = 0;
		while let Ok((call_id, command)) = self.requests.try_recv() {
			self.enqueue(call_id, command);
			received += 1;
		}

		self.process_queue_at(now);
		self.tick_at(now);
		received
	}

	pub fn tick_at(&mut self, now: Instant) {
		let removed = self.groups.tick(now);
		if removed > 0 {
			tracing::trace!(removed, "expired overlay primitives");
		}
	}

	/// When the owner should pump again even if no request arrives.
	pub fn next_deadline(&self) -> Option<Instant> {
		match (self.groups.next_deadline(), self.queue.stall_deadline()) {
			(Some(a), Some(b)) => Some(a.min(b)),
			(a, b) => a.or(b),
		}
	}

	/// Paint the current state at window size. `None` without a surface.
	pub fn render(&self) -> Option<RgbaImage> {
		let bounds = self.surface.as_ref()?.bounds();
		Some(self.renderer.render(&self.groups, bounds.width, bounds.height))
	}

	fn execute(&mut self, command: &OverlayCommand, now: Instant) -> Result<()> {
		match command {
			OverlayCommand::SetGroup { name } => self.groups.set_current(name),
			OverlayCommand::ClearGroup { name } => self.groups.clear(name),
			OverlayCommand::FreezeGroup { name } => self.groups.freeze(name),
			OverlayCommand::ContinueGroup { name } => self.groups.continue_group(name, now),
			OverlayCommand::RefreshGroup { name } => self.groups.refresh(name, now),
			OverlayCommand::SetGroupZOrder { name, z_index } => self.groups.set_z(name, *z_index),
			&OverlayCommand::Rect { color, x, y, w, h, timeout, line_width } => {
				// Negative extents grow the rectangle left/up, like most canvas APIs.
				let (x, width) = grow_back(x, w).context("rect x/w out of range")?;
				let (y, height) = grow_back(y, h).context("rect y/h out of range")?;
				let shape = Shape::Rect {
					color: ie::decode_color(color),
					x,
					y,
					width,
					height,
					line_width: line_width.clamp(1, MAX_LINE_WIDTH) as u32,
				};
				self.groups.draw(shape, clamp_timeout(timeout), now);
			}
			&OverlayCommand::Line { color, line_width, x1, y1, x2, y2, timeout } => {
				let shape = Shape::Line {
					color: ie::decode_color(color),
					line_width: line_width.clamp(1, MAX_LINE_WIDTH) as u32,
					from: (x1, y1),
					to: (x2, y2),
				};
				self.groups.draw(shape, clamp_timeout(timeout), now);
			}
			OverlayCommand::Text { message, color, size, x, y, timeout, font_name: _, centered, shadow } => {
				let shape = Shape::Text {
					message: message.clone(),
					color: ie::decode_color(*color),
					size: (*size).clamp(1, MAX_TEXT_SIZE) as u32,
					x: *x,
					y: *y,
					centered: *centered,
					shadow: *shadow,
				};
				self.groups.draw(shape, clamp_timeout(*timeout), now);
			}
			OverlayCommand::Image { x, y, data, width, timeout } => {
				let image = self.renderer.images().decode(data, *width)?;
				let shape = Shape::Image { x: *x, y: *y, image };
				self.groups.draw(shape, clamp_timeout(*timeout), now);
			}
		}
		Ok(())
	}
}

/// Start and length of a span whose length may be negative. `None` on overflow.
fn grow_back(start: i32, len: i32) -> Option<(i32, i32)> {
	if len < 0 {
		Some((start.checked_add(len)?, len.checked_neg()?))
	} else {
		Some((start, len))
	}
}
