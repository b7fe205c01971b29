use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

use anyhow::Result;
use ie::capture::{CachedCapture, FrameSource};
use overlay::{OverlayCommand, OverlayHandle};

use crate::config::Config;

const GROUP: &str = "chat";

#[derive(Debug, Clone)]
pub struct ChatLine {
	pub baseline: i32,
	pub line: ie::ChatboxLine,
	/// Not present in the previous poll.
	pub is_new: bool,
}

type Schedule = Arc<(Mutex<Instant>, Condvar)>;

/// Background worker reading the chat panel every poll interval.
pub struct ChatWatch {
	next_poll: Schedule,
}

impl ChatWatch {
	pub fn spawn<S: FrameSource + 'static>(
		config: Config,
		ie: Arc<ie::Ie>,
		capture: CachedCapture<S>,
		overlay: OverlayHandle,
		tx: Sender<ChatLine>,
	) -> Self {
		let next_poll: Schedule = Arc::new((Mutex::new(Instant::now()), Condvar::new()));
		let next_poll_thread = next_poll.clone();

		std::thread::spawn(move || {
			let mut highlighter = Highlighter::new(overlay);
			let mut previous: Vec<String> = Vec::new();

			// NOTE: best-effort worker; failures log and keep going.
			loop {
				// 1) Wait until it's time to poll (or until someone updates the schedule).
				{
					let (lock, cv) = &*next_poll_thread;
					let mut next = lock.lock().expect("next_poll lock poisoned");
					loop {
						let now = Instant::now();
						if *next <= now {
							break;
						}
						let dur = next.saturating_duration_since(now);
						let (guard, _timeout) = cv
							.wait_timeout(next, dur)
							.expect("next_poll lock poisoned during wait");
						next = guard;
					}
				}

				// 2) Do the expensive part without holding locks.
				match capture.grab() {
					Ok(frame) => match read_lines(&ie, frame.as_image(), &config, &previous) {
						Ok(lines) => {
							highlighter.show(&lines, &config);
							previous = lines.iter().map(|l| l.line.text.clone()).collect();
							for line in lines.into_iter().filter(|l| l.is_new) {
								if tx.send(line).is_err() {
									return;
								}
							}
						}
						Err(err) => tracing::warn!(error = %err, "failed to read chat"),
					},
					Err(err) => tracing::debug!(error = %err, "no frame this poll"),
				}

				// 3) Schedule the next poll.
				let candidate = Instant::now() + config.poll_delay();
				let (lock, cv) = &*next_poll_thread;
				let mut next = lock.lock().expect("next_poll lock poisoned");
				if candidate > *next {
					*next = candidate;
				}
				cv.notify_all();
			}
		});

		Self { next_poll }
	}

	/// Poll right away instead of waiting for the next interval.
	pub fn poll_now(&self) {
		let (lock, cv) = &*self.next_poll;
		*lock.lock().expect("next_poll lock poisoned") = Instant::now();
		cv.notify_all();
	}
}

/// Read every configured chat line of `frame`, newest first.
pub fn read_lines(ie: &ie::Ie, frame: ie::Image, config: &Config, previous: &[String]) -> Result<Vec<ChatLine>> {
	let mut out = Vec::new();
	for baseline in config.baselines() {
		let Some(line) = ie.read_chatbox_line(frame, config.chat.x, baseline, &config.colors, &config.font_name, config.chatbox)? else {
			continue;
		};
		let is_new = !previous.contains(&line.text);
		out.push(ChatLine { baseline, line, is_new });
	}
	Ok(out)
}

/// Outlines the chat lines on the overlay, replacing the previous outlines in one step.
struct Highlighter {
	overlay: OverlayHandle,
	next_call_id: u32,
}

impl Highlighter {
	fn new(overlay: OverlayHandle) -> Self {
		Self { overlay, next_call_id: 0 }
	}

	fn send(&mut self, command: OverlayCommand) {
		if let Err(err) = self.overlay.send(self.next_call_id, command) {
			tracing::debug!(error = %err, "overlay request dropped");
		}
		self.next_call_id = self.next_call_id.wrapping_add(1);
	}

	fn show(&mut self, lines: &[ChatLine], config: &Config) {
		// Outlines of the previous poll fade out as the new ones appear.
		let timeout = (config.poll_delay().as_millis() as i64) * 3 / 2;

		self.send(OverlayCommand::SetGroup { name: GROUP.to_string() });
		self.send(OverlayCommand::FreezeGroup { name: GROUP.to_string() });
		for line in lines {
			let area = line.line.area;
			let color = if line.is_new { config.overlay.highlight_color } else { config.overlay.seen_color };
			self.send(OverlayCommand::Rect {
				color,
				x: area.x - 2,
				y: area.y - 2,
				w: area.width + 4,
				h: area.height + 4,
				timeout,
				line_width: 1,
			});
		}
		self.send(OverlayCommand::ContinueGroup { name: GROUP.to_string() });
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use ie::{Color, FontDefinition, FontMetrics, FontRegistry, Glyph, OwnedImage, PixelWeight};
	use overlay::{Overlay, QueuePolicy, Renderer, Shape, Surface, WindowBounds};

	/// ASCII bitmaps with baseline 9 and box height 10.
	const GLYPHS: &[(char, u32, &[&str])] = &[
		('A', 6, &["", "", "", " ## ", "#  #", "#  #", "####", "#  #", "#  #", "#  #"]),
		('B', 6, &["", "", "", "### ", "#  #", "#  #", "### ", "#  #", "#  #", "### "]),
		('C', 5, &["", "", "", " ###", "#   ", "#   ", "#   ", "#   ", "#   ", " ###"]),
	];

	fn ink(rows: &[&str]) -> Vec<(u8, u8)> {
		rows.iter()
			.enumerate()
			.flat_map(|(dy, row)| row.chars().enumerate().filter(|(_, c)| *c == '#').map(move |(dx, _)| (dx as u8, dy as u8)))
			.collect()
	}

	fn reader() -> ie::Ie {
		let glyphs = GLYPHS
			.iter()
			.map(|(character, width, rows)| {
				let pixels = ink(rows)
					.into_iter()
					.map(|(dx, dy)| PixelWeight { dx, dy, coverage: 255, shadow: None })
					.collect::<Vec<_>>();
				Glyph { character: *character, width: *width, bonus: pixels.len() as i32, secondary: false, pixels }
			})
			.collect();
		let metrics = FontMetrics { space_width: 3, shadow: false, base_y: 9, min_rating: None, height: Some(10) };

		let fonts = FontRegistry::new("unused");
		fonts.insert("tiny", FontDefinition::new(glyphs, metrics).unwrap());
		ie::Ie::with_registry(fonts, ie::OcrTuning::default())
	}

	fn config() -> Config {
		let mut config = Config::default();
		config.font_name = "tiny".to_string();
		config.colors = vec![Color::WHITE];
		config.chat.x = 4;
		config.chat.bottom_baseline = 30;
		config.chat.line_height = 10;
		config.chat.lines = 3;
		config
	}

	/// "CAB" in white on the baseline at y = 20.
	fn frame() -> OwnedImage {
		let mut frame = OwnedImage::filled(60, 40, Color::BLACK);
		let mut x = 4;
		for ch in "CAB".chars() {
			let (_, width, rows) = GLYPHS.iter().find(|(c, _, _)| *c == ch).unwrap();
			for (dx, dy) in ink(rows) {
				frame.put_pixel(x + dx as u32, 11 + dy as u32, Color::WHITE);
			}
			x += width;
		}
		frame
	}

	#[test]
	fn test_reads_configured_baselines() {
		let config = config();
		let frame = frame();

		let lines = read_lines(&reader(), frame.as_image(), &config, &[]).unwrap();
		assert_eq!(lines.len(), 1);
		assert_eq!(lines[0].baseline, 20);
		assert_eq!(lines[0].line.text, "CAB");
		assert!(lines[0].is_new);

		let again = read_lines(&reader(), frame.as_image(), &config, &["CAB".to_string()]).unwrap();
		assert!(!again[0].is_new);
	}

	#[test]
	fn test_highlight_replaces_outlines_at_once() {
		let config = config();
		let bounds = WindowBounds { x: 0, y: 0, width: 60, height: 40 };
		let mut overlay = Overlay::new(Some(Surface::new(bounds)), Renderer::default(), QueuePolicy::default());
		let mut highlighter = Highlighter::new(overlay.handle());

		let lines = read_lines(&reader(), frame().as_image(), &config, &[]).unwrap();
		highlighter.show(&lines, &config);
		overlay.pump();

		let live = overlay.groups().live(GROUP);
		assert_eq!(live.len(), 1);
		assert!(matches!(&live[0].shape, Shape::Composite(children) if children.len() == 1));
		assert!(!overlay.groups().is_frozen(GROUP));

		highlighter.show(&lines, &config);
		overlay.pump();
		assert_eq!(overlay.groups().live(GROUP).len(), 2);
		assert_eq!(overlay.queue().last_call_id(), Some(7));
	}
}
