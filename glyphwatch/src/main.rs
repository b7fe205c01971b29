//! Glyphwatch.
//!
//! Reads the game's chat panel on a background thread and outlines new lines
//! on an overlay that follows the game window.
//!
//! Runs headless: the overlay is composed off screen at window size and never
//! shown in a native window. New chat lines go to the log, and with
//! `GLYPHWATCH_WRITE_IMAGE=1` every changed overlay frame is written to
//! `overlay.png`.

mod assets;
mod capture;
mod config;
mod watch;

use std::sync::Arc;
use std::sync::mpsc::{TryRecvError, channel};
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use ie::capture::CachedCapture;
use overlay::{Overlay, Renderer, Surface};

use crate::capture::{XcapTracker, XcapWindow};
use crate::config::Config;

/// Longest sleep between two overlay pumps.
const FRAME: Duration = Duration::from_millis(50);
/// How often window geometry is polled.
const TRACK_INTERVAL: Duration = Duration::from_millis(250);
/// Delay between attempts to find the window while it is gone.
const ATTACH_RETRY: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    // Structured logging. Use `RUST_LOG=info` etc.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::load_or_default();
    // Write the defaults out once so there is a file to edit.
    if let Ok(path) = Config::path()
        && !path.exists()
        && let Err(err) = config.save()
    {
        tracing::warn!(error = %err, "failed to write default config");
    }
    let font_dir = assets::resolve_font_dir(&config.font_name)?;
    let ie = Arc::new(ie::Ie::try_new(font_dir, config.tuning)?);
    tracing::info!(app = %config.app_name, font = %config.font_name, "starting");

    let capture = CachedCapture::new(
        XcapWindow::new(config.app_name.clone()),
        Duration::from_millis(config.capture_refresh_ms),
    );
    let tracker = XcapTracker::spawn(config.app_name.clone(), TRACK_INTERVAL);

    let mut renderer = Renderer::default();
    if let Some(path) = &config.overlay.font_path {
        match Renderer::load_font(path) {
            Ok(font) => renderer.set_font(Some(font)),
            Err(err) => tracing::warn!(error = %err, "overlay font unavailable; text is not drawn"),
        }
    }
    let mut overlay = Overlay::new(Surface::attach(&tracker), renderer, config.queue_policy());
    if !overlay.is_available() {
        tracing::info!(app = %config.app_name, "window not found yet; overlay waits for it");
    }

    let (tx, lines) = channel();
    let watch = watch::ChatWatch::spawn(config.clone(), ie, capture, overlay.handle(), tx);
    let write_image = std::env::var("GLYPHWATCH_WRITE_IMAGE").as_deref() == Ok("1");

    let mut last_attach = Instant::now();
    loop {
        if !overlay.is_available() && last_attach.elapsed() >= ATTACH_RETRY {
            last_attach = Instant::now();
            if let Some(surface) = Surface::attach(&tracker) {
                tracing::info!(
                    bounds = ?surface.bounds(),
                    origin = ?surface.to_screen(0, 0),
                    "window found; overlay attached"
                );
                overlay.attach(surface);
                watch.poll_now();
            }
        }

        if overlay.pump() > 0
            && write_image
            && let Some(image) = overlay.render()
            && let Err(err) = image.save("overlay.png")
        {
            tracing::warn!(error = %err, "failed to write overlay.png");
        }

        loop {
            match lines.try_recv() {
                Ok(line) => tracing::info!(baseline = line.baseline, text = %line.line.text, "chat"),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => bail!("chat watcher stopped"),
            }
        }

        let wait = overlay
            .next_deadline()
            .map_or(FRAME, |deadline| deadline.saturating_duration_since(Instant::now()).min(FRAME));
        std::thread::sleep(wait);
    }
}
