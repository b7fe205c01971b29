//! Rate-limited frame capture.
//!
//! Capturing a window is expensive, and several readers usually want the same
//! frame. [`CachedCapture`] hands out the last frame while it is younger than
//! the refresh interval, and lets concurrent callers share one capture instead
//! of each starting their own.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};

use crate::OwnedImage;

/// Anything that can produce a still image of the tracked window.
pub trait FrameSource: Send + Sync {
    fn grab(&self) -> Result<OwnedImage>;
}

#[derive(Default)]
struct CacheState {
    last: Option<(Instant, Arc<OwnedImage>)>,
    in_flight: bool,
    /// Bumped whenever a capture finishes, so waiters can tell theirs completed.
    generation: u64,
    last_error: Option<String>,
}

pub struct CachedCapture<S> {
    source: S,
    refresh_interval: Duration,
    state: Mutex<CacheState>,
    done: Condvar,
}

impl<S: FrameSource> CachedCapture<S> {
    pub fn new(source: S, refresh_interval: Duration) -> Self {
        Self {
            source,
            refresh_interval,
            state: Mutex::new(CacheState::default()),
            done: Condvar::new(),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Return a frame no older than the refresh interval.
    pub fn grab(&self) -> Result<Arc<OwnedImage>> {
        let mut state = self.state.lock().expect("capture cache lock poisoned");

        loop {
            if let Some((at, frame)) = &state.last
                && at.elapsed() < self.refresh_interval
            {
                return Ok(frame.clone());
            }

            if !state.in_flight {
                break;
            }

            // Someone else is capturing; wait for their result instead of duplicating it.
            let generation = state.generation;
            while state.in_flight && state.generation == generation {
                state = self.done.wait(state).expect("capture cache lock poisoned");
            }
            if let Some(err) = &state.last_error {
                return Err(anyhow!("shared capture failed: {err}"));
            }
            if let Some((_, frame)) = &state.last {
                return Ok(frame.clone());
            }
        }

        state.in_flight = true;
        drop(state);

        // Do the expensive part without holding the lock.
        let result = self.source.grab();

        let mut state = self.state.lock().expect("capture cache lock poisoned");
        state.in_flight = false;
        state.generation += 1;
        let out = match result {
            Ok(frame) => {
                let frame = Arc::new(frame);
                state.last = Some((Instant::now(), frame.clone()));
                state.last_error = None;
                Ok(frame)
            }
            Err(err) => {
                tracing::warn!(error = %err, "frame capture failed");
                state.last_error = Some(err.to_string());
                Err(err)
            }
        };
        self.done.notify_all();
        out
    }

    /// Drop the cached frame so the next [`CachedCapture::grab`] captures anew.
    pub fn invalidate(&self) {
        self.state.lock().expect("capture cache lock poisoned").last = None;
    }
}
