//! Persistent application configuration.
//!
//! Stored as JSON in a platform-appropriate config directory.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// On-disk configuration for the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target window application name (from `xcap::Window::app_name()`).
    ///
    /// If multiple windows share the same app name, the first match is used.
    pub app_name: String,

    /// Poll interval (seconds) for reading the chat panel.
    pub poll_delay_s: f32,

    /// Frames younger than this are reused instead of captured again.
    pub capture_refresh_ms: u64,

    /// Chat font, loaded from `<assets>/fonts/<font_name>.fontdef.json`.
    pub font_name: String,

    pub chat: ChatArea,

    /// Ink colors chat text is drawn in.
    pub colors: Vec<ie::Color>,

    pub chatbox: ie::ChatboxOptions,

    pub tuning: ie::OcrTuning,

    pub overlay: OverlayConfig,
}

/// Where chat lines sit in the captured window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChatArea {
    /// Left edge of the text.
    pub x: i32,
    /// Baseline of the newest (bottom) line.
    pub bottom_baseline: i32,
    /// Distance between baselines.
    pub line_height: i32,
    pub lines: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Let a group switch run out of order after waiting this long. `None` waits forever.
    pub stall_timeout_ms: Option<u64>,

    /// TTF/OTF font for overlay text. Text is not drawn without one.
    pub font_path: Option<PathBuf>,

    /// `0xAARRGGBB` outline around lines that just appeared.
    pub highlight_color: u32,

    /// `0xAARRGGBB` outline around lines seen before.
    pub seen_color: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "RuneScape".to_string(),
            poll_delay_s: 0.6,
            capture_refresh_ms: 100,
            font_name: "chat_8px".to_string(),
            chat: ChatArea {
                x: 10,
                bottom_baseline: 700,
                line_height: 14,
                lines: 8,
            },
            colors: vec![
                ie::Color::WHITE,
                ie::Color::new(0x00, 0xFF, 0x00),
                ie::Color::new(0x00, 0xFF, 0xFF),
                ie::Color::new(0xFF, 0x00, 0x00),
                ie::Color::new(0x7F, 0xA9, 0xFF),
                ie::Color::new(0xEB, 0x2F, 0x2F),
            ],
            chatbox: ie::ChatboxOptions::default(),
            tuning: ie::OcrTuning::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            stall_timeout_ms: None,
            font_path: None,
            highlight_color: 0xFFFFD700,
            seen_color: 0x80808080,
        }
    }
}

impl Config {
    /// Path to the config file.
    pub fn path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("config_dir() unavailable")?;
        Ok(base.join("glyphwatch.json"))
    }

    /// Load configuration from disk, falling back to defaults on missing file.
    pub fn load_or_default() -> Self {
        match Self::try_load() {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load config; using defaults");
                Self::default()
            }
        }
    }

    /// Try to load configuration from disk.
    pub fn try_load() -> Result<Self> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(&path).with_context(|| format!("read {:?}", path))?;
        Self::from_json(&json).with_context(|| format!("parse {:?}", path))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(&path, json).with_context(|| format!("write {:?}", path))?;
        Ok(())
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_secs_f32(self.poll_delay_s.max(0.05))
    }

    pub fn queue_policy(&self) -> overlay::QueuePolicy {
        overlay::QueuePolicy {
            stall_timeout: self.overlay.stall_timeout_ms.map(Duration::from_millis),
        }
    }

    /// Baselines of every chat line, newest (bottom) first.
    pub fn baselines(&self) -> impl Iterator<Item = i32> + '_ {
        (0..self.chat.lines as i32).map(|i| self.chat.bottom_baseline - i * self.chat.line_height)
    }
}
