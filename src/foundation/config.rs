use std::{fs::File, io::BufReader, path::Path, time::Duration};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{SketchError, SketchResult};

/// Instruction sent alongside every frame.
pub const DEFAULT_SKETCH_PROMPT: &str = "Analyze this video frame. \
Create a high-quality, hand-drawn charcoal or pencil sketch style illustration of this image. \
It should look like a step in a DIY instruction manual. \
Focus on the main subject and action. \
Clean lines, white background, artistic but clear technical drawing style. \
Do not include any text in the image.";

/// Image model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-3-pro-image-preview";

/// REST root of the Gemini API.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Run-wide settings. Every field has a default so partial JSON files are accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SketchConfig {
    /// Number of frames sampled from the video (one step each).
    pub frame_count: u32,
    /// JPEG quality (1..=100) of sampled frames.
    pub jpeg_quality: u8,
    /// Upper bound on a single seek + capture.
    pub seek_timeout_ms: u64,
    /// Longest accepted source video.
    pub max_duration_sec: f64,
    /// Largest accepted `width * height` of the source video.
    pub max_pixels: u64,
    /// Remote image model.
    pub model: String,
    /// Target resolution class passed to the model (`1K`, `2K`, `4K`).
    pub image_size: String,
    /// REST root of the generation API.
    pub api_base_url: String,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
    /// Instruction sent alongside every frame.
    pub prompt: String,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            frame_count: 6,
            jpeg_quality: 90,
            seek_timeout_ms: 10_000,
            max_duration_sec: 600.0,
            max_pixels: 3840 * 2160,
            model: DEFAULT_MODEL.to_string(),
            image_size: "1K".to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 120,
            prompt: DEFAULT_SKETCH_PROMPT.to_string(),
        }
    }
}

impl SketchConfig {
    /// Read a JSON config file. Missing fields fall back to defaults.
    pub fn from_json_file(path: &Path) -> SketchResult<Self> {
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| SketchError::serde(format!("parse config '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> SketchResult<()> {
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(SketchError::validation("jpeg_quality must be in 1..=100"));
        }
        if self.seek_timeout_ms == 0 {
            return Err(SketchError::validation("seek_timeout_ms must be non-zero"));
        }
        if !self.max_duration_sec.is_finite() || self.max_duration_sec <= 0.0 {
            return Err(SketchError::validation(
                "max_duration_sec must be a positive number",
            ));
        }
        if self.max_pixels == 0 {
            return Err(SketchError::validation("max_pixels must be non-zero"));
        }
        if self.model.trim().is_empty() {
            return Err(SketchError::validation("model must not be empty"));
        }
        if !matches!(self.image_size.as_str(), "1K" | "2K" | "4K") {
            return Err(SketchError::validation(format!(
                "image_size must be one of 1K, 2K, 4K (got '{}')",
                self.image_size
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(SketchError::validation(
                "request_timeout_secs must be non-zero",
            ));
        }
        if self.prompt.trim().is_empty() {
            return Err(SketchError::validation("prompt must not be empty"));
        }
        Ok(())
    }

    pub fn seek_timeout(&self) -> Duration {
        Duration::from_millis(self.seek_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
