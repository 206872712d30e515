#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    process::Command,
    sync::Mutex,
    time::Duration,
};

use sketchstep::{
    EncodedImage, GenerationError, SketchGenerator, SketchRequest, VideoDecoder, VideoLoadError,
    VideoMetadata, VideoSource,
};

/// Decoder that reports fixed metadata and returns flat grey frames.
pub struct FakeDecoder {
    pub meta: VideoMetadata,
}

impl FakeDecoder {
    pub fn new(duration_sec: f64) -> Self {
        Self {
            meta: VideoMetadata {
                duration_sec,
                width: 16,
                height: 9,
            },
        }
    }
}

impl VideoDecoder for FakeDecoder {
    fn probe(&self, _path: &Path, _timeout: Duration) -> Result<VideoMetadata, VideoLoadError> {
        Ok(self.meta)
    }

    fn capture_rgba8(
        &self,
        _path: &Path,
        meta: &VideoMetadata,
        timestamp_sec: f64,
        _timeout: Duration,
    ) -> Result<Vec<u8>, VideoLoadError> {
        let shade = (timestamp_sec * 10.0) as u8;
        Ok(vec![shade; meta.width as usize * meta.height as usize * 4])
    }
}

/// Generator that fails on the listed call numbers (0-based) and records every call.
pub struct ScriptedGenerator {
    pub fail_calls: Vec<usize>,
    pub calls: Mutex<usize>,
}

impl ScriptedGenerator {
    pub fn failing(fail_calls: Vec<usize>) -> Self {
        Self {
            fail_calls,
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl SketchGenerator for ScriptedGenerator {
    fn generate(&self, request: &SketchRequest<'_>) -> Result<EncodedImage, GenerationError> {
        let mut calls = self.calls.lock().unwrap();
        let n = *calls;
        *calls += 1;
        if self.fail_calls.contains(&n) {
            return Err(GenerationError::QuotaExceeded {
                message: "simulated rejection".to_string(),
            });
        }
        let mut sketch = vec![0xEE];
        sketch.extend_from_slice(&request.image.bytes[..request.image.bytes.len().min(4)]);
        Ok(EncodedImage::png(sketch))
    }
}

pub fn memory_source() -> VideoSource {
    VideoSource::Bytes {
        name: "clip.mp4".to_string(),
        data: vec![0; 32],
    }
}

pub fn ffmpeg_tools_available() -> bool {
    sketchstep::is_ffmpeg_on_path()
}

pub fn unique_temp_dir(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "sketchstep_{tag}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

/// Synthesize a `seconds`-long 64x36 test clip.
pub fn synth_clip(root: &Path, seconds: u32) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(root)?;
    let video_path = root.join("clip.mp4");
    let status = Command::new("ffmpeg")
        .args([
            "-v",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            "testsrc=size=64x36:rate=25",
            "-t",
            &seconds.to_string(),
            "-pix_fmt",
            "yuv420p",
            "-c:v",
            "libx264",
        ])
        .arg(&video_path)
        .status()?;
    anyhow::ensure!(status.success(), "ffmpeg failed creating clip.mp4");
    Ok(video_path)
}
