use std::{
    io::Read,
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
    thread,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use serde::Serialize;

use crate::foundation::error::VideoLoadError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Duration and display dimensions of a source video.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VideoMetadata {
    pub duration_sec: f64,
    pub width: u32,
    pub height: u32,
}

impl VideoMetadata {
    /// Reject metadata that cannot drive sampling.
    pub fn validate(&self) -> Result<(), VideoLoadError> {
        if !self.duration_sec.is_finite() || self.duration_sec <= 0.0 {
            return Err(VideoLoadError::InvalidDuration(self.duration_sec));
        }
        if self.width == 0 || self.height == 0 {
            return Err(VideoLoadError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Where a video comes from.
#[derive(Clone, Debug)]
pub enum VideoSource {
    /// A file the decoder can read directly.
    Path(PathBuf),
    /// An in-memory video. It is spilled to a temporary file for the decoder and the file is
    /// removed once sampling finishes.
    Bytes { name: String, data: Vec<u8> },
}

impl VideoSource {
    pub fn display_name(&self) -> String {
        match self {
            Self::Path(p) => p.display().to_string(),
            Self::Bytes { name, .. } => name.clone(),
        }
    }

    /// Resolve to a decoder-readable path. The returned handle owns any temporary file.
    pub fn open(&self) -> Result<OpenedSource, VideoLoadError> {
        match self {
            Self::Path(p) => {
                if !p.is_file() {
                    return Err(VideoLoadError::Open {
                        source_name: p.display().to_string(),
                        reason: "no such file".to_string(),
                    });
                }
                Ok(OpenedSource {
                    path: p.clone(),
                    temporary: false,
                })
            }
            Self::Bytes { name, data } => {
                if data.is_empty() {
                    return Err(VideoLoadError::Open {
                        source_name: name.clone(),
                        reason: "empty video payload".to_string(),
                    });
                }
                let path = temp_spill_path(name);
                std::fs::write(&path, data).map_err(|e| VideoLoadError::Open {
                    source_name: name.clone(),
                    reason: format!("failed to spill to '{}': {e}", path.display()),
                })?;
                tracing::debug!(
                    path = %path.display(),
                    bytes = data.len(),
                    "spilled video to temp file"
                );
                Ok(OpenedSource {
                    path,
                    temporary: true,
                })
            }
        }
    }
}

/// A source resolved to a path. Temporary files are deleted on drop.
#[derive(Debug)]
pub struct OpenedSource {
    path: PathBuf,
    temporary: bool,
}

impl OpenedSource {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }
}

impl Drop for OpenedSource {
    fn drop(&mut self) {
        if self.temporary
            && let Err(e) = std::fs::remove_file(&self.path)
        {
            tracing::warn!(path = %self.path.display(), "failed to remove temp video: {e}");
        }
    }
}

fn temp_spill_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let stem: String = Path::new(name)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
        .collect();
    std::env::temp_dir().join(format!(
        "sketchstep_{}_{nanos}_{stem}",
        std::process::id()
    ))
}

/// Platform decoder seam. Production uses [`FfmpegDecoder`].
pub trait VideoDecoder: Send + Sync {
    /// Read duration and display dimensions. Bounded by `timeout`.
    fn probe(&self, path: &Path, timeout: Duration) -> Result<VideoMetadata, VideoLoadError>;

    /// Seek to `timestamp_sec` and return the visible frame as straight RGBA8 at
    /// `meta.width x meta.height`. Must fail with [`VideoLoadError::SeekTimeout`] if the seek
    /// does not land within `timeout`.
    fn capture_rgba8(
        &self,
        path: &Path,
        meta: &VideoMetadata,
        timestamp_sec: f64,
        timeout: Duration,
    ) -> Result<Vec<u8>, VideoLoadError>;
}

/// Decoder backed by the system `ffprobe` and `ffmpeg` binaries.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegDecoder;

impl VideoDecoder for FfmpegDecoder {
    fn probe(&self, path: &Path, timeout: Duration) -> Result<VideoMetadata, VideoLoadError> {
        probe_video(path, timeout)
    }

    fn capture_rgba8(
        &self,
        path: &Path,
        meta: &VideoMetadata,
        timestamp_sec: f64,
        timeout: Duration,
    ) -> Result<Vec<u8>, VideoLoadError> {
        decode_video_frame_rgba8(path, meta, timestamp_sec, timeout)
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    tool_available("ffmpeg") && tool_available("ffprobe")
}

fn tool_available(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Run `cmd` to completion, capturing stdout and stderr.
///
/// Returns `Ok(None)` when the process outlives `timeout`; it is killed and reaped first.
pub fn output_with_timeout(
    cmd: &mut Command,
    timeout: Duration,
) -> std::io::Result<Option<Output>> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Both pipes are drained while polling.
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let out_reader = thread::spawn(move || drain(stdout));
    let err_reader = thread::spawn(move || drain(stderr));

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        }
    };

    let stdout = out_reader.join().unwrap_or_default();
    let stderr = err_reader.join().unwrap_or_default();
    Ok(status.map(|status| Output {
        status,
        stdout,
        stderr,
    }))
}

fn drain(pipe: Option<impl Read>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    buf
}

#[cfg(feature = "media-ffmpeg")]
pub fn probe_video(source_path: &Path, timeout: Duration) -> Result<VideoMetadata, VideoLoadError> {
    let out = output_with_timeout(
        Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(source_path),
        timeout,
    )
    .map_err(|e| VideoLoadError::Open {
        source_name: source_path.display().to_string(),
        reason: format!("failed to run ffprobe: {e}"),
    })?
    .ok_or_else(|| VideoLoadError::Probe(format!("ffprobe did not finish within {timeout:?}")))?;

    if !out.status.success() {
        return Err(VideoLoadError::Probe(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    parse_probe_json(&out.stdout)
}

#[cfg(not(feature = "media-ffmpeg"))]
pub fn probe_video(
    source_path: &Path,
    _timeout: Duration,
) -> Result<VideoMetadata, VideoLoadError> {
    Err(VideoLoadError::Open {
        source_name: source_path.display().to_string(),
        reason: "video decoding requires the 'media-ffmpeg' feature".to_string(),
    })
}

/// Extract [`VideoMetadata`] from `ffprobe -print_format json -show_streams -show_format`.
///
/// Width and height are swapped for streams rotated by a quarter turn, since ffmpeg
/// auto-rotates on decode.
pub fn parse_probe_json(bytes: &[u8]) -> Result<VideoMetadata, VideoLoadError> {
    #[derive(serde::Deserialize)]
    struct ProbeSideData {
        rotation: Option<f64>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeTags {
        rotate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        duration: Option<String>,
        tags: Option<ProbeTags>,
        #[serde(default)]
        side_data_list: Vec<ProbeSideData>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut = serde_json::from_slice(bytes)
        .map_err(|e| VideoLoadError::Probe(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or(VideoLoadError::NoVideoStream)?;
    let width = video_stream
        .width
        .ok_or_else(|| VideoLoadError::Probe("missing video width from ffprobe".to_string()))?;
    let height = video_stream
        .height
        .ok_or_else(|| VideoLoadError::Probe("missing video height from ffprobe".to_string()))?;

    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video_stream.duration.as_deref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    let rotation = video_stream
        .side_data_list
        .iter()
        .find_map(|d| d.rotation)
        .or_else(|| {
            video_stream
                .tags
                .as_ref()
                .and_then(|t| t.rotate.as_deref())
                .and_then(|r| r.parse::<f64>().ok())
        })
        .unwrap_or(0.0);
    let quarter_turn = (rotation.abs().round() as i64) % 180 == 90;
    let (width, height) = if quarter_turn {
        (height, width)
    } else {
        (width, height)
    };

    Ok(VideoMetadata {
        duration_sec,
        width,
        height,
    })
}

#[cfg(feature = "media-ffmpeg")]
pub fn decode_video_frame_rgba8(
    source_path: &Path,
    meta: &VideoMetadata,
    timestamp_sec: f64,
    timeout: Duration,
) -> Result<Vec<u8>, VideoLoadError> {
    let out = output_with_timeout(
        Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &format!("{timestamp_sec:.6}")])
            .arg("-i")
            .arg(source_path)
            .args([
                "-frames:v",
                "1",
                "-vf",
                &format!("scale={}:{}", meta.width, meta.height),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ]),
        timeout,
    )
    .map_err(|e| VideoLoadError::Open {
        source_name: source_path.display().to_string(),
        reason: format!("failed to run ffmpeg for video decode: {e}"),
    })?
    .ok_or(VideoLoadError::SeekTimeout {
        timestamp_sec,
        timeout,
    })?;

    if !out.status.success() {
        return Err(VideoLoadError::Capture {
            timestamp_sec,
            reason: format!(
                "ffmpeg video decode failed for '{}': {}",
                source_path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            ),
        });
    }

    let expected_len = meta.width as usize * meta.height as usize * 4;
    if out.stdout.len() < expected_len {
        return Err(VideoLoadError::Capture {
            timestamp_sec,
            reason: format!(
                "decoded frame has {} bytes, expected {expected_len}",
                out.stdout.len()
            ),
        });
    }

    let mut frame = out.stdout;
    frame.truncate(expected_len);
    Ok(frame)
}

#[cfg(not(feature = "media-ffmpeg"))]
pub fn decode_video_frame_rgba8(
    source_path: &Path,
    _meta: &VideoMetadata,
    _timestamp_sec: f64,
    _timeout: Duration,
) -> Result<Vec<u8>, VideoLoadError> {
    Err(VideoLoadError::Open {
        source_name: source_path.display().to_string(),
        reason: "video decoding requires the 'media-ffmpeg' feature".to_string(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/media.rs"]
mod tests;
