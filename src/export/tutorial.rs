use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize;

use crate::{
    assets::media::VideoMetadata,
    foundation::error::{SketchError, SketchResult},
    sampling::sampler::Frame,
    steps::step::{Step, StepStatus},
};

pub const MANIFEST_FILE_NAME: &str = "tutorial.json";

/// Download name of a completed step's sketch (1-based).
pub fn sketch_file_name(index: usize) -> String {
    format!("sketch_step_{}.png", index + 1)
}

pub fn frame_file_name(index: usize) -> String {
    format!("frame_{}.jpg", index + 1)
}

/// `m:ss`, truncating fractional seconds.
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

#[derive(Clone, Debug, Serialize)]
pub struct TutorialManifest {
    pub source: String,
    pub metadata: Option<VideoMetadata>,
    pub steps: Vec<ManifestStep>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ManifestStep {
    pub id: String,
    pub timestamp_sec: f64,
    pub timestamp_label: String,
    pub status: StepStatus,
    pub file: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    pub manifest: PathBuf,
}

pub(crate) fn ensure_dir(dir: &Path) -> SketchResult<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory '{}'", dir.display()))?;
    Ok(())
}

/// Write one PNG per completed step plus a JSON manifest describing every step.
///
/// Failed and unfinished steps appear in the manifest without a file.
pub fn write_tutorial(
    steps: &[Step],
    metadata: Option<VideoMetadata>,
    source: &str,
    out_dir: &Path,
) -> SketchResult<ExportReport> {
    ensure_dir(out_dir)?;

    let mut report = ExportReport::default();
    let mut manifest = TutorialManifest {
        source: source.to_string(),
        metadata,
        steps: Vec::with_capacity(steps.len()),
    };

    for step in steps {
        let file = match (&step.sketch, step.status) {
            (Some(sketch), StepStatus::Completed) => {
                let name = sketch_file_name(step.index);
                let path = out_dir.join(&name);
                let png = sketch.to_png_bytes()?;
                std::fs::write(&path, png)
                    .with_context(|| format!("write sketch '{}'", path.display()))?;
                report.written.push(path);
                Some(name)
            }
            _ => None,
        };
        manifest.steps.push(ManifestStep {
            id: step.id.clone(),
            timestamp_sec: step.timestamp_sec,
            timestamp_label: format_timestamp(step.timestamp_sec),
            status: step.status,
            file,
        });
    }

    let manifest_path = out_dir.join(MANIFEST_FILE_NAME);
    let json = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| SketchError::serde(format!("serialize manifest: {e}")))?;
    std::fs::write(&manifest_path, json)
        .with_context(|| format!("write manifest '{}'", manifest_path.display()))?;
    report.manifest = manifest_path;

    tracing::info!(files = report.written.len(), dir = %out_dir.display(), "tutorial exported");
    Ok(report)
}

/// Write sampled frames as `frame_<n>.jpg`.
pub fn write_frames(frames: &[Frame], out_dir: &Path) -> SketchResult<Vec<PathBuf>> {
    ensure_dir(out_dir)?;
    let mut written = Vec::with_capacity(frames.len());
    for (index, frame) in frames.iter().enumerate() {
        let path = out_dir.join(frame_file_name(index));
        std::fs::write(&path, &frame.image.bytes)
            .with_context(|| format!("write frame '{}'", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
#[path = "../../tests/unit/export/tutorial.rs"]
mod tests;
