use std::{sync::Arc, time::Duration};

use crate::{
    assets::{
        encoded::{EncodedImage, encode_rgba8_jpeg},
        media::{FfmpegDecoder, VideoDecoder, VideoMetadata, VideoSource},
    },
    foundation::{config::SketchConfig, error::VideoLoadError},
};

/// One still captured from the video.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub timestamp_sec: f64,
    pub image: EncodedImage,
}

/// Output of [`FrameSampler::sample`]. Frames are in increasing timestamp order.
#[derive(Clone, Debug)]
pub struct SampledVideo {
    pub frames: Vec<Frame>,
    pub metadata: VideoMetadata,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplerOptions {
    pub jpeg_quality: u8,
    pub seek_timeout: Duration,
    pub max_duration_sec: f64,
    pub max_pixels: u64,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self::from(&SketchConfig::default())
    }
}

impl From<&SketchConfig> for SamplerOptions {
    fn from(cfg: &SketchConfig) -> Self {
        Self {
            jpeg_quality: cfg.jpeg_quality,
            seek_timeout: cfg.seek_timeout(),
            max_duration_sec: cfg.max_duration_sec,
            max_pixels: cfg.max_pixels,
        }
    }
}

/// Evenly spaced sample positions that skip the first and last instant.
///
/// `t_i = duration / (count + 1) * i` for `i` in `1..=count`.
pub fn sample_timestamps(duration_sec: f64, count: u32) -> Vec<f64> {
    let interval = duration_sec / (f64::from(count) + 1.0);
    (1..=count).map(|i| interval * f64::from(i)).collect()
}

pub struct FrameSampler {
    decoder: Arc<dyn VideoDecoder>,
    opts: SamplerOptions,
}

impl FrameSampler {
    pub fn new(decoder: Arc<dyn VideoDecoder>, opts: SamplerOptions) -> Self {
        Self { decoder, opts }
    }

    pub fn ffmpeg(opts: SamplerOptions) -> Self {
        Self::new(Arc::new(FfmpegDecoder), opts)
    }

    pub fn options(&self) -> &SamplerOptions {
        &self.opts
    }

    /// Capture `count` frames spread across `source`.
    ///
    /// Captures run one after another; each seek must land (or time out) before the next one
    /// starts. Any temporary file backing `source` is removed before this returns, whether
    /// sampling succeeded or not.
    #[tracing::instrument(skip(self, source), fields(source = %source.display_name()))]
    pub fn sample(&self, source: &VideoSource, count: u32) -> Result<SampledVideo, VideoLoadError> {
        let opened = source.open()?;
        let metadata = self.decoder.probe(opened.path(), self.opts.seek_timeout)?;
        metadata.validate()?;
        self.check_limits(&metadata)?;

        tracing::debug!(
            duration_sec = metadata.duration_sec,
            width = metadata.width,
            height = metadata.height,
            "probed video"
        );

        let mut frames = Vec::with_capacity(count as usize);
        for timestamp_sec in sample_timestamps(metadata.duration_sec, count) {
            let rgba = self.decoder.capture_rgba8(
                opened.path(),
                &metadata,
                timestamp_sec,
                self.opts.seek_timeout,
            )?;
            let image = encode_rgba8_jpeg(
                &rgba,
                metadata.width,
                metadata.height,
                self.opts.jpeg_quality,
            )?;
            tracing::debug!(timestamp_sec, bytes = image.bytes.len(), "captured frame");
            frames.push(Frame { timestamp_sec, image });
        }

        tracing::info!(frames = frames.len(), "sampling finished");
        Ok(SampledVideo { frames, metadata })
    }

    fn check_limits(&self, meta: &VideoMetadata) -> Result<(), VideoLoadError> {
        if meta.duration_sec > self.opts.max_duration_sec {
            return Err(VideoLoadError::TooLong {
                duration_sec: meta.duration_sec,
                max_sec: self.opts.max_duration_sec,
            });
        }
        if meta.pixel_count() > self.opts.max_pixels {
            return Err(VideoLoadError::TooLarge {
                width: meta.width,
                height: meta.height,
                max_pixels: self.opts.max_pixels,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sampling/sampler.rs"]
mod tests;
