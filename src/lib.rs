//! sketchstep turns a short video into an illustrated, step-by-step sketch tutorial.
//!
//! # Pipeline overview
//!
//! 1. **Gate**: a [`CredentialGate`] must report a usable API key before anything else runs
//! 2. **Sample**: `VideoSource + N -> Vec<Frame>`, evenly spaced, skipping the first and last
//!    instant, decoded through the system `ffmpeg`/`ffprobe` binaries
//! 3. **Build**: one pending [`Step`] per frame, in frame order
//! 4. **Generate**: each step is redrawn by a [`SketchGenerator`], strictly one call at a time;
//!    a failed call fails only its own step
//! 5. **Export** (optional): `sketch_step_<n>.png` per completed step and a `tutorial.json`
//!    manifest
//!
//! [`TutorialSession`] composes these stages and tags every run with an epoch, so results
//! that arrive after a restart are discarded instead of leaking into the new run.
#![forbid(unsafe_code)]

mod assets;
mod export;
mod foundation;
mod generate;
mod sampling;
mod session;
mod steps;

pub use assets::encoded::{DataUrlError, EncodedImage, MIME_JPEG, MIME_PNG, encode_rgba8_jpeg};
pub use assets::media::{
    FfmpegDecoder, OpenedSource, VideoDecoder, VideoMetadata, VideoSource,
    decode_video_frame_rgba8, is_ffmpeg_on_path, output_with_timeout, parse_probe_json,
    probe_video,
};
pub use export::tutorial::{
    ExportReport, MANIFEST_FILE_NAME, ManifestStep, TutorialManifest, format_timestamp,
    frame_file_name, sketch_file_name, write_frames, write_tutorial,
};
pub use foundation::config::{
    DEFAULT_API_BASE_URL, DEFAULT_MODEL, DEFAULT_SKETCH_PROMPT, SketchConfig,
};
pub use foundation::error::{
    CredentialError, GenerationError, SketchError, SketchResult, StepTransitionError,
    VideoLoadError,
};
pub use generate::gemini::{
    Content, GeminiSketchGenerator, GenerateRequest, GenerationConfig, ImageConfig, InlineData,
    Part, build_request_body, classify_failure, generate_endpoint,
    parse_generate_response,
};
pub use generate::generator::{AspectRatio, SketchGenerator, SketchRequest};
pub use sampling::sampler::{Frame, FrameSampler, SampledVideo, SamplerOptions, sample_timestamps};
pub use session::credential::{
    API_KEY_ENV_VARS, ApiKeyStore, CredentialGate, KeySelector, ensure_credential,
};
pub use session::session::{PreparedRun, TutorialSession};
pub use steps::pipeline::{
    PipelineRun, PipelineSummary, StepEvent, StepObserver, StepSink, drive_steps, run_pipeline,
};
pub use steps::step::{Step, StepStatus, build_steps, step_id};
