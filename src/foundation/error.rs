use std::time::Duration;

use crate::steps::step::StepStatus;

/// Convenience result type used across sketchstep.
pub type SketchResult<T> = Result<T, SketchError>;

/// Top-level error taxonomy used by the public APIs.
#[derive(thiserror::Error, Debug)]
pub enum SketchError {
    /// Invalid user-provided configuration or input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// The video could not be opened, probed or sampled.
    #[error(transparent)]
    VideoLoad(#[from] VideoLoadError),

    /// No usable credential could be selected for the remote generator.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SketchError {
    /// Build a [`SketchError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`SketchError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

/// Fatal failure of the frame sampler. A run that hits one of these never starts generating.
#[derive(thiserror::Error, Debug)]
pub enum VideoLoadError {
    /// The source could not be opened (missing file, temp spill failed, decoder missing).
    #[error("failed to open video source '{source_name}': {reason}")]
    Open {
        /// Display name of the source.
        source_name: String,
        /// Underlying reason.
        reason: String,
    },

    /// `ffprobe` ran but its output could not be used.
    #[error("failed to read video metadata: {0}")]
    Probe(String),

    /// The container has no video stream.
    #[error("source contains no video stream")]
    NoVideoStream,

    /// Zero, negative or non-finite duration.
    #[error("video duration is not usable: {0}")]
    InvalidDuration(f64),

    /// Zero width or height.
    #[error("video dimensions are not usable: {width}x{height}")]
    InvalidDimensions {
        /// Reported width.
        width: u32,
        /// Reported height.
        height: u32,
    },

    /// Longer than the configured maximum duration.
    #[error("video is {duration_sec:.1}s long, limit is {max_sec:.1}s")]
    TooLong {
        /// Probed duration.
        duration_sec: f64,
        /// Configured maximum.
        max_sec: f64,
    },

    /// More pixels per frame than the configured maximum.
    #[error("video resolution {width}x{height} exceeds the limit of {max_pixels} pixels")]
    TooLarge {
        /// Probed width.
        width: u32,
        /// Probed height.
        height: u32,
        /// Configured maximum pixel count.
        max_pixels: u64,
    },

    /// The decoder did not land on the requested position in time.
    #[error("seek to {timestamp_sec:.3}s did not complete within {timeout:?}")]
    SeekTimeout {
        /// Requested position.
        timestamp_sec: f64,
        /// Bound that was exceeded.
        timeout: Duration,
    },

    /// The decoder finished but produced no usable frame.
    #[error("failed to capture frame at {timestamp_sec:.3}s: {reason}")]
    Capture {
        /// Requested position.
        timestamp_sec: f64,
        /// Underlying reason.
        reason: String,
    },

    /// The captured surface could not be encoded.
    #[error("failed to encode captured frame: {0}")]
    Encode(String),
}

/// Failure of one sketch generation call. Scoped to a single step.
#[derive(thiserror::Error, Debug)]
pub enum GenerationError {
    /// No API key is currently selected.
    #[error("no API credential is selected")]
    MissingCredential,

    /// The service refused the credential.
    #[error("credential rejected (HTTP {status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Service-provided message.
        message: String,
    },

    /// Quota or rate limit exhausted.
    #[error("quota exceeded: {message}")]
    QuotaExceeded {
        /// Service-provided message.
        message: String,
    },

    /// Any other non-success status.
    #[error("generation request failed (HTTP {status}): {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Service-provided message.
        message: String,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("malformed generation response: {0}")]
    MalformedResponse(String),

    /// The response was well-formed but carried no image.
    #[error("no image data found in response")]
    MissingImage,

    /// The input image was not usable for a request.
    #[error("invalid input image: {0}")]
    InvalidImage(String),
}

/// Failure to obtain a usable credential before a run.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// There is no way to select a credential in this environment.
    #[error("no credential selection flow is available")]
    NoSelectionFlow,

    /// The selection flow ran but the chosen credential was refused.
    #[error("credential selection rejected: {0}")]
    Rejected(String),

    /// The user backed out of the selection flow.
    #[error("credential selection cancelled")]
    Cancelled,
}

/// Attempt to move a step along an edge the lifecycle does not have.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("step '{id}' cannot move from {from} to {to}")]
pub struct StepTransitionError {
    /// Step identifier.
    pub id: String,
    /// Current status.
    pub from: StepStatus,
    /// Requested status.
    pub to: StepStatus,
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
