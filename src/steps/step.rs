use std::fmt;

use serde::Serialize;

use crate::{
    assets::encoded::EncodedImage, foundation::error::StepTransitionError,
    sampling::sampler::Frame,
};

/// Lifecycle of a step: `Pending -> Processing -> {Completed | Failed}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    fn can_move_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-frame unit of work.
///
/// Transition methods consume `&self` and return the replacement step, so a step held in
/// shared state is only ever swapped whole.
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub id: String,
    pub index: usize,
    pub timestamp_sec: f64,
    pub original: EncodedImage,
    pub sketch: Option<EncodedImage>,
    pub status: StepStatus,
}

impl Step {
    pub fn from_frame(index: usize, frame: Frame) -> Self {
        Self {
            id: step_id(index),
            index,
            timestamp_sec: frame.timestamp_sec,
            original: frame.image,
            sketch: None,
            status: StepStatus::Pending,
        }
    }

    pub fn processing(&self) -> Result<Self, StepTransitionError> {
        self.moved_to(StepStatus::Processing, None)
    }

    pub fn completed(&self, sketch: EncodedImage) -> Result<Self, StepTransitionError> {
        self.moved_to(StepStatus::Completed, Some(sketch))
    }

    pub fn failed(&self) -> Result<Self, StepTransitionError> {
        self.moved_to(StepStatus::Failed, None)
    }

    fn moved_to(
        &self,
        next: StepStatus,
        sketch: Option<EncodedImage>,
    ) -> Result<Self, StepTransitionError> {
        if !self.status.can_move_to(next) {
            return Err(StepTransitionError {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        Ok(Self {
            status: next,
            sketch,
            ..self.clone()
        })
    }
}

pub fn step_id(index: usize) -> String {
    format!("step-{index}")
}

/// One pending step per frame, in frame order.
pub fn build_steps(frames: Vec<Frame>) -> Vec<Step> {
    frames
        .into_iter()
        .enumerate()
        .map(|(index, frame)| Step::from_frame(index, frame))
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/steps/step.rs"]
mod tests;
