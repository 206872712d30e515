use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
};

use crate::{
    assets::media::{VideoMetadata, VideoSource},
    foundation::error::SketchResult,
    generate::generator::{AspectRatio, SketchGenerator},
    sampling::sampler::FrameSampler,
    session::credential::{CredentialGate, ensure_credential},
    steps::{
        pipeline::{PipelineRun, PipelineSummary, StepEvent, StepObserver, StepSink, drive_steps},
        step::{Step, build_steps},
    },
};

type SharedObserver = Box<dyn StepObserver + Send>;

#[derive(Default)]
struct SessionState {
    epoch: u64,
    steps: Vec<Step>,
    metadata: Option<VideoMetadata>,
}

/// A sampled video whose steps are installed in the session but not yet generated.
#[derive(Debug)]
pub struct PreparedRun {
    pub epoch: u64,
    pub metadata: VideoMetadata,
    pub aspect_ratio: AspectRatio,
    steps: Vec<Step>,
}

impl PreparedRun {
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

/// Composes credential gate, sampler and generator around one shared step sequence.
///
/// Every run is tagged with an epoch. Submitting a new video or calling [`reset`] bumps the
/// epoch, and results that arrive later from an older run are dropped instead of being
/// written into the newer step sequence.
///
/// [`reset`]: TutorialSession::reset
pub struct TutorialSession {
    gate: Arc<dyn CredentialGate>,
    sampler: FrameSampler,
    generator: Arc<dyn SketchGenerator>,
    frame_count: u32,
    state: Mutex<SessionState>,
    observers: Mutex<Vec<SharedObserver>>,
}

impl TutorialSession {
    pub fn new(
        gate: Arc<dyn CredentialGate>,
        sampler: FrameSampler,
        generator: Arc<dyn SketchGenerator>,
        frame_count: u32,
    ) -> Self {
        Self {
            gate,
            sampler,
            generator,
            frame_count,
            state: Mutex::new(SessionState::default()),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Register a listener for every step replacement.
    ///
    /// Observers run while the session state is locked, so a callback must not call back
    /// into the session (including `subscribe`).
    pub fn subscribe(&self, observer: impl StepObserver + Send + 'static) {
        lock(&self.observers).push(Box::new(observer));
    }

    pub fn epoch(&self) -> u64 {
        lock(&self.state).epoch
    }

    /// Snapshot of the current step sequence.
    pub fn steps(&self) -> Vec<Step> {
        lock(&self.state).steps.clone()
    }

    pub fn metadata(&self) -> Option<VideoMetadata> {
        lock(&self.state).metadata
    }

    /// Discard the current steps. Any run still in flight becomes stale.
    pub fn reset(&self) -> u64 {
        let mut state = lock(&self.state);
        state.epoch += 1;
        state.steps.clear();
        state.metadata = None;
        tracing::debug!(epoch = state.epoch, "session reset");
        state.epoch
    }

    /// Gate on the credential, sample `source`, and install a fresh pending step sequence.
    ///
    /// The previous steps are discarded before sampling starts. On failure the session is
    /// left empty and ready for another video. If the session is reset or handed another
    /// video while this one is still being sampled, nothing is installed and the returned
    /// run is already stale: [`execute`](Self::execute) abandons it without generating.
    pub fn prepare(&self, source: &VideoSource) -> SketchResult<PreparedRun> {
        ensure_credential(self.gate.as_ref())?;
        let epoch = self.reset();

        let sampled = self.sampler.sample(source, self.frame_count)?;
        let steps = build_steps(sampled.frames);
        let metadata = sampled.metadata;

        {
            let mut state = lock(&self.state);
            if state.epoch == epoch {
                state.steps = steps.clone();
                state.metadata = Some(metadata);
                tracing::info!(epoch, steps = steps.len(), "installed steps");

                let total = steps.len();
                self.notify(steps.iter().map(|step| StepEvent {
                    epoch,
                    total,
                    step: step.clone(),
                }));
            } else {
                tracing::info!(
                    run_epoch = epoch,
                    current_epoch = state.epoch,
                    "sampling superseded, steps not installed"
                );
            }
        }

        Ok(PreparedRun {
            epoch,
            metadata,
            aspect_ratio: AspectRatio::closest_to(metadata.width, metadata.height),
            steps,
        })
    }

    /// Generate sketches for a prepared run, one step at a time.
    ///
    /// A run that is no longer current is abandoned before any generation call.
    pub fn execute(&self, run: PreparedRun) -> PipelineSummary {
        if self.epoch() != run.epoch {
            tracing::info!(epoch = run.epoch, "run superseded before generation");
            return PipelineSummary {
                abandoned: true,
                ..PipelineSummary::default()
            };
        }

        let mut sink = EpochSink {
            session: self,
            epoch: run.epoch,
            total: run.steps.len(),
        };
        let summary = drive_steps(
            &run.steps,
            PipelineRun {
                generator: self.generator.as_ref(),
                aspect_ratio: run.aspect_ratio,
            },
            &mut sink,
        );
        if summary.abandoned {
            tracing::info!(epoch = run.epoch, "run superseded, remaining steps abandoned");
        }
        summary
    }

    /// [`prepare`](Self::prepare) then [`execute`](Self::execute).
    pub fn run(&self, source: &VideoSource) -> SketchResult<PipelineSummary> {
        let prepared = self.prepare(source)?;
        Ok(self.execute(prepared))
    }

    /// Run on a background thread so the caller can restart while generation is in flight.
    pub fn spawn(
        self: &Arc<Self>,
        source: VideoSource,
    ) -> JoinHandle<SketchResult<PipelineSummary>> {
        let session = Arc::clone(self);
        thread::spawn(move || session.run(&source))
    }

    fn notify(&self, events: impl IntoIterator<Item = StepEvent>) {
        let mut observers = lock(&self.observers);
        for event in events {
            for observer in observers.iter_mut() {
                observer.on_step(&event);
            }
        }
    }
}

struct EpochSink<'a> {
    session: &'a TutorialSession,
    epoch: u64,
    total: usize,
}

impl StepSink for EpochSink<'_> {
    fn commit(&mut self, step: Step) -> bool {
        let mut state = lock(&self.session.state);
        if state.epoch != self.epoch {
            tracing::debug!(
                id = %step.id,
                run_epoch = self.epoch,
                current_epoch = state.epoch,
                "discarding stale step result"
            );
            return false;
        }
        match state.steps.get_mut(step.index) {
            Some(slot) => *slot = step.clone(),
            None => return false,
        }

        // Still under the state lock, so no newer run can interleave its events.
        self.session.notify([StepEvent {
            epoch: self.epoch,
            total: self.total,
            step,
        }]);
        true
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "../../tests/unit/session/session.rs"]
mod tests;
