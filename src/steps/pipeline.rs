use crate::{
    generate::generator::{AspectRatio, SketchGenerator, SketchRequest},
    steps::step::{Step, StepStatus},
};

/// A step was replaced. Emitted once per status transition.
#[derive(Clone, Debug)]
pub struct StepEvent {
    /// Run that produced the transition.
    pub epoch: u64,
    /// Number of steps in the run.
    pub total: usize,
    /// The step as it is after the transition.
    pub step: Step,
}

pub trait StepObserver {
    fn on_step(&mut self, event: &StepEvent);
}

impl<F: FnMut(&StepEvent)> StepObserver for F {
    fn on_step(&mut self, event: &StepEvent) {
        self(event)
    }
}

/// Destination for replaced steps.
///
/// `commit` returns `false` once the run it belongs to is no longer current; the pipeline then
/// stops issuing generation calls.
pub trait StepSink {
    fn commit(&mut self, step: Step) -> bool;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub completed: usize,
    pub failed: usize,
    /// The sink reported the run stale before every step resolved.
    pub abandoned: bool,
}

/// Settings shared by every step of one run.
#[derive(Clone, Copy)]
pub struct PipelineRun<'a> {
    pub generator: &'a dyn SketchGenerator,
    pub aspect_ratio: AspectRatio,
}

/// Drive `steps` through generation one at a time.
///
/// Each step is committed as `Processing` before its generator call starts, then as
/// `Completed` or `Failed`. A generation error only fails its own step. Steps that are not
/// `Pending` are left alone.
#[tracing::instrument(skip_all, fields(steps = steps.len()))]
pub fn drive_steps(
    steps: &[Step],
    run: PipelineRun<'_>,
    sink: &mut dyn StepSink,
) -> PipelineSummary {
    let mut summary = PipelineSummary::default();

    for step in steps {
        if step.status != StepStatus::Pending {
            tracing::warn!(
                id = %step.id,
                status = %step.status,
                "skipping step that is not pending"
            );
            continue;
        }

        let processing = match step.processing() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("{e}");
                continue;
            }
        };
        if !sink.commit(processing.clone()) {
            summary.abandoned = true;
            break;
        }

        let request = SketchRequest {
            image: &processing.original,
            aspect_ratio: run.aspect_ratio,
        };
        let resolved = match run.generator.generate(&request) {
            Ok(sketch) => processing.completed(sketch),
            Err(e) => {
                tracing::warn!(id = %processing.id, "sketch generation failed: {e}");
                processing.failed()
            }
        };
        let resolved = match resolved {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("{e}");
                continue;
            }
        };

        let status = resolved.status;
        if !sink.commit(resolved) {
            summary.abandoned = true;
            break;
        }
        match status {
            StepStatus::Completed => summary.completed += 1,
            StepStatus::Failed => summary.failed += 1,
            StepStatus::Pending | StepStatus::Processing => {}
        }
    }

    tracing::info!(
        completed = summary.completed,
        failed = summary.failed,
        abandoned = summary.abandoned,
        "pipeline finished"
    );
    summary
}

/// Run the pipeline over a local step sequence, replacing each entry in place and reporting
/// every replacement to `observer`.
pub fn run_pipeline(
    steps: &mut [Step],
    generator: &dyn SketchGenerator,
    aspect_ratio: AspectRatio,
    observer: &mut dyn StepObserver,
) -> PipelineSummary {
    let snapshot = steps.to_vec();
    let total = steps.len();
    let mut sink = SliceSink {
        steps,
        total,
        observer,
    };
    drive_steps(
        &snapshot,
        PipelineRun {
            generator,
            aspect_ratio,
        },
        &mut sink,
    )
}

struct SliceSink<'s, 'o> {
    steps: &'s mut [Step],
    total: usize,
    observer: &'o mut dyn StepObserver,
}

impl StepSink for SliceSink<'_, '_> {
    fn commit(&mut self, step: Step) -> bool {
        let event = StepEvent {
            epoch: 0,
            total: self.total,
            step: step.clone(),
        };
        if let Some(slot) = self.steps.get_mut(step.index) {
            *slot = step;
        }
        self.observer.on_step(&event);
        true
    }
}

#[cfg(test)]
#[path = "../../tests/unit/steps/pipeline.rs"]
mod tests;
