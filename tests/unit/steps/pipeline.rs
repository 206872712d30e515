use std::sync::{Arc, Mutex};

use crate::{
    assets::encoded::EncodedImage, foundation::error::GenerationError,
    sampling::sampler::Frame, steps::step::build_steps,
};

use super::*;

/// Fails every frame whose first byte is listed in `fail`; logs each call to `log`.
struct ScriptedGenerator {
    fail: Vec<u8>,
    log: Arc<Mutex<Vec<String>>>,
}

impl SketchGenerator for ScriptedGenerator {
    fn generate(&self, request: &SketchRequest<'_>) -> Result<EncodedImage, GenerationError> {
        let tag = request.image.bytes[0];
        self.log.lock().unwrap().push(format!("generate:{tag}"));
        if self.fail.contains(&tag) {
            return Err(GenerationError::QuotaExceeded {
                message: "simulated rejection".to_string(),
            });
        }
        Ok(EncodedImage::png(vec![tag, 0xAA]))
    }
}

fn three_steps() -> Vec<Step> {
    build_steps(
        (0..3u8)
            .map(|i| Frame {
                timestamp_sec: f64::from(i) + 1.0,
                image: EncodedImage::jpeg(vec![i]),
            })
            .collect(),
    )
}

fn run(steps: &mut [Step], fail: Vec<u8>) -> (PipelineSummary, Vec<String>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let generator = ScriptedGenerator {
        fail,
        log: log.clone(),
    };
    let observer_log = log.clone();
    let mut observer = move |e: &StepEvent| {
        observer_log
            .lock()
            .unwrap()
            .push(format!("{}:{}", e.step.id, e.step.status));
    };
    let summary = run_pipeline(steps, &generator, AspectRatio::default(), &mut observer);
    let log = log.lock().unwrap().clone();
    (summary, log)
}

#[test]
fn all_generations_succeed() {
    let mut steps = three_steps();
    let (summary, _) = run(&mut steps, vec![]);

    assert_eq!(
        summary,
        PipelineSummary {
            completed: 3,
            failed: 0,
            abandoned: false
        }
    );
    for step in &steps {
        assert_eq!(step.status, StepStatus::Completed);
        assert!(step.sketch.as_ref().is_some_and(|s| !s.is_empty()));
    }
    assert!(steps.windows(2).all(|w| w[0].timestamp_sec < w[1].timestamp_sec));
}

#[test]
fn failed_step_does_not_affect_neighbours() {
    let mut steps = three_steps();
    let (summary, log) = run(&mut steps, vec![1]);

    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(steps[0].status, StepStatus::Completed);
    assert_eq!(steps[1].status, StepStatus::Failed);
    assert!(steps[1].sketch.is_none());
    assert_eq!(steps[2].status, StepStatus::Completed);
    assert!(log.contains(&"step-2:processing".to_string()));
}

#[test]
fn processing_is_observed_before_each_call_and_calls_are_serial() {
    let mut steps = three_steps();
    let (_, log) = run(&mut steps, vec![1]);

    assert_eq!(
        log,
        vec![
            "step-0:processing",
            "generate:0",
            "step-0:completed",
            "step-1:processing",
            "generate:1",
            "step-1:failed",
            "step-2:processing",
            "generate:2",
            "step-2:completed",
        ]
    );
}

#[test]
fn non_pending_steps_are_skipped() {
    let mut steps = three_steps();
    steps[0] = steps[0]
        .processing()
        .unwrap()
        .completed(EncodedImage::png(vec![42]))
        .unwrap();

    let (summary, log) = run(&mut steps, vec![]);
    assert_eq!(summary.completed, 2);
    assert!(!log.contains(&"generate:0".to_string()));
    assert_eq!(steps[0].sketch, Some(EncodedImage::png(vec![42])));
}

#[test]
fn stale_sink_abandons_remaining_steps() {
    struct StaleAfter {
        accepted: usize,
        commits: Vec<Step>,
    }
    impl StepSink for StaleAfter {
        fn commit(&mut self, step: Step) -> bool {
            if self.commits.len() == self.accepted {
                return false;
            }
            self.commits.push(step);
            true
        }
    }

    let log = Arc::new(Mutex::new(Vec::new()));
    let generator = ScriptedGenerator {
        fail: vec![],
        log: log.clone(),
    };
    let mut sink = StaleAfter {
        accepted: 3,
        commits: Vec::new(),
    };
    let summary = drive_steps(
        &three_steps(),
        PipelineRun {
            generator: &generator,
            aspect_ratio: AspectRatio::default(),
        },
        &mut sink,
    );

    assert!(summary.abandoned);
    assert_eq!(summary.completed, 1);
    assert_eq!(*log.lock().unwrap(), vec!["generate:0", "generate:1"]);
    assert_eq!(sink.commits.last().unwrap().status, StepStatus::Processing);
}

#[test]
fn empty_step_list_is_a_no_op() {
    let mut steps: Vec<Step> = Vec::new();
    let (summary, log) = run(&mut steps, vec![]);
    assert_eq!(summary, PipelineSummary::default());
    assert!(log.is_empty());
}
