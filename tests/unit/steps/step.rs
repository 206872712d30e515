use super::*;

fn frames(n: usize) -> Vec<Frame> {
    (0..n)
        .map(|i| Frame {
            timestamp_sec: (i + 1) as f64 * 0.5,
            image: EncodedImage::jpeg(vec![i as u8; 3]),
        })
        .collect()
}

#[test]
fn build_steps_preserves_order_and_assigns_ids() {
    let steps = build_steps(frames(4));
    assert_eq!(steps.len(), 4);
    for (i, step) in steps.iter().enumerate() {
        assert_eq!(step.id, format!("step-{i}"));
        assert_eq!(step.index, i);
        assert_eq!(step.status, StepStatus::Pending);
        assert!(step.sketch.is_none());
        assert_eq!(step.original.bytes, vec![i as u8; 3]);
        assert_eq!(step.timestamp_sec, (i + 1) as f64 * 0.5);
    }
    assert!(build_steps(Vec::new()).is_empty());
}

#[test]
fn happy_path_transitions() {
    let step = build_steps(frames(1)).remove(0);
    let processing = step.processing().unwrap();
    assert_eq!(processing.status, StepStatus::Processing);
    assert_eq!(step.status, StepStatus::Pending);

    let done = processing.completed(EncodedImage::png(vec![9])).unwrap();
    assert_eq!(done.status, StepStatus::Completed);
    assert_eq!(done.sketch, Some(EncodedImage::png(vec![9])));
    assert_eq!(done.original, step.original);

    let failed = processing.failed().unwrap();
    assert_eq!(failed.status, StepStatus::Failed);
    assert!(failed.sketch.is_none());
}

#[test]
fn skipping_or_reentering_states_is_rejected() {
    let step = build_steps(frames(1)).remove(0);

    let err = step.completed(EncodedImage::png(vec![1])).unwrap_err();
    assert_eq!(err.from, StepStatus::Pending);
    assert_eq!(err.to, StepStatus::Completed);
    assert!(step.failed().is_err());

    let done = step
        .processing()
        .unwrap()
        .completed(EncodedImage::png(vec![1]))
        .unwrap();
    assert!(done.processing().is_err());
    assert!(done.failed().is_err());

    let failed = step.processing().unwrap().failed().unwrap();
    assert!(failed.processing().is_err());
}

#[test]
fn status_strings_and_terminality() {
    assert_eq!(StepStatus::Processing.to_string(), "processing");
    assert_eq!(
        serde_json::to_string(&StepStatus::Failed).unwrap(),
        "\"failed\""
    );
    assert!(!StepStatus::Pending.is_terminal());
    assert!(!StepStatus::Processing.is_terminal());
    assert!(StepStatus::Completed.is_terminal());
    assert!(StepStatus::Failed.is_terminal());
}
