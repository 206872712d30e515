use super::*;

#[test]
fn probe_json_reads_format_duration_and_stream_size() {
    let json = br#"{
        "streams": [
            { "codec_type": "audio" },
            { "codec_type": "video", "width": 640, "height": 360, "duration": "11.0" }
        ],
        "format": { "duration": "12.000000" }
    }"#;
    let meta = parse_probe_json(json).unwrap();
    assert_eq!(
        meta,
        VideoMetadata {
            duration_sec: 12.0,
            width: 640,
            height: 360
        }
    );
}

#[test]
fn probe_json_falls_back_to_stream_duration() {
    let json = br#"{ "streams": [
        { "codec_type": "video", "width": 2, "height": 2, "duration": "3.5" }
    ] }"#;
    assert_eq!(parse_probe_json(json).unwrap().duration_sec, 3.5);
}

#[test]
fn probe_json_swaps_dimensions_for_quarter_turns() {
    let side_data = br#"{ "streams": [ { "codec_type": "video", "width": 1920, "height": 1080,
        "side_data_list": [ { "rotation": -90 } ] } ], "format": { "duration": "1" } }"#;
    let meta = parse_probe_json(side_data).unwrap();
    assert_eq!((meta.width, meta.height), (1080, 1920));

    let tag = br#"{ "streams": [ { "codec_type": "video", "width": 1920, "height": 1080,
        "tags": { "rotate": "180" } } ], "format": { "duration": "1" } }"#;
    let meta = parse_probe_json(tag).unwrap();
    assert_eq!((meta.width, meta.height), (1920, 1080));
}

#[test]
fn probe_json_without_video_stream_is_rejected() {
    let json = br#"{ "streams": [ { "codec_type": "audio" } ], "format": { "duration": "4" } }"#;
    assert!(matches!(
        parse_probe_json(json),
        Err(VideoLoadError::NoVideoStream)
    ));
    assert!(matches!(
        parse_probe_json(b"not json"),
        Err(VideoLoadError::Probe(_))
    ));
}

#[test]
fn metadata_validation_rejects_unusable_values() {
    let ok = VideoMetadata {
        duration_sec: 1.0,
        width: 2,
        height: 2,
    };
    ok.validate().unwrap();
    assert_eq!(ok.pixel_count(), 4);

    for duration_sec in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let meta = VideoMetadata { duration_sec, ..ok };
        assert!(matches!(
            meta.validate(),
            Err(VideoLoadError::InvalidDuration(_))
        ));
    }
    let meta = VideoMetadata { width: 0, ..ok };
    assert!(matches!(
        meta.validate(),
        Err(VideoLoadError::InvalidDimensions { .. })
    ));
}

#[test]
fn byte_sources_spill_and_clean_up() {
    let source = VideoSource::Bytes {
        name: "my clip.mp4".to_string(),
        data: vec![0, 1, 2, 3],
    };
    let opened = source.open().unwrap();
    let path = opened.path().to_path_buf();
    assert!(opened.is_temporary());
    assert_eq!(std::fs::read(&path).unwrap(), vec![0, 1, 2, 3]);
    assert!(path.to_string_lossy().ends_with("my_clip.mp4"));

    drop(opened);
    assert!(!path.exists());
}

#[test]
fn missing_and_empty_sources_fail_to_open() {
    let missing = VideoSource::Path(PathBuf::from("target/definitely/not/here.mp4"));
    assert!(matches!(missing.open(), Err(VideoLoadError::Open { .. })));

    let empty = VideoSource::Bytes {
        name: "empty.mp4".to_string(),
        data: Vec::new(),
    };
    assert!(matches!(empty.open(), Err(VideoLoadError::Open { .. })));
}

#[cfg(unix)]
#[test]
fn output_with_timeout_kills_hung_process() {
    let started = Instant::now();
    let out = output_with_timeout(
        Command::new("sleep").arg("5"),
        Duration::from_millis(100),
    )
    .unwrap();
    assert!(out.is_none());
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[cfg(unix)]
#[test]
fn output_with_timeout_captures_finished_process() {
    let out = output_with_timeout(
        Command::new("sh").args(["-c", "printf abc; printf err >&2"]),
        Duration::from_secs(5),
    )
    .unwrap()
    .unwrap();
    assert!(out.status.success());
    assert_eq!(out.stdout, b"abc");
    assert_eq!(out.stderr, b"err");
}
