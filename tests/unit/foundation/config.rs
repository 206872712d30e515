use super::*;

#[test]
fn defaults_are_valid() {
    let cfg = SketchConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.frame_count, 6);
    assert_eq!(cfg.seek_timeout(), Duration::from_secs(10));
}

#[test]
fn validation_catches_bad_values() {
    let bad = [
        SketchConfig {
            jpeg_quality: 0,
            ..SketchConfig::default()
        },
        SketchConfig {
            jpeg_quality: 101,
            ..SketchConfig::default()
        },
        SketchConfig {
            seek_timeout_ms: 0,
            ..SketchConfig::default()
        },
        SketchConfig {
            max_duration_sec: f64::NAN,
            ..SketchConfig::default()
        },
        SketchConfig {
            image_size: "8K".to_string(),
            ..SketchConfig::default()
        },
        SketchConfig {
            prompt: "   ".to_string(),
            ..SketchConfig::default()
        },
    ];
    for cfg in bad {
        assert!(matches!(cfg.validate(), Err(SketchError::Validation(_))));
    }
}

#[test]
fn partial_json_falls_back_to_defaults() {
    let cfg: SketchConfig =
        serde_json::from_str(r#"{ "frame_count": 3, "jpeg_quality": 70 }"#).unwrap();
    assert_eq!(cfg.frame_count, 3);
    assert_eq!(cfg.jpeg_quality, 70);
    assert_eq!(cfg.model, DEFAULT_MODEL);
}

#[test]
fn unknown_fields_are_rejected() {
    assert!(serde_json::from_str::<SketchConfig>(r#"{ "frames": 3 }"#).is_err());
}

#[test]
fn from_json_file_reports_parse_errors() {
    let dir = std::path::PathBuf::from("target").join("config_unit");
    std::fs::create_dir_all(&dir).unwrap();

    let good = dir.join("good.json");
    std::fs::write(&good, r#"{ "seek_timeout_ms": 500 }"#).unwrap();
    let cfg = SketchConfig::from_json_file(&good).unwrap();
    assert_eq!(cfg.seek_timeout(), Duration::from_millis(500));

    let bad = dir.join("bad.json");
    std::fs::write(&bad, "{ not json").unwrap();
    assert!(matches!(
        SketchConfig::from_json_file(&bad),
        Err(SketchError::Serde(_))
    ));

    let invalid = dir.join("invalid.json");
    std::fs::write(&invalid, r#"{ "jpeg_quality": 0 }"#).unwrap();
    assert!(matches!(
        SketchConfig::from_json_file(&invalid),
        Err(SketchError::Validation(_))
    ));
}
