use super::*;

#[test]
fn normalize_rel_path_rules() {
    assert_eq!(normalize_rel_path("a/./b.png").unwrap(), "a/b.png");
    assert_eq!(normalize_rel_path("img\\cut.png").unwrap(), "img/cut.png");
    assert_eq!(normalize_rel_path("a//b.png").unwrap(), "a/b.png");
    assert!(normalize_rel_path("/etc/passwd").is_err());
    assert!(normalize_rel_path("../x.png").is_err());
    assert!(normalize_rel_path("").is_err());
    assert!(normalize_rel_path("./.").is_err());
}

#[test]
fn minimal_document_uses_defaults() {
    let def = SceneDef::from_json_str("{}").unwrap();
    assert_eq!(def.aspect_ratio, AspectRatio::Wide);
    assert_eq!(def.subject, SubjectTransform::default());
    assert_eq!(def.background.color, Color::WHITE);
    assert!(def.text_layers.is_empty());
    assert!(!def.border.enabled);
}

#[test]
fn full_document_parses() {
    let def = SceneDef::from_json_str(
        r##"{
            "aspect_ratio": "1:1",
            "cutout": "cut.png",
            "subject": {"position": {"x": 40, "y": 60}, "scale": 120, "rotation": 15},
            "background": {"color": "#112233", "custom_image": "bg/sky.png", "use_custom_image": true},
            "border": {"enabled": true, "width": 3, "blur": 8, "color": "#8b5cf6"},
            "text_layers": [
                {"text": "SALE", "y": 90, "behind": false},
                {"text": "BIG", "font_size": 120, "behind": true}
            ]
        }"##,
    )
    .unwrap();
    assert_eq!(def.aspect_ratio, AspectRatio::Square);
    assert_eq!(def.subject.scale, 120.0);
    assert_eq!(def.subject.position.x, 40.0);
    assert_eq!(def.background.color, Color::rgb(0x11, 0x22, 0x33));
    assert!(def.background.use_custom_image);
    assert_eq!(def.border.shadow_blur(), 11.0);
    assert_eq!(def.text_layers.len(), 2);
    assert_eq!(def.text_layers[0].text.as_deref(), Some("SALE"));
    assert_eq!(def.text_layers[1].behind, Some(true));
}

#[test]
fn escaping_paths_and_unknown_fields_are_rejected() {
    let err = SceneDef::from_json_str(r#"{"cutout": "../secret.png"}"#).unwrap_err();
    assert!(err.to_string().contains(".."));
    assert!(SceneDef::from_json_str(r#"{"aspect": "1:1"}"#).is_err());
    assert!(SceneDef::from_json_str(r#"{"aspect_ratio": "4:3"}"#).is_err());
}

#[test]
fn load_assets_reads_bytes_relative_to_root() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("target/scene_def_test");
    std::fs::create_dir_all(root.join("img")).unwrap();
    std::fs::write(root.join("img/cut.png"), b"cutout-bytes").unwrap();

    let def = SceneDef::from_json_str(r#"{"cutout": "img/cut.png"}"#).unwrap();
    let loaded = def.load_assets(&root).unwrap();
    let cutout = loaded.cutout.unwrap();
    assert_eq!(cutout.bytes(), b"cutout-bytes");
    assert_eq!(cutout.label(), Some("img/cut.png"));
    assert!(loaded.original.is_none());
    assert!(loaded.custom_background.is_none());

    let missing = SceneDef::from_json_str(r#"{"original": "img/nope.png"}"#).unwrap();
    assert!(missing.load_assets(&root).is_err());
}
