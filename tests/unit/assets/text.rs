use std::sync::Arc;

use super::*;

fn resolved(key: &str, bytes: Vec<u8>) -> ResolvedFont {
    ResolvedFont {
        key: key.to_owned(),
        bytes: Arc::new(bytes),
    }
}

#[test]
fn spaced_run_centers_on_anchor() {
    let run = spaced_run(&[10.0, 20.0, 10.0], 5.0);
    assert_eq!(run.total_width, 50.0);
    assert_eq!(run.lefts, vec![-25.0, -10.0, 15.0]);
}

#[test]
fn spaced_run_single_char_has_no_gap() {
    let run = spaced_run(&[12.0], 8.0);
    assert_eq!(run.total_width, 12.0);
    assert_eq!(run.lefts, vec![-6.0]);
}

#[test]
fn spaced_run_empty_is_zero_width() {
    let run = spaced_run(&[], 3.0);
    assert_eq!(run.total_width, 0.0);
    assert!(run.lefts.is_empty());
}

#[test]
fn shaping_rejects_non_positive_size_before_touching_fonts() {
    let mut engine = TextLayoutEngine::new();
    let style = RunStyle {
        size_px: 0.0,
        weight: 700.0,
        brush: TextBrushRgba8::default(),
    };
    let err = engine
        .shape("SALE", &resolved("font-Inter", vec![]), style)
        .err()
        .unwrap();
    assert!(matches!(err, ThumbError::Validation(_)));
}

#[test]
fn shaping_with_unparseable_font_bytes_is_decode_error() {
    let mut engine = TextLayoutEngine::new();
    let style = RunStyle {
        size_px: 48.0,
        weight: 400.0,
        brush: TextBrushRgba8::default(),
    };
    let err = engine
        .shape("SALE", &resolved("font-Junk", b"junk".to_vec()), style)
        .err()
        .unwrap();
    assert!(matches!(err, ThumbError::Decode(_)));
}
