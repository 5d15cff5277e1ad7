use super::*;

fn bounds() -> PreviewBounds {
    PreviewBounds::default()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn export_dimensions_are_fixed() {
    assert_eq!(export_dimensions(AspectRatio::Wide), Canvas::new(1920, 1080));
    assert_eq!(export_dimensions(AspectRatio::Tall), Canvas::new(1080, 1920));
    assert_eq!(export_dimensions(AspectRatio::Square), Canvas::new(1200, 1200));
}

#[test]
fn preview_box_fits_bounds_and_keeps_aspect() {
    let cases = [
        (AspectRatio::Wide, 800.0, 450.0, 2.4),
        (AspectRatio::Square, 600.0, 600.0, 2.0),
        (AspectRatio::Tall, 337.5, 600.0, 3.2),
    ];
    for (ar, w, h, scale) in cases {
        let b = preview_box(ar, bounds());
        assert!(approx(b.width, w), "{ar}: {b:?}");
        assert!(approx(b.height, h), "{ar}: {b:?}");
        assert!(b.width <= 800.0 && b.height <= 600.0);
        assert!(approx(b.width / b.height, export_dimensions(ar).aspect()));
        assert!(approx(preview_scale(ar, bounds()), scale));
    }
}

#[test]
fn preview_canvas_rounds() {
    assert_eq!(preview_canvas(AspectRatio::Tall, bounds()), Canvas::new(338, 600));
    assert_eq!(preview_canvas(AspectRatio::Wide, bounds()), Canvas::new(800, 450));
}

#[test]
fn background_resolution_order() {
    let original = ImageRef::from_bytes(vec![1u8]);
    let custom = ImageRef::from_bytes(vec![2u8]);
    let mut spec = BackgroundSpec::default();
    assert!(resolve_background(&spec, Some(&original)).is_none());

    spec.use_original_image = true;
    assert!(resolve_background(&spec, Some(&original)).unwrap().same_as(&original));
    assert!(resolve_background(&spec, None).is_none());

    spec.custom_image = Some(custom.clone());
    spec.use_custom_image = true;
    assert!(resolve_background(&spec, Some(&original)).unwrap().same_as(&custom));

    spec.custom_image = None;
    assert!(resolve_background(&spec, Some(&original)).unwrap().same_as(&original));
}

#[test]
fn footprint_fits_base_square() {
    assert_eq!(subject_footprint(400.0, 800, 400), Size::new(400.0, 200.0));
    assert_eq!(subject_footprint(400.0, 300, 600), Size::new(200.0, 400.0));
    assert_eq!(subject_footprint(400.0, 50, 50), Size::new(400.0, 400.0));
    assert_eq!(subject_footprint(400.0, 0, 0), Size::new(400.0, 400.0));
}

#[test]
fn default_subject_is_centered_at_preview_scale() {
    for ar in AspectRatio::ALL {
        let canvas = export_dimensions(ar);
        let scale = preview_scale(ar, bounds());
        let rect = subject_rect(
            canvas,
            &SubjectTransform::default(),
            Size::new(400.0, 400.0),
            scale,
        );
        let c = rect.center();
        assert!(approx(c.x, f64::from(canvas.width) / 2.0));
        assert!(approx(c.y, f64::from(canvas.height) / 2.0));
        assert!(approx(rect.width(), 400.0 * scale));
        assert!(approx(rect.height(), 400.0 * scale));
    }
}

#[test]
fn subject_rect_applies_position_and_scale() {
    let t = SubjectTransform {
        position: Point::new(25.0, 75.0),
        scale: 50.0,
        rotation: 30.0,
    };
    let rect = subject_rect(Canvas::new(1200, 1200), &t, Size::new(400.0, 200.0), 2.0);
    assert_eq!(rect, Rect::new(100.0, 800.0, 500.0, 1000.0));
}

#[test]
fn cover_crops_the_overflowing_axis() {
    let canvas = Canvas::new(1920, 1080);
    // Wider than the canvas: fit height, crop sides.
    let r = cover_rect(4000, 1000, canvas);
    assert!(approx(r.height(), 1080.0));
    assert!(approx(r.width(), 4320.0));
    assert!(approx(r.center().x, 960.0));
    assert_eq!(r.y0, 0.0);
    // Taller: fit width, crop top and bottom.
    let r = cover_rect(1000, 1000, canvas);
    assert!(approx(r.width(), 1920.0));
    assert!(approx(r.height(), 1920.0));
    assert!(approx(r.y0, -420.0));
    assert_eq!(r.x0, 0.0);
}

#[test]
fn percent_maps_onto_canvas() {
    let p = percent_to_canvas(Size::new(1200.0, 1200.0), Point::new(50.0, 90.0));
    assert_eq!(p, Point::new(600.0, 1080.0));
}
