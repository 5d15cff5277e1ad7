use super::*;

#[test]
fn canvas_rect_and_aspect() {
    let c = Canvas::new(1920, 1080);
    assert_eq!(c.rect(), Rect::new(0.0, 0.0, 1920.0, 1080.0));
    assert!((c.aspect() - 16.0 / 9.0).abs() < 1e-12);
}

#[test]
fn premul_rounds_half_up() {
    let p = Rgba8Premul::from_straight_rgba(255, 128, 0, 128);
    assert_eq!(p.r, 128);
    assert_eq!(p.g, 64);
    assert_eq!(p.b, 0);
    assert_eq!(p.a, 128);
    assert_eq!(
        Rgba8Premul::from_straight_rgba(9, 9, 9, 0),
        Rgba8Premul {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    );
}
