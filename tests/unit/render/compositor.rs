use std::io::Cursor;

use super::*;

use crate::assets::image::ImageRef;
use crate::foundation::error::ThumbError;
use crate::scene::model::{TextLayerPatch, create_text_layer};

struct NoFonts;

impl FontProvider for NoFonts {
    async fn load_family(&self, family: &str) -> ThumbResult<Vec<u8>> {
        Err(ThumbError::io(format!("no font '{family}'")))
    }
}

fn png(w: u32, h: u32, rgba: [u8; 4]) -> ImageRef {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    ImageRef::from_bytes(buf)
}

fn scene_with_subject(ar: AspectRatio) -> SceneModel {
    SceneModel {
        processed_image: Some(png(10, 10, [255, 0, 0, 255])),
        aspect_ratio: ar,
        ..SceneModel::default()
    }
}

fn render(scene: &SceneModel, target: RenderTarget) -> (RenderOutcome, FontGate<NoFonts>) {
    let mut compositor = Compositor::from_config(&EditorConfig::default()).unwrap();
    let mut fonts = FontGate::new(NoFonts);
    let out = pollster::block_on(compositor.render(scene, target, &mut fonts)).unwrap();
    (out, fonts)
}

fn rendered(scene: &SceneModel, target: RenderTarget) -> RenderedScene {
    match render(scene, target).0 {
        RenderOutcome::Rendered(r) => r,
        other => panic!("expected a render, got {other:?}"),
    }
}

#[test]
fn file_names_replace_the_ratio_colon() {
    assert_eq!(export_file_name("thumbnail", AspectRatio::Wide), "thumbnail-16x9.png");
    assert_eq!(export_file_name("thumbnail", AspectRatio::Square), "thumbnail-1x1.png");
    assert_eq!(export_file_name("cover", AspectRatio::Tall), "cover-9x16.png");
}

#[test]
fn no_processed_image_means_nothing_is_drawn() {
    let scene = SceneModel::default();
    assert!(matches!(render(&scene, RenderTarget::Export).0, RenderOutcome::Unavailable));

    let mut compositor = Compositor::from_config(&EditorConfig::default()).unwrap();
    let mut fonts = FontGate::new(NoFonts);
    let out = pollster::block_on(compositor.export(&scene, &mut fonts)).unwrap();
    assert!(matches!(out, ExportOutcome::Unavailable));
}

#[test]
fn subject_is_centered_and_scaled_to_the_export_canvas() {
    let r = rendered(&scene_with_subject(AspectRatio::Square), RenderTarget::Export);
    assert_eq!((r.frame.width, r.frame.height), (1200, 1200));
    assert_eq!(
        r.paints,
        vec![
            PaintOp::BackgroundColor(Color::WHITE),
            PaintOp::Subject {
                rect: Rect::new(200.0, 200.0, 1000.0, 1000.0),
                rotation: 0.0,
            },
        ]
    );
    assert_eq!(r.frame.pixel(600, 600), Some([255, 0, 0, 255]));
    assert_eq!(r.frame.pixel(0, 0), Some([255, 255, 255, 255]));
    assert_eq!(r.frame.pixel(1199, 1199), Some([255, 255, 255, 255]));
}

#[test]
fn text_layers_paint_around_the_subject_in_stack_order() {
    let mut scene = scene_with_subject(AspectRatio::Square);
    let below = create_text_layer(LayerId(1), &TextLayerPatch::default());
    let above = create_text_layer(
        LayerId(2),
        &TextLayerPatch {
            y: Some(90.0),
            ..TextLayerPatch::default()
        },
    );
    scene.layers.push_text(above, false);
    scene.layers.push_text(below, true);

    let r = rendered(&scene, RenderTarget::Export);
    let kinds: Vec<&PaintOp> = r.paints.iter().collect();
    assert_eq!(kinds.len(), 4);
    assert_eq!(
        kinds[1],
        &PaintOp::TextSkipped {
            id: LayerId(1),
            anchor: Point::new(600.0, 600.0),
        }
    );
    assert!(matches!(kinds[2], PaintOp::Subject { .. }));
    assert_eq!(
        kinds[3],
        &PaintOp::TextSkipped {
            id: LayerId(2),
            anchor: Point::new(600.0, 1080.0),
        }
    );
}

#[test]
fn each_family_is_requested_once_per_gate() {
    let mut scene = scene_with_subject(AspectRatio::Wide);
    for (i, family) in ["Inter", "Bebas Neue", "Inter"].into_iter().enumerate() {
        let layer = create_text_layer(
            LayerId(i as u64 + 1),
            &TextLayerPatch {
                font_family: Some(family.to_owned()),
                ..TextLayerPatch::default()
            },
        );
        scene.layers.push_text(layer, false);
    }

    let mut compositor = Compositor::from_config(&EditorConfig::default()).unwrap();
    let mut fonts = FontGate::new(NoFonts);
    pollster::block_on(compositor.render(&scene, RenderTarget::Export, &mut fonts)).unwrap();
    assert_eq!(fonts.request_count(), 2);
    assert!(fonts.is_ready());
    pollster::block_on(compositor.render(&scene, RenderTarget::Export, &mut fonts)).unwrap();
    assert_eq!(fonts.request_count(), 2);
}

#[test]
fn glow_stacks_one_pass_per_border_width() {
    let mut scene = scene_with_subject(AspectRatio::Square);
    scene.border.enabled = true;
    scene.border.width = 3;
    scene.border.glow_radius = 8.0;

    let r = rendered(&scene, RenderTarget::Export);
    let glow: Vec<&PaintOp> = r
        .paints
        .iter()
        .filter(|p| matches!(p, PaintOp::GlowPass { .. }))
        .collect();
    assert_eq!(glow.len(), 3);
    for (i, op) in glow.iter().enumerate() {
        assert_eq!(
            **op,
            PaintOp::GlowPass {
                pass: i as u32 + 1,
                blur: 11.0,
                color: Color::rgb(0x8b, 0x5c, 0xf6),
            }
        );
    }
    assert!(matches!(r.paints.last(), Some(PaintOp::Subject { .. })));

    // The halo tints the background just outside the subject edge.
    let halo = r.frame.pixel(195, 600).unwrap();
    assert_ne!(halo, [255, 255, 255, 255]);
    assert_eq!(r.frame.pixel(600, 600), Some([255, 0, 0, 255]));
    assert_eq!(r.frame.pixel(0, 0), Some([255, 255, 255, 255]));
}

#[test]
fn disabled_border_draws_no_glow() {
    let mut scene = scene_with_subject(AspectRatio::Square);
    scene.border.width = 5;
    let r = rendered(&scene, RenderTarget::Export);
    assert!(!r.paints.iter().any(|p| matches!(p, PaintOp::GlowPass { .. })));
}

#[test]
fn custom_background_covers_the_canvas() {
    let mut scene = scene_with_subject(AspectRatio::Square);
    scene.background.custom_image = Some(png(20, 10, [0, 0, 255, 255]));
    scene.background.use_custom_image = true;

    let r = rendered(&scene, RenderTarget::Export);
    assert_eq!(
        r.paints[0],
        PaintOp::BackgroundImage {
            rect: Rect::new(-600.0, 0.0, 1800.0, 1200.0),
        }
    );
    assert_eq!(r.frame.pixel(5, 5), Some([0, 0, 255, 255]));
}

#[test]
fn undecodable_background_falls_back_to_the_color() {
    let mut scene = scene_with_subject(AspectRatio::Wide);
    scene.background.color = Color::rgb(10, 20, 30);
    scene.background.custom_image = Some(ImageRef::from_bytes(b"not an image".to_vec()));
    scene.background.use_custom_image = true;

    let r = rendered(&scene, RenderTarget::Export);
    assert_eq!(r.paints[0], PaintOp::BackgroundColor(Color::rgb(10, 20, 30)));
    assert_eq!(r.frame.pixel(0, 0), Some([10, 20, 30, 255]));
    assert!(matches!(r.paints.last(), Some(PaintOp::Subject { .. })));
}

#[test]
fn undecodable_subject_aborts_the_render() {
    let mut scene = scene_with_subject(AspectRatio::Square);
    scene.processed_image = Some(ImageRef::from_bytes(b"garbage".to_vec()));
    assert!(matches!(
        render(&scene, RenderTarget::Export).0,
        RenderOutcome::Aborted(_)
    ));

    let mut compositor = Compositor::from_config(&EditorConfig::default()).unwrap();
    let mut fonts = FontGate::new(NoFonts);
    let out = pollster::block_on(compositor.export(&scene, &mut fonts)).unwrap();
    assert!(matches!(out, ExportOutcome::Aborted(_)));
}

#[test]
fn rotation_is_recorded_with_the_unrotated_rect() {
    let mut scene = scene_with_subject(AspectRatio::Square);
    scene.subject.rotation = 45.0;
    let r = rendered(&scene, RenderTarget::Export);
    assert_eq!(
        r.paints.last(),
        Some(&PaintOp::Subject {
            rect: Rect::new(200.0, 200.0, 1000.0, 1000.0),
            rotation: 45.0,
        })
    );
    // The rotated square still covers its center but no longer its corner.
    assert_eq!(r.frame.pixel(600, 600), Some([255, 0, 0, 255]));
    assert_eq!(r.frame.pixel(210, 210), Some([255, 255, 255, 255]));
}

#[test]
fn preview_target_uses_the_rounded_preview_box() {
    let r = rendered(&scene_with_subject(AspectRatio::Tall), RenderTarget::Preview);
    assert_eq!((r.frame.width, r.frame.height), (338, 600));

    let r = rendered(&scene_with_subject(AspectRatio::Square), RenderTarget::Preview);
    assert_eq!((r.frame.width, r.frame.height), (600, 600));
    assert_eq!(
        r.paints.last(),
        Some(&PaintOp::Subject {
            rect: Rect::new(100.0, 100.0, 500.0, 500.0),
            rotation: 0.0,
        })
    );
}

#[test]
fn export_encodes_png_at_export_dimensions() {
    let scene = scene_with_subject(AspectRatio::Wide);
    let mut compositor = Compositor::from_config(&EditorConfig::default()).unwrap();
    let mut fonts = FontGate::new(NoFonts);
    let ExportOutcome::Exported(file) =
        pollster::block_on(compositor.export(&scene, &mut fonts)).unwrap()
    else {
        panic!("expected an export");
    };
    assert_eq!(file.file_name, "thumbnail-16x9.png");
    assert_eq!((file.width, file.height), (1920, 1080));
    let decoded = image::load_from_memory(&file.png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (1920, 1080));
}

struct FixtureFont;

impl FontProvider for FixtureFont {
    async fn load_family(&self, _family: &str) -> ThumbResult<Vec<u8>> {
        std::fs::read("tests/data/fonts/DejaVuSans.ttf")
            .map_err(|e| ThumbError::io(format!("font fixture: {e}")))
    }
}

/// Scene whose subject is a tiny red square in the top-left corner, leaving the canvas to text.
fn text_scene(patch: TextLayerPatch) -> SceneModel {
    let mut scene = scene_with_subject(AspectRatio::Square);
    scene.subject.position = Point::new(5.0, 5.0);
    scene.subject.scale = 10.0;
    let layer = create_text_layer(
        LayerId(1),
        &TextLayerPatch {
            color: Some(Color::BLACK),
            font_size: Some(48.0),
            ..patch
        },
    );
    scene.layers.push_text(layer, false);
    scene
}

fn render_text(scene: &SceneModel) -> RenderedScene {
    let mut compositor = Compositor::from_config(&EditorConfig::default()).unwrap();
    let mut fonts = FontGate::new(FixtureFont);
    match pollster::block_on(compositor.render(scene, RenderTarget::Export, &mut fonts)).unwrap() {
        RenderOutcome::Rendered(r) => r,
        other => panic!("expected a render, got {other:?}"),
    }
}

/// Bounding box `(x0, y0, x1, y1)` of pixels darker than `threshold` on every channel.
fn ink_bbox(frame: &FrameRGBA, threshold: u8) -> (u32, u32, u32, u32) {
    let (mut x0, mut y0, mut x1, mut y1) = (u32::MAX, u32::MAX, 0, 0);
    for y in 0..frame.height {
        for x in 0..frame.width {
            let [r, g, b, _] = frame.pixel(x, y).unwrap();
            if r < threshold && g < threshold && b < threshold {
                x0 = x0.min(x);
                y0 = y0.min(y);
                x1 = x1.max(x);
                y1 = y1.max(y);
            }
        }
    }
    assert!(x0 <= x1, "no ink found");
    (x0, y0, x1, y1)
}

fn center(b: (u32, u32, u32, u32)) -> (f64, f64) {
    (
        f64::from(b.0 + b.2) / 2.0,
        f64::from(b.1 + b.3) / 2.0,
    )
}

fn assert_near(got: (f64, f64), want: (f64, f64), tol: f64) {
    assert!(
        (got.0 - want.0).abs() <= tol && (got.1 - want.1).abs() <= tol,
        "ink centered at {got:?}, expected near {want:?}"
    );
}

#[test]
fn native_text_is_centered_on_its_anchor() {
    let r = render_text(&text_scene(TextLayerPatch {
        text: Some("SALE".to_owned()),
        y: Some(90.0),
        ..TextLayerPatch::default()
    }));
    assert_eq!(
        r.paints.last(),
        Some(&PaintOp::Text {
            id: LayerId(1),
            anchor: Point::new(600.0, 1080.0),
            font_px: 96.0,
            spaced: false,
        })
    );
    let bbox = ink_bbox(&r.frame, 128);
    assert_near(center(bbox), (600.0, 1080.0), 8.0);
    // Four capitals at 96px are far wider than one glyph.
    assert!(bbox.2 - bbox.0 > 180, "{bbox:?}");
    assert!(bbox.3 - bbox.1 < 90, "{bbox:?}");
}

#[test]
fn ink_width_grows_with_the_text() {
    let width = |text: &str| {
        let r = render_text(&text_scene(TextLayerPatch {
            text: Some(text.to_owned()),
            ..TextLayerPatch::default()
        }));
        let bbox = ink_bbox(&r.frame, 128);
        assert_near(center(bbox), (600.0, 600.0), 8.0);
        bbox.2 - bbox.0
    };
    let short = width("SALE");
    let long = width("SALESALE");
    assert!(long > short * 18 / 10, "{short} vs {long}");
}

#[test]
fn letter_spaced_text_is_centered_and_wider() {
    let native = render_text(&text_scene(TextLayerPatch {
        text: Some("SALE".to_owned()),
        y: Some(90.0),
        ..TextLayerPatch::default()
    }));
    let spaced = render_text(&text_scene(TextLayerPatch {
        text: Some("SALE".to_owned()),
        y: Some(90.0),
        letter_spacing: Some(10.0),
        ..TextLayerPatch::default()
    }));
    assert!(matches!(
        spaced.paints.last(),
        Some(PaintOp::Text { spaced: true, .. })
    ));

    let a = ink_bbox(&native.frame, 128);
    let b = ink_bbox(&spaced.frame, 128);
    assert_near(center(b), (600.0, 1080.0), 8.0);
    // Three gaps of 10 preview px at a 2x export factor.
    let extra = (b.2 - b.0) as i64 - (a.2 - a.0) as i64;
    assert!((extra - 60).abs() <= 12, "extra width {extra}");
}

#[test]
fn rotated_text_turns_about_its_anchor() {
    let r = render_text(&text_scene(TextLayerPatch {
        text: Some("SALESALE".to_owned()),
        rotation: Some(90.0),
        ..TextLayerPatch::default()
    }));
    let bbox = ink_bbox(&r.frame, 128);
    assert_near(center(bbox), (600.0, 600.0), 8.0);
    assert!(bbox.3 - bbox.1 > 2 * (bbox.2 - bbox.0), "{bbox:?}");
}

#[test]
fn translucent_text_blends_with_the_background() {
    let r = render_text(&text_scene(TextLayerPatch {
        text: Some("SALE".to_owned()),
        opacity: Some(0.5),
        ..TextLayerPatch::default()
    }));
    let darkest = (0..r.frame.height)
        .flat_map(|y| (0..r.frame.width).map(move |x| (x, y)))
        .filter_map(|(x, y)| r.frame.pixel(x, y))
        .map(|[r, g, b, _]| r.max(g).max(b))
        .min()
        .unwrap();
    // Half-covered black over white, never fully black.
    assert!((118..=140).contains(&darkest), "darkest pixel {darkest}");
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let config = EditorConfig {
        preview_bounds: PreviewBounds {
            width: 0.0,
            height: 600.0,
        },
        ..EditorConfig::default()
    };
    let Err(err) = Compositor::from_config(&config) else {
        panic!("empty preview bounds accepted");
    };
    assert!(matches!(err, ThumbError::Validation(_)));
}
