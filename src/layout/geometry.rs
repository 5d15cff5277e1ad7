//! Pure mapping between aspect ratios, preview space and export space.
//!
//! Preview and export share one convention: positions are percentages of the canvas, subject and
//! text sizes are preview pixels, and `export.width / preview.width` re-projects them.

use crate::assets::image::ImageRef;
use crate::config::PreviewBounds;
use crate::foundation::core::{Canvas, Point, Rect, Size};
use crate::scene::model::{AspectRatio, BackgroundSpec, SubjectTransform};

/// Full export resolution for `ar`.
pub fn export_dimensions(ar: AspectRatio) -> Canvas {
    match ar {
        AspectRatio::Wide => Canvas::new(1920, 1080),
        AspectRatio::Tall => Canvas::new(1080, 1920),
        AspectRatio::Square => Canvas::new(1200, 1200),
    }
}

/// Preview display size: the export size uniformly scaled to fit `bounds`.
pub fn preview_box(ar: AspectRatio, bounds: PreviewBounds) -> Size {
    let export = export_dimensions(ar);
    let (w, h) = (f64::from(export.width), f64::from(export.height));
    // Whichever edge binds is taken verbatim so the common cases stay exact.
    if bounds.width / w <= bounds.height / h {
        Size::new(bounds.width, h * bounds.width / w)
    } else {
        Size::new(w * bounds.height / h, bounds.height)
    }
}

/// Preview-to-export scale factor, `export.width / preview.width`.
pub fn preview_scale(ar: AspectRatio, bounds: PreviewBounds) -> f64 {
    f64::from(export_dimensions(ar).width) / preview_box(ar, bounds).width
}

/// The preview box rounded to whole pixels, used when rasterizing the preview.
pub fn preview_canvas(ar: AspectRatio, bounds: PreviewBounds) -> Canvas {
    let size = preview_box(ar, bounds);
    Canvas::new(
        (size.width.round() as u32).max(1),
        (size.height.round() as u32).max(1),
    )
}

/// Current background image: custom (flag and image) beats original (flag and image); otherwise
/// the solid color applies and this returns `None`.
pub fn resolve_background<'a>(
    spec: &'a BackgroundSpec,
    original: Option<&'a ImageRef>,
) -> Option<&'a ImageRef> {
    if spec.use_custom_image
        && let Some(img) = &spec.custom_image
    {
        return Some(img);
    }
    if spec.use_original_image {
        return original;
    }
    None
}

/// Size of a 100%-scale subject in preview pixels: the image fitted inside a `base` square,
/// keeping its aspect ratio. Unknown dimensions fill the square.
pub fn subject_footprint(base: f64, image_w: u32, image_h: u32) -> Size {
    if image_w == 0 || image_h == 0 {
        return Size::new(base, base);
    }
    let aspect = f64::from(image_w) / f64::from(image_h);
    if aspect > 1.0 {
        Size::new(base, base / aspect)
    } else {
        Size::new(base * aspect, base)
    }
}

/// Map a percent position onto `canvas`.
pub fn percent_to_canvas(canvas: Size, percent: Point) -> Point {
    Point::new(
        canvas.width * percent.x / 100.0,
        canvas.height * percent.y / 100.0,
    )
}

/// Unrotated draw rectangle of the subject on `canvas`.
///
/// `canvas_scale` is the preview-to-canvas factor (the preview scale for export, `1` for a
/// preview-sized canvas).
pub fn subject_rect(
    canvas: Canvas,
    transform: &SubjectTransform,
    footprint: Size,
    canvas_scale: f64,
) -> Rect {
    let k = canvas_scale * transform.scale / 100.0;
    let size = Size::new(footprint.width * k, footprint.height * k);
    let center = percent_to_canvas(canvas.size(), transform.position);
    Rect::from_center_size(center, size)
}

/// Destination rectangle that covers `canvas` with an `image_w` x `image_h` image, preserving its
/// aspect ratio and centering the overflow.
pub fn cover_rect(image_w: u32, image_h: u32, canvas: Canvas) -> Rect {
    let (cw, ch) = (f64::from(canvas.width), f64::from(canvas.height));
    if image_w == 0 || image_h == 0 {
        return canvas.rect();
    }
    let img_aspect = f64::from(image_w) / f64::from(image_h);
    if img_aspect > canvas.aspect() {
        let w = ch * img_aspect;
        Rect::new((cw - w) / 2.0, 0.0, (cw + w) / 2.0, ch)
    } else {
        let h = cw / img_aspect;
        Rect::new(0.0, (ch - h) / 2.0, cw, (ch + h) / 2.0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/geometry.rs"]
mod tests;
