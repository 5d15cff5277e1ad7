//! vello_cpu plumbing shared by the compositor and the glow effect.

use std::sync::Arc;

use crate::assets::image::DecodedImage;
use crate::foundation::core::{Affine, Canvas, Rect};
use crate::foundation::error::{ThumbError, ThumbResult};

/// A rendered frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Straight-alpha RGBA of the pixel at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(i..i + 4)?;
        let mut out = [px[0], px[1], px[2], px[3]];
        if self.premultiplied {
            crate::foundation::math::unpremultiply_rgba8_in_place(&mut out);
        }
        Some(out)
    }
}

pub(crate) fn canvas_dims_u16(canvas: Canvas) -> ThumbResult<(u16, u16)> {
    let w: u16 = canvas
        .width
        .try_into()
        .map_err(|_| ThumbError::render("canvas width exceeds u16"))?;
    let h: u16 = canvas
        .height
        .try_into()
        .map_err(|_| ThumbError::render("canvas height exceeds u16"))?;
    if w == 0 || h == 0 {
        return Err(ThumbError::render("canvas must be non-empty"));
    }
    Ok((w, h))
}

pub(crate) fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

pub(crate) fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

pub(crate) fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> ThumbResult<vello_cpu::Pixmap> {
    let (w, h) = canvas_dims_u16(Canvas::new(width, height))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(ThumbError::render("pixmap byte len mismatch"));
    }
    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(bytes.len() / 4);
    for px in bytes.chunks_exact(4) {
        may_have_opacities |= px[3] != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        });
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

/// Image paint for premultiplied RGBA8 bytes.
pub(crate) fn image_paint(bytes: &[u8], width: u32, height: u32) -> ThumbResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(bytes, width, height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

pub(crate) fn decoded_paint(img: &DecodedImage) -> ThumbResult<vello_cpu::Image> {
    image_paint(&img.rgba8_premul, img.width, img.height)
}

/// Paint `paint` (an image of `src_w` x `src_h`) into `dst`, under the extra transform `around`.
///
/// `dst` is expressed in the coordinate space `around` maps to the canvas.
pub(crate) fn fill_image(
    ctx: &mut vello_cpu::RenderContext,
    paint: vello_cpu::Image,
    src_w: u32,
    src_h: u32,
    dst: Rect,
    around: Affine,
) {
    let sx = dst.width() / f64::from(src_w.max(1));
    let sy = dst.height() / f64::from(src_h.max(1));
    let tr = around * Affine::translate((dst.x0, dst.y0)) * Affine::scale_non_uniform(sx, sy);
    ctx.set_transform(affine_to_cpu(tr));
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(paint);
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(src_w),
        f64::from(src_h),
    ));
}

/// Rasterize everything recorded in `ctx` into a fresh transparent pixmap.
pub(crate) fn finish(ctx: &mut vello_cpu::RenderContext, width: u16, height: u16) -> vello_cpu::Pixmap {
    let mut pixmap = vello_cpu::Pixmap::new(width, height);
    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);
    pixmap
}

pub(crate) fn frame_from_pixmap(pixmap: &vello_cpu::Pixmap) -> FrameRGBA {
    FrameRGBA {
        width: u32::from(pixmap.width()),
        height: u32::from(pixmap.height()),
        data: pixmap.data_as_u8_slice().to_vec(),
        premultiplied: true,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
