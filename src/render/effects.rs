//! Subject glow.
//!
//! The glow is a canvas-style drop shadow with zero offset: the subject's alpha silhouette,
//! tinted with the border color and blurred with a gaussian of `sigma = shadow_blur / 2`. It is
//! built once per export in the subject's unrotated frame, padded by the kernel radius, and then
//! painted like any other image under the subject's transform.

use crate::assets::color::Color;
use crate::foundation::core::{Affine, Size};
use crate::foundation::error::{ThumbError, ThumbResult};
use crate::foundation::math::mul_div255_u8;
use crate::render::cpu;

/// A blurred, tinted silhouette ready to paint.
pub(crate) struct GlowLayer {
    pub(crate) paint: vello_cpu::Image,
    pub(crate) width: u32,
    pub(crate) height: u32,
    /// Extra margin around the subject on every side.
    pub(crate) pad: f64,
}

/// Kernel radius covering three standard deviations.
pub(crate) fn kernel_radius(sigma: f64) -> u32 {
    if !(sigma.is_finite() && sigma > 0.0) {
        return 0;
    }
    (sigma * 3.0).ceil() as u32
}

pub(crate) fn gaussian_kernel_q16(radius: u32, sigma: f64) -> ThumbResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(ThumbError::validation("blur sigma must be finite and > 0"));
    }

    let r = radius as i32;
    let denom = 2.0 * sigma * sigma;
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();
    if sum <= 0.0 {
        return Err(ThumbError::render("gaussian kernel sum is zero"));
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // Put the rounding remainder on the center tap so the kernel sums to exactly 1.0.
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }

    Ok(weights)
}

/// Separable blur of a single 8-bit channel, clamping at the edges.
pub(crate) fn blur_alpha_q16(src: &[u8], width: u32, height: u32, kernel_q16: &[u32]) -> Vec<u8> {
    if kernel_q16.len() <= 1 {
        return src.to_vec();
    }
    let mut tmp = vec![0u8; src.len()];
    let mut dst = vec![0u8; src.len()];
    let (w, h) = (width as usize, height as usize);
    let radius = (kernel_q16.len() / 2) as isize;

    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0u64;
            for (ki, &kw) in kernel_q16.iter().enumerate() {
                let sx = (x as isize + ki as isize - radius).clamp(0, w as isize - 1) as usize;
                acc += u64::from(kw) * u64::from(row[sx]);
            }
            tmp[y * w + x] = q16_to_u8(acc);
        }
    }
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0u64;
            for (ki, &kw) in kernel_q16.iter().enumerate() {
                let sy = (y as isize + ki as isize - radius).clamp(0, h as isize - 1) as usize;
                acc += u64::from(kw) * u64::from(tmp[sy * w + x]);
            }
            dst[y * w + x] = q16_to_u8(acc);
        }
    }
    dst
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    (v.min(255)) as u8
}

/// Premultiplied RGBA8 of `color` at coverage `alpha`.
pub(crate) fn tint_alpha(alpha: &[u8], color: Color) -> Vec<u8> {
    let c = color.to_premul();
    let mut out = Vec::with_capacity(alpha.len() * 4);
    for &a in alpha {
        let a = u16::from(a);
        out.extend_from_slice(&[
            mul_div255_u8(u16::from(c.r), a),
            mul_div255_u8(u16::from(c.g), a),
            mul_div255_u8(u16::from(c.b), a),
            mul_div255_u8(u16::from(c.a), a),
        ]);
    }
    out
}

/// Build the glow for a subject image of `src_w` x `src_h` drawn at `display` size.
pub(crate) fn glow_layer(
    subject: &vello_cpu::Image,
    src_w: u32,
    src_h: u32,
    display: Size,
    shadow_blur: f64,
    color: Color,
) -> ThumbResult<GlowLayer> {
    let sigma = shadow_blur / 2.0;
    let radius = kernel_radius(sigma);
    let pad = f64::from(radius);
    let width = (display.width + 2.0 * pad).ceil().max(1.0) as u32;
    let height = (display.height + 2.0 * pad).ceil().max(1.0) as u32;
    let (w16, h16) = cpu::canvas_dims_u16(crate::foundation::core::Canvas::new(width, height))?;

    let mut ctx = vello_cpu::RenderContext::new(w16, h16);
    cpu::fill_image(
        &mut ctx,
        subject.clone(),
        src_w,
        src_h,
        crate::foundation::core::Rect::from_origin_size((pad, pad), display),
        Affine::IDENTITY,
    );
    let silhouette = cpu::finish(&mut ctx, w16, h16);

    let alpha: Vec<u8> = silhouette
        .data_as_u8_slice()
        .chunks_exact(4)
        .map(|px| px[3])
        .collect();
    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let blurred = blur_alpha_q16(&alpha, width, height, &kernel);
    let paint = cpu::image_paint(&tint_alpha(&blurred, color), width, height)?;

    Ok(GlowLayer {
        paint,
        width,
        height,
        pad,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/effects.rs"]
mod tests;
