use std::fmt;
use std::future::Future;
use std::sync::Arc;

use anyhow::Context;

use crate::foundation::error::{ThumbError, ThumbResult};
use crate::foundation::math::premultiply_rgba8_in_place;

/// Encoded image bytes shared between the scene model, snapshots and loaders.
///
/// Plays the role of an object URL: cheap to clone, immutable, decoded on demand.
#[derive(Clone)]
pub struct ImageRef {
    bytes: Arc<[u8]>,
    label: Option<Arc<str>>,
}

impl ImageRef {
    /// Wrap encoded image bytes.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            label: None,
        }
    }

    /// Attach a human-readable label (usually the source file name) for logs.
    pub fn with_label(mut self, label: impl Into<Arc<str>>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// `true` when both references point at the same byte buffer.
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

// Identity comparison: two references are equal when they share one buffer.
impl PartialEq for ImageRef {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl fmt::Debug for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageRef")
            .field("label", &self.label)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Decoded raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Asynchronous image decode seam.
///
/// Each call resolves to either a bitmap or a failure; the compositor decides the per-stage
/// fallback.
pub trait ImageLoader {
    /// Decode `image` into a bitmap.
    fn load(&self, image: &ImageRef) -> impl Future<Output = ThumbResult<DecodedImage>>;
}

/// Default loader: raster formats through `image`, SVG documents through `usvg`/`resvg`.
#[derive(Clone, Copy, Debug)]
pub struct DecodeLoader {
    svg_min_edge: u32,
}

impl DecodeLoader {
    /// Create a loader that rasterizes SVG input so its longest edge is at least `svg_min_edge`.
    pub fn new(svg_min_edge: u32) -> Self {
        Self {
            svg_min_edge: svg_min_edge.max(1),
        }
    }
}

impl Default for DecodeLoader {
    fn default() -> Self {
        Self::new(2048)
    }
}

impl ImageLoader for DecodeLoader {
    async fn load(&self, image: &ImageRef) -> ThumbResult<DecodedImage> {
        if looks_like_svg(image.bytes()) {
            decode_svg(image.bytes(), self.svg_min_edge)
        } else {
            decode_image(image.bytes())
        }
    }
}

/// Decode raster bytes in any format supported by `image`.
pub fn decode_image(bytes: &[u8]) -> ThumbResult<DecodedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .context("decode image from memory")
        .map_err(|e| ThumbError::decode(format!("{e:#}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    check_dims(width, height)?;

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(DecodedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Rasterize an SVG document, scaling it so the longest edge reaches `min_edge` pixels.
pub fn decode_svg(bytes: &[u8], min_edge: u32) -> ThumbResult<DecodedImage> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts)
        .map_err(|e| ThumbError::decode(format!("parse svg tree: {e}")))?;

    let size = tree.size();
    let (w, h) = (size.width(), size.height());
    if !w.is_finite() || !h.is_finite() || w <= 0.0 || h <= 0.0 {
        return Err(ThumbError::decode("svg has invalid width/height"));
    }
    let scale = (min_edge as f32 / w.max(h)).max(1.0);
    let width = (w * scale).ceil() as u32;
    let height = (h * scale).ceil() as u32;
    check_dims(width, height)?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| ThumbError::decode("failed to allocate svg pixmap"))?;
    let xform = resvg::tiny_skia::Transform::from_scale(width as f32 / w, height as f32 / h);
    resvg::render(&tree, xform, &mut pixmap.as_mut());

    // tiny-skia pixmaps are already premultiplied RGBA8.
    Ok(DecodedImage {
        width,
        height,
        rgba8_premul: Arc::new(pixmap.take()),
    })
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    // The cut may land inside a multibyte character; keep the valid prefix.
    let text = match std::str::from_utf8(head) {
        Ok(text) => text,
        Err(e) => match std::str::from_utf8(&head[..e.valid_up_to()]) {
            Ok(text) => text,
            Err(_) => return false,
        },
    };
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with('<') && text.contains("<svg")
}

// Raster backend pixmaps are addressed with u16 extents.
fn check_dims(width: u32, height: u32) -> ThumbResult<()> {
    if width == 0 || height == 0 {
        return Err(ThumbError::decode("image has zero width or height"));
    }
    if width > u32::from(u16::MAX) || height > u32::from(u16::MAX) {
        return Err(ThumbError::decode(format!(
            "image too large: {width}x{height} (max {0}x{0})",
            u16::MAX
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/image.rs"]
mod tests;
