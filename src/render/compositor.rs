//! Raster compositor.
//!
//! Paints one scene snapshot back to front: background, then the layer stack in order (text
//! below the subject, the subject with its glow, text above it). Every stage that needs an image
//! or fonts awaits it before the next stage starts, so output depends only on the snapshot.

use crate::assets::color::Color;
use crate::assets::fonts::{FontGate, FontProvider, ResolvedFont};
use crate::assets::image::{DecodeLoader, DecodedImage, ImageLoader};
use crate::assets::text::{RunStyle, ShapedRun, TextBrushRgba8, TextLayoutEngine, spaced_run};
use crate::config::{EditorConfig, PreviewBounds};
use crate::export::sink::encode_png;
use crate::foundation::core::{Affine, Canvas, Point, Rect, Size, Vec2};
use crate::foundation::error::ThumbResult;
use crate::layout::geometry::{
    cover_rect, export_dimensions, percent_to_canvas, preview_box, preview_canvas,
    resolve_background, subject_footprint, subject_rect,
};
use crate::render::cpu::{self, FrameRGBA};
use crate::render::effects::glow_layer;
use crate::scene::model::{AspectRatio, Layer, LayerId, SceneModel, TextLayer};

/// Which surface a render targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderTarget {
    /// Full export resolution.
    #[default]
    Export,
    /// The preview box, rounded to whole pixels.
    Preview,
}

/// One paint operation, in the order it was issued.
#[derive(Clone, Debug, PartialEq)]
pub enum PaintOp {
    /// Background image drawn into its cover rectangle.
    BackgroundImage {
        /// Destination rectangle, possibly larger than the canvas.
        rect: Rect,
    },
    /// Solid background fill.
    BackgroundColor(Color),
    /// A text layer.
    Text {
        /// Layer identity.
        id: LayerId,
        /// Anchor point on the canvas.
        anchor: Point,
        /// Font size in canvas pixels.
        font_px: f64,
        /// Drawn character by character with letter spacing.
        spaced: bool,
    },
    /// A text layer that could not be drawn (no usable font).
    TextSkipped {
        /// Layer identity.
        id: LayerId,
        /// Anchor point the text would have been centered on.
        anchor: Point,
    },
    /// One stacked glow pass.
    GlowPass {
        /// 1-based pass number.
        pass: u32,
        /// Shadow blur in canvas pixels.
        blur: f64,
        /// Glow color.
        color: Color,
    },
    /// The subject image.
    Subject {
        /// Unrotated draw rectangle.
        rect: Rect,
        /// Rotation about the rectangle center, in degrees.
        rotation: f64,
    },
}

/// A finished raster.
#[derive(Clone, Debug)]
pub struct RenderedScene {
    /// Premultiplied pixels.
    pub frame: FrameRGBA,
    /// Paint log.
    pub paints: Vec<PaintOp>,
}

/// Result of [`Compositor::render`].
#[derive(Clone, Debug)]
pub enum RenderOutcome {
    /// The scene was rendered.
    Rendered(RenderedScene),
    /// No processed subject exists; nothing was drawn.
    Unavailable,
    /// The subject image failed to decode; the attempt was abandoned.
    Aborted(String),
}

/// An encoded export ready for delivery.
#[derive(Clone, Debug)]
pub struct ExportedFile {
    /// Download file name, e.g. `thumbnail-16x9.png`.
    pub file_name: String,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// PNG bytes.
    pub png: Vec<u8>,
    /// Paint log of the render.
    pub paints: Vec<PaintOp>,
}

/// Result of [`Compositor::export`].
#[derive(Clone, Debug)]
pub enum ExportOutcome {
    /// A file was produced.
    Exported(ExportedFile),
    /// No processed subject exists.
    Unavailable,
    /// The subject image failed to decode; no file was produced.
    Aborted(String),
}

/// `"{prefix}-{ratio}.png"` with `:` in the ratio replaced by `x`.
pub fn export_file_name(prefix: &str, ar: AspectRatio) -> String {
    format!("{prefix}-{}.png", ar.as_str().replace(':', "x"))
}

/// Renders scene snapshots with a pluggable image loader.
pub struct Compositor<L = DecodeLoader> {
    loader: L,
    bounds: PreviewBounds,
    base_size: f64,
    file_prefix: String,
    text: TextLayoutEngine,
}

impl Compositor<DecodeLoader> {
    /// Compositor with the default decoder.
    pub fn from_config(config: &EditorConfig) -> ThumbResult<Self> {
        Self::new(DecodeLoader::new(config.svg_min_edge), config)
    }
}

impl<L: ImageLoader> Compositor<L> {
    /// Compositor using `loader` for every image. Fails when `config` does not validate.
    pub fn new(loader: L, config: &EditorConfig) -> ThumbResult<Self> {
        config.validate()?;
        Ok(Self {
            loader,
            bounds: config.preview_bounds,
            base_size: config.subject_base_size,
            file_prefix: config.export_file_prefix.clone(),
            text: TextLayoutEngine::new(),
        })
    }

    /// Render `scene` onto `target`.
    #[tracing::instrument(skip_all, fields(aspect = %scene.aspect_ratio, target = ?target))]
    pub async fn render<P: FontProvider>(
        &mut self,
        scene: &SceneModel,
        target: RenderTarget,
        fonts: &mut FontGate<P>,
    ) -> ThumbResult<RenderOutcome> {
        let Some(subject) = scene.processed_image.clone() else {
            tracing::debug!("no processed image; render unavailable");
            return Ok(RenderOutcome::Unavailable);
        };

        let ar = scene.aspect_ratio;
        let canvas = match target {
            RenderTarget::Export => export_dimensions(ar),
            RenderTarget::Preview => preview_canvas(ar, self.bounds),
        };
        let canvas_scale = f64::from(canvas.width) / preview_box(ar, self.bounds).width;
        let (w16, h16) = cpu::canvas_dims_u16(canvas)?;
        let mut ctx = vello_cpu::RenderContext::new(w16, h16);
        let mut paints = Vec::new();

        self.paint_background(&mut ctx, scene, canvas, &mut paints)
            .await;

        fonts.request(scene.layers.font_families());
        let mut fonts_ready = false;
        for layer in scene.layers.iter() {
            match layer {
                Layer::Text(t) => {
                    if !fonts_ready {
                        fonts.ready().await;
                        fonts_ready = true;
                    }
                    let op = self.paint_text(&mut ctx, t, fonts, canvas, canvas_scale);
                    paints.push(op);
                }
                Layer::Subject => {
                    let decoded = match self.loader.load(&subject).await {
                        Ok(d) => d,
                        Err(e) => {
                            tracing::error!(
                                error = %e,
                                image = subject.label().unwrap_or("processed"),
                                "failed to load processed image for export"
                            );
                            return Ok(RenderOutcome::Aborted(e.to_string()));
                        }
                    };
                    paint_subject(
                        &mut ctx,
                        scene,
                        &decoded,
                        self.base_size,
                        canvas,
                        canvas_scale,
                        &mut paints,
                    )?;
                }
            }
        }

        let pixmap = cpu::finish(&mut ctx, w16, h16);
        Ok(RenderOutcome::Rendered(RenderedScene {
            frame: cpu::frame_from_pixmap(&pixmap),
            paints,
        }))
    }

    /// Render at export resolution and encode the result as PNG.
    #[tracing::instrument(skip_all, fields(aspect = %scene.aspect_ratio))]
    pub async fn export<P: FontProvider>(
        &mut self,
        scene: &SceneModel,
        fonts: &mut FontGate<P>,
    ) -> ThumbResult<ExportOutcome> {
        let rendered = match self.render(scene, RenderTarget::Export, fonts).await? {
            RenderOutcome::Rendered(r) => r,
            RenderOutcome::Unavailable => return Ok(ExportOutcome::Unavailable),
            RenderOutcome::Aborted(reason) => return Ok(ExportOutcome::Aborted(reason)),
        };
        let png = encode_png(&rendered.frame)?;
        let file_name = export_file_name(&self.file_prefix, scene.aspect_ratio);
        tracing::info!(%file_name, bytes = png.len(), "export encoded");
        Ok(ExportOutcome::Exported(ExportedFile {
            file_name,
            width: rendered.frame.width,
            height: rendered.frame.height,
            png,
            paints: rendered.paints,
        }))
    }

    async fn paint_background(
        &self,
        ctx: &mut vello_cpu::RenderContext,
        scene: &SceneModel,
        canvas: Canvas,
        paints: &mut Vec<PaintOp>,
    ) {
        if let Some(image) = resolve_background(&scene.background, scene.original_image.as_ref()) {
            let drawn = self
                .loader
                .load(image)
                .await
                .and_then(|d| paint_cover(ctx, &d, canvas));
            match drawn {
                Ok(rect) => {
                    paints.push(PaintOp::BackgroundImage { rect });
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "background image failed to load; using solid color");
                }
            }
        }

        let color = scene.background.color;
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(color.to_cpu());
        ctx.fill_rect(&cpu::rect_to_cpu(canvas.rect()));
        paints.push(PaintOp::BackgroundColor(color));
    }

    fn paint_text<P: FontProvider>(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        layer: &TextLayer,
        fonts: &FontGate<P>,
        canvas: Canvas,
        canvas_scale: f64,
    ) -> PaintOp {
        let anchor = percent_to_canvas(canvas.size(), Point::new(layer.x, layer.y));
        let Some(font) = fonts.font_for(&layer.font_family) else {
            tracing::warn!(id = %layer.id, family = %layer.font_family, "no font available; text layer skipped");
            return PaintOp::TextSkipped {
                id: layer.id,
                anchor,
            };
        };
        match draw_text(&mut self.text, ctx, layer, &font, anchor, canvas_scale) {
            Ok(op) => op,
            Err(e) => {
                tracing::warn!(id = %layer.id, error = %e, "text layer could not be shaped; skipped");
                PaintOp::TextSkipped {
                    id: layer.id,
                    anchor,
                }
            }
        }
    }
}

fn paint_cover(
    ctx: &mut vello_cpu::RenderContext,
    image: &DecodedImage,
    canvas: Canvas,
) -> ThumbResult<Rect> {
    let paint = cpu::decoded_paint(image)?;
    let rect = cover_rect(image.width, image.height, canvas);
    cpu::fill_image(ctx, paint, image.width, image.height, rect, Affine::IDENTITY);
    Ok(rect)
}

fn paint_subject(
    ctx: &mut vello_cpu::RenderContext,
    scene: &SceneModel,
    image: &DecodedImage,
    base_size: f64,
    canvas: Canvas,
    canvas_scale: f64,
    paints: &mut Vec<PaintOp>,
) -> ThumbResult<()> {
    let footprint = subject_footprint(base_size, image.width, image.height);
    let rect = subject_rect(canvas, &scene.subject, footprint, canvas_scale);
    let rotation = scene.subject.rotation;
    let center = rect.center().to_vec2();
    let around =
        Affine::translate(center) * Affine::rotate(rotation.to_radians()) * Affine::translate(-center);
    let paint = cpu::decoded_paint(image)?;

    let border = scene.border.sanitized();
    if border.enabled && rect.width() > 0.0 && rect.height() > 0.0 {
        let blur = border.shadow_blur();
        let glow = glow_layer(&paint, image.width, image.height, rect.size(), blur, border.color)?;
        let glow_rect = Rect::from_origin_size(
            (rect.x0 - glow.pad, rect.y0 - glow.pad),
            Size::new(f64::from(glow.width), f64::from(glow.height)),
        );
        // Each pass is one shadowed draw: the shadow, then the subject over it.
        for pass in 1..=border.width {
            cpu::fill_image(ctx, glow.paint.clone(), glow.width, glow.height, glow_rect, around);
            paints.push(PaintOp::GlowPass {
                pass,
                blur,
                color: border.color,
            });
            cpu::fill_image(ctx, paint.clone(), image.width, image.height, rect, around);
            paints.push(PaintOp::Subject { rect, rotation });
        }
    }

    cpu::fill_image(ctx, paint, image.width, image.height, rect, around);
    paints.push(PaintOp::Subject { rect, rotation });
    Ok(())
}

fn draw_text(
    engine: &mut TextLayoutEngine,
    ctx: &mut vello_cpu::RenderContext,
    layer: &TextLayer,
    font: &ResolvedFont,
    anchor: Point,
    canvas_scale: f64,
) -> ThumbResult<PaintOp> {
    let font_px = layer.font_size * canvas_scale;
    let spaced = layer.letter_spacing > 0.0;
    let op = PaintOp::Text {
        id: layer.id,
        anchor,
        font_px,
        spaced,
    };
    if layer.text.is_empty() {
        return Ok(op);
    }

    let style = RunStyle {
        size_px: font_px as f32,
        weight: f32::from(layer.font_weight),
        brush: TextBrushRgba8 {
            r: layer.color.r,
            g: layer.color.g,
            b: layer.color.b,
            a: layer.color.a,
        },
    };
    let base = Affine::translate(anchor.to_vec2()) * Affine::rotate(layer.rotation.to_radians());

    // Shape everything before touching the context so a failure leaves nothing half drawn.
    let placed: Vec<(ShapedRun, Vec2)> = if spaced {
        let runs = layer
            .text
            .chars()
            .map(|ch| engine.shape(&ch.to_string(), font, style))
            .collect::<ThumbResult<Vec<_>>>()?;
        let advances: Vec<f64> = runs.iter().map(ShapedRun::width).collect();
        let height = runs.iter().map(ShapedRun::height).fold(0.0, f64::max);
        let layout = spaced_run(&advances, layer.letter_spacing * canvas_scale);
        runs.into_iter()
            .zip(layout.lefts)
            .map(|(run, left)| (run, Vec2::new(left, -height / 2.0)))
            .collect()
    } else {
        let run = engine.shape(&layer.text, font, style)?;
        let offset = Vec2::new(-run.width() / 2.0, -run.height() / 2.0);
        vec![(run, offset)]
    };

    let opacity = layer.opacity.clamp(0.0, 1.0) as f32;
    if opacity < 1.0 {
        ctx.push_opacity_layer(opacity);
    }
    for (run, offset) in &placed {
        fill_run(ctx, run, base * Affine::translate(*offset));
    }
    if opacity < 1.0 {
        ctx.pop_layer();
    }
    Ok(op)
}

fn fill_run(ctx: &mut vello_cpu::RenderContext, run: &ShapedRun, tr: Affine) {
    ctx.set_transform(cpu::affine_to_cpu(tr));
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    for line in run.layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(glyph_run) = item else {
                continue;
            };
            let brush = glyph_run.style().brush;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                brush.r, brush.g, brush.b, brush.a,
            ));
            // Line-relative pen positions on the baseline, origin at the layout's top-left.
            let glyphs = glyph_run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(&run.font)
                .font_size(glyph_run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
