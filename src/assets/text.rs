use std::collections::HashMap;

use crate::assets::fonts::ResolvedFont;
use crate::foundation::error::{ThumbError, ThumbResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// A shaped single-line run ready to be drawn with its origin at the run's top-left corner.
pub(crate) struct ShapedRun {
    pub(crate) layout: parley::Layout<TextBrushRgba8>,
    pub(crate) font: vello_cpu::peniko::FontData,
}

impl ShapedRun {
    /// Advance width of the run.
    pub(crate) fn width(&self) -> f64 {
        f64::from(self.layout.width())
    }

    /// Line box height of the run.
    pub(crate) fn height(&self) -> f64 {
        f64::from(self.layout.height())
    }
}

#[derive(Clone)]
struct RegisteredFamily {
    name: String,
    font: vello_cpu::peniko::FontData,
}

/// Style inputs for shaping one run.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RunStyle {
    pub(crate) size_px: f32,
    pub(crate) weight: f32,
    pub(crate) brush: TextBrushRgba8,
}

/// Stateful helper for building Parley text layouts from raw font bytes.
///
/// Fonts are registered once per [`ResolvedFont::key`].
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    registered: HashMap<String, RegisteredFamily>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            registered: HashMap::new(),
        }
    }

    fn register(&mut self, font: &ResolvedFont) -> ThumbResult<RegisteredFamily> {
        if let Some(r) = self.registered.get(&font.key) {
            return Ok(r.clone());
        }

        let families = self.font_ctx.collection.register_fonts(
            parley::fontique::Blob::from(font.bytes.as_ref().clone()),
            None,
        );
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            ThumbError::decode(format!("no font families registered for '{}'", font.key))
        })?;
        let name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ThumbError::decode("registered font family has no name"))?
            .to_string();

        let registered = RegisteredFamily {
            name,
            font: vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(font.bytes.as_ref().clone()),
                0,
            ),
        };
        self.registered.insert(font.key.clone(), registered.clone());
        Ok(registered)
    }

    /// Shape `text` as one unwrapped line with native kerning and ligatures.
    pub(crate) fn shape(
        &mut self,
        text: &str,
        font: &ResolvedFont,
        style: RunStyle,
    ) -> ThumbResult<ShapedRun> {
        if !style.size_px.is_finite() || style.size_px <= 0.0 {
            return Err(ThumbError::validation(
                "text size_px must be finite and > 0",
            ));
        }
        let family = self.register(font)?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family.name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(style.size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(style.weight),
        ));
        builder.push_default(parley::style::StyleProperty::Brush(style.brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);

        Ok(ShapedRun {
            layout,
            font: family.font,
        })
    }
}

/// Horizontal placement of a manually letter-spaced run.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SpacedRun {
    /// Sum of advances plus the gaps between characters.
    pub(crate) total_width: f64,
    /// Left edge of each character, relative to the run's horizontal center.
    pub(crate) lefts: Vec<f64>,
}

/// Lay characters out left to right with `spacing` between neighbours, centered on x = 0.
pub(crate) fn spaced_run(advances: &[f64], spacing: f64) -> SpacedRun {
    let gaps = advances.len().saturating_sub(1) as f64;
    let total_width = advances.iter().sum::<f64>() + gaps * spacing;

    let mut lefts = Vec::with_capacity(advances.len());
    let mut x = -total_width / 2.0;
    for advance in advances {
        lefts.push(x);
        x += advance + spacing;
    }
    SpacedRun { total_width, lefts }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/text.rs"]
mod tests;
