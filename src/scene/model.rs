use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::assets::color::Color;
use crate::assets::image::ImageRef;
use crate::foundation::core::Point;
use crate::foundation::error::ThumbError;
use crate::foundation::math::normalize_degrees;

/// Stable identity of a text layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "text-{}", self.0)
    }
}

/// Target aspect ratio of the composition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 16:9 landscape.
    #[default]
    #[serde(rename = "16:9")]
    Wide,
    /// 1:1 square.
    #[serde(rename = "1:1")]
    Square,
    /// 9:16 portrait.
    #[serde(rename = "9:16")]
    Tall,
}

impl AspectRatio {
    /// All supported ratios.
    pub const ALL: [Self; 3] = [Self::Wide, Self::Square, Self::Tall];

    /// Ratio literal, e.g. `"16:9"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wide => "16:9",
            Self::Square => "1:1",
            Self::Tall => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = ThumbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ar| ar.as_str() == s.trim())
            .ok_or_else(|| {
                ThumbError::validation(format!(
                    "unknown aspect ratio '{s}' (expected 16:9, 1:1 or 9:16)"
                ))
            })
    }
}

/// One styled text string placed on the canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct TextLayer {
    /// Identity, unique within the scene.
    pub id: LayerId,
    /// Literal text.
    pub text: String,
    /// Horizontal anchor in percent of canvas width.
    pub x: f64,
    /// Vertical anchor in percent of canvas height.
    pub y: f64,
    /// Font size in preview pixels.
    pub font_size: f64,
    /// Font family name.
    pub font_family: String,
    /// Fill color.
    pub color: Color,
    /// Font weight (100..=900).
    pub font_weight: u16,
    /// Rotation in degrees, `[-180, 180]`.
    pub rotation: f64,
    /// Opacity, `[0, 1]`.
    pub opacity: f64,
    /// Extra spacing between characters in preview pixels; `0` keeps native shaping.
    pub letter_spacing: f64,
}

/// Partial update of a [`TextLayer`]; `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextLayerPatch {
    /// New text.
    pub text: Option<String>,
    /// New horizontal anchor.
    pub x: Option<f64>,
    /// New vertical anchor.
    pub y: Option<f64>,
    /// New font size.
    pub font_size: Option<f64>,
    /// New font family.
    pub font_family: Option<String>,
    /// New fill color.
    pub color: Option<Color>,
    /// New font weight.
    pub font_weight: Option<u16>,
    /// New rotation.
    pub rotation: Option<f64>,
    /// New opacity.
    pub opacity: Option<f64>,
    /// New letter spacing.
    pub letter_spacing: Option<f64>,
    /// Move below (`true`) or above (`false`) the subject.
    pub behind: Option<bool>,
}

impl TextLayer {
    /// Apply the style fields of `patch`, clamping every value into its valid range.
    ///
    /// `patch.behind` is a stacking change and is handled by [`LayerStack::update_text`].
    pub fn apply(&mut self, patch: &TextLayerPatch) {
        if let Some(text) = &patch.text {
            self.text.clone_from(text);
        }
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(size) = patch.font_size {
            self.font_size = size;
        }
        if let Some(family) = &patch.font_family {
            self.font_family.clone_from(family);
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(weight) = patch.font_weight {
            self.font_weight = weight;
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = rotation;
        }
        if let Some(opacity) = patch.opacity {
            self.opacity = opacity;
        }
        if let Some(spacing) = patch.letter_spacing {
            self.letter_spacing = spacing;
        }
        self.sanitize();
    }

    fn sanitize(&mut self) {
        self.x = clamp_percent(self.x);
        self.y = clamp_percent(self.y);
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            self.font_size = 1.0;
        }
        self.font_weight = self.font_weight.clamp(100, 900);
        self.rotation = finite_or(self.rotation, 0.0).clamp(-180.0, 180.0);
        self.opacity = finite_or(self.opacity, 1.0).clamp(0.0, 1.0);
        self.letter_spacing = finite_or(self.letter_spacing, 0.0).max(0.0);
    }
}

/// Create a text layer with editor defaults, then apply `overrides`.
pub fn create_text_layer(id: LayerId, overrides: &TextLayerPatch) -> TextLayer {
    let mut layer = TextLayer {
        id,
        text: "Your Text Here".to_owned(),
        x: 50.0,
        y: 50.0,
        font_size: 48.0,
        font_family: "Inter".to_owned(),
        color: Color::WHITE,
        font_weight: 700,
        rotation: 0.0,
        opacity: 1.0,
        letter_spacing: 0.0,
    };
    layer.apply(overrides);
    layer
}

/// Placement of the background-removed cutout.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectTransform {
    /// Center in percent of the canvas extent.
    pub position: Point,
    /// Percent of the base size (100 = natural).
    pub scale: f64,
    /// Degrees of clockwise rotation; unbounded, see [`SubjectTransform::display_rotation`].
    pub rotation: f64,
}

impl Default for SubjectTransform {
    fn default() -> Self {
        reset_subject_transform()
    }
}

impl SubjectTransform {
    /// Rotation normalized to `(-180, 180]` for display.
    pub fn display_rotation(&self) -> f64 {
        normalize_degrees(self.rotation)
    }
}

/// The reset value: centered, 100% scale, no rotation.
pub fn reset_subject_transform() -> SubjectTransform {
    SubjectTransform {
        position: Point::new(50.0, 50.0),
        scale: 100.0,
        rotation: 0.0,
    }
}

/// Outline stroke style tag. Accepted and stored; the raster path ignores it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    /// Solid.
    #[default]
    Solid,
    /// Dashed.
    Dashed,
    /// Dotted.
    Dotted,
}

/// Glow/outline around the subject.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderEffect {
    /// Whether the effect is drawn.
    pub enabled: bool,
    /// Outline thickness, `[1, 10]`; also the number of stacked shadow passes.
    pub width: u32,
    /// Glow color.
    pub color: Color,
    /// Glow radius, `[0, 30]`.
    #[serde(alias = "blur")]
    pub glow_radius: f64,
    /// Style tag.
    pub style: BorderStyle,
}

impl Default for BorderEffect {
    fn default() -> Self {
        Self {
            enabled: false,
            width: 3,
            color: Color::rgb(0x8b, 0x5c, 0xf6),
            glow_radius: 8.0,
            style: BorderStyle::Solid,
        }
    }
}

impl BorderEffect {
    /// Copy with `width` and `glow_radius` clamped into range.
    pub fn sanitized(mut self) -> Self {
        self.width = self.width.clamp(1, 10);
        self.glow_radius = finite_or(self.glow_radius, 0.0).clamp(0.0, 30.0);
        self
    }

    /// Canvas-style shadow blur used by the raster glow: `glow_radius + width`.
    pub fn shadow_blur(&self) -> f64 {
        self.glow_radius + f64::from(self.width)
    }
}

/// What fills the canvas behind everything.
#[derive(Clone, Debug, PartialEq)]
pub struct BackgroundSpec {
    /// Solid fill, also the fallback when an image fails to decode.
    pub color: Color,
    /// Uploaded custom background.
    pub custom_image: Option<ImageRef>,
    /// Prefer the custom image.
    pub use_custom_image: bool,
    /// Prefer the original (pre-removal) upload.
    pub use_original_image: bool,
}

impl Default for BackgroundSpec {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            custom_image: None,
            use_custom_image: false,
            use_original_image: false,
        }
    }
}

/// One entry of the paint stack.
#[derive(Clone, Debug, PartialEq)]
pub enum Layer {
    /// The cutout subject. Exactly one per stack.
    Subject,
    /// A text layer.
    Text(TextLayer),
}

/// Bottom-to-top paint order of the subject and all text layers.
///
/// Text below the subject entry is "behind" it. Each bucket keeps insertion order, and layers can
/// be restacked freely with [`LayerStack::move_layer`].
#[derive(Clone, Debug, PartialEq)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self {
            layers: vec![Layer::Subject],
        }
    }
}

impl LayerStack {
    /// Bottom-to-top iteration.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    /// Number of entries including the subject.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Always `false`; the subject entry is permanent.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Index of the subject entry.
    pub fn subject_index(&self) -> usize {
        self.layers
            .iter()
            .position(|l| matches!(l, Layer::Subject))
            .unwrap_or(0)
    }

    fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers
            .iter()
            .position(|l| matches!(l, Layer::Text(t) if t.id == id))
    }

    /// Text layers bottom to top.
    pub fn texts(&self) -> impl Iterator<Item = &TextLayer> {
        self.layers.iter().filter_map(|l| match l {
            Layer::Text(t) => Some(t),
            Layer::Subject => None,
        })
    }

    /// Look up a text layer.
    pub fn text(&self, id: LayerId) -> Option<&TextLayer> {
        self.texts().find(|t| t.id == id)
    }

    /// `Some(true)` when the layer paints under the subject.
    pub fn is_behind(&self, id: LayerId) -> Option<bool> {
        let i = self.index_of(id)?;
        Some(i < self.subject_index())
    }

    /// Text layers painted under the subject, in paint order.
    pub fn behind(&self) -> impl Iterator<Item = &TextLayer> {
        self.layers[..self.subject_index()]
            .iter()
            .filter_map(|l| match l {
                Layer::Text(t) => Some(t),
                Layer::Subject => None,
            })
    }

    /// Text layers painted over the subject, in paint order.
    pub fn front(&self) -> impl Iterator<Item = &TextLayer> {
        self.layers[self.subject_index() + 1..]
            .iter()
            .filter_map(|l| match l {
                Layer::Text(t) => Some(t),
                Layer::Subject => None,
            })
    }

    /// Distinct font families in first-seen order.
    pub fn font_families(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for t in self.texts() {
            if !out.contains(&t.font_family.as_str()) {
                out.push(&t.font_family);
            }
        }
        out
    }

    /// Add a layer on top of its bucket.
    pub fn push_text(&mut self, layer: TextLayer, behind: bool) {
        if behind {
            let at = self.subject_index();
            self.layers.insert(at, Layer::Text(layer));
        } else {
            self.layers.push(Layer::Text(layer));
        }
    }

    /// Partially update a layer in place. Returns `false` when `id` is unknown.
    ///
    /// Changing `behind` moves the layer to the top of the other bucket.
    pub fn update_text(&mut self, id: LayerId, patch: &TextLayerPatch) -> bool {
        let Some(i) = self.index_of(id) else {
            return false;
        };
        if let Layer::Text(t) = &mut self.layers[i] {
            t.apply(patch);
        }
        if let Some(behind) = patch.behind
            && behind != (i < self.subject_index())
            && let Layer::Text(t) = self.layers.remove(i)
        {
            self.push_text(t, behind);
        }
        true
    }

    /// Copy a layer under `new_id`, offset by `offset` percent on both axes, on top of the same
    /// bucket. The source layer is not modified.
    pub fn duplicate_text(&mut self, id: LayerId, new_id: LayerId, offset: f64) -> Option<LayerId> {
        let behind = self.is_behind(id)?;
        let mut copy = self.text(id)?.clone();
        copy.id = new_id;
        copy.x = clamp_percent(copy.x + offset);
        copy.y = clamp_percent(copy.y + offset);
        self.push_text(copy, behind);
        Some(new_id)
    }

    /// Remove a layer, returning it.
    pub fn remove_text(&mut self, id: LayerId) -> Option<TextLayer> {
        let i = self.index_of(id)?;
        match self.layers.remove(i) {
            Layer::Text(t) => Some(t),
            Layer::Subject => None,
        }
    }

    /// Move a text layer to stack index `index` (clamped), bottom = 0.
    pub fn move_layer(&mut self, id: LayerId, index: usize) -> bool {
        let Some(i) = self.index_of(id) else {
            return false;
        };
        let layer = self.layers.remove(i);
        let at = index.min(self.layers.len());
        self.layers.insert(at, layer);
        true
    }
}

/// Background-removal progress as shown to the user.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProcessingState {
    /// A removal is running.
    pub active: bool,
    /// Percent complete, `[0, 100]`.
    pub progress: f64,
    /// Human-readable stage.
    pub stage: String,
}

/// What is selected in the editor. Subject and text selection exclude each other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Selection {
    /// Nothing selected.
    #[default]
    None,
    /// The subject is selected.
    Subject,
    /// A text layer is selected.
    Text(LayerId),
}

/// The whole composition.
///
/// Cloning is cheap (images are shared), which is how exports take their snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneModel {
    /// The uploaded photo, before background removal.
    pub original_image: Option<ImageRef>,
    /// Alpha-masked cutout of the current `original_image`.
    pub processed_image: Option<ImageRef>,
    /// Background-removal progress.
    pub processing: ProcessingState,
    /// Subject and text layers in paint order.
    pub layers: LayerStack,
    /// Subject placement.
    pub subject: SubjectTransform,
    /// Subject glow.
    pub border: BorderEffect,
    /// Background.
    pub background: BackgroundSpec,
    /// Target aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Current selection.
    pub selection: Selection,
}

fn clamp_percent(v: f64) -> f64 {
    finite_or(v, 50.0).clamp(0.0, 100.0)
}

fn finite_or(v: f64, default: f64) -> f64 {
    if v.is_finite() { v } else { default }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
