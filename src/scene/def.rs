//! JSON scene documents.
//!
//! A [`SceneDef`] describes a composition by value, with images referenced by relative paths. It
//! is what the CLI reads; [`SceneDef::load_assets`] resolves the paths into shared image bytes
//! and [`crate::SessionStore::apply_def`] replays it through the action API.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::assets::color::Color;
use crate::assets::image::ImageRef;
use crate::foundation::error::{ThumbError, ThumbResult};
use crate::scene::model::{AspectRatio, BorderEffect, SubjectTransform, TextLayerPatch};

/// Background section of a scene document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundDef {
    /// Solid fill.
    pub color: Color,
    /// Path of a custom background image.
    pub custom_image: Option<String>,
    /// Prefer the custom image.
    pub use_custom_image: bool,
    /// Prefer the original upload.
    pub use_original_image: bool,
}

impl Default for BackgroundDef {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            custom_image: None,
            use_custom_image: false,
            use_original_image: false,
        }
    }
}

/// A whole composition as a document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneDef {
    /// Target aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Path of the uploaded photo.
    pub original: Option<String>,
    /// Path of an already background-removed cutout.
    pub cutout: Option<String>,
    /// Subject placement.
    pub subject: SubjectTransform,
    /// Background.
    pub background: BackgroundDef,
    /// Subject glow.
    pub border: BorderEffect,
    /// Text layers in insertion order; `behind` picks the bucket.
    pub text_layers: Vec<TextLayerPatch>,
}

/// A [`SceneDef`] with every referenced image read into memory.
#[derive(Clone, Debug)]
pub struct LoadedSceneDef {
    /// The document.
    pub def: SceneDef,
    /// Bytes of `def.original`.
    pub original: Option<ImageRef>,
    /// Bytes of `def.cutout`.
    pub cutout: Option<ImageRef>,
    /// Bytes of `def.background.custom_image`.
    pub custom_background: Option<ImageRef>,
}

impl SceneDef {
    /// Read and validate a JSON scene document.
    pub fn from_path(path: &Path) -> ThumbResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read scene '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Parse and validate a JSON scene document.
    pub fn from_json_str(s: &str) -> ThumbResult<Self> {
        let def: Self = serde_json::from_str(s).map_err(|e| ThumbError::serde(e.to_string()))?;
        def.validate()?;
        Ok(def)
    }

    /// Reject documents whose image paths escape the document directory.
    pub fn validate(&self) -> ThumbResult<()> {
        for p in self.image_paths() {
            normalize_rel_path(p)?;
        }
        Ok(())
    }

    fn image_paths(&self) -> impl Iterator<Item = &str> {
        [
            self.original.as_deref(),
            self.cutout.as_deref(),
            self.background.custom_image.as_deref(),
        ]
        .into_iter()
        .flatten()
    }

    /// Read every referenced image relative to `root`.
    #[tracing::instrument(skip_all, fields(root = %root.display()))]
    pub fn load_assets(&self, root: &Path) -> ThumbResult<LoadedSceneDef> {
        let read = |p: &Option<String>| -> ThumbResult<Option<ImageRef>> {
            let Some(p) = p else {
                return Ok(None);
            };
            let rel = normalize_rel_path(p)?;
            let full: PathBuf = root.join(&rel);
            let bytes = std::fs::read(&full)
                .with_context(|| format!("read image '{}'", full.display()))?;
            tracing::debug!(path = %rel, len = bytes.len(), "loaded scene image");
            Ok(Some(ImageRef::from_bytes(bytes).with_label(rel)))
        };

        Ok(LoadedSceneDef {
            original: read(&self.original)?,
            cutout: read(&self.cutout)?,
            custom_background: read(&self.background.custom_image)?,
            def: self.clone(),
        })
    }
}

/// Normalize a document-relative path: forward slashes, no `.` segments, never absolute and never
/// containing `..`.
pub(crate) fn normalize_rel_path(source: &str) -> ThumbResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(ThumbError::validation("image paths must be relative"));
    }
    if s.is_empty() {
        return Err(ThumbError::validation("image path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(ThumbError::validation("image paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(ThumbError::validation("image path must contain a file name"));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/scene/def.rs"]
mod tests;
