//! Editor configuration.
//!
//! Every field has a default matching the stock editor, so a partial JSON document (or none at
//! all) is valid.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::foundation::error::{ThumbError, ThumbResult};

/// Bounding box the preview surface is fitted into, in logical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreviewBounds {
    /// Max preview width.
    pub width: f64,
    /// Max preview height.
    pub height: f64,
}

impl Default for PreviewBounds {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

/// Where fonts come from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Directory searched for `<Family>*.ttf|otf`.
    pub dir: Option<PathBuf>,
    /// Explicit family -> font file mapping, checked before `dir`.
    pub families: BTreeMap<String, PathBuf>,
    /// Font used when a family cannot be loaded.
    pub fallback: Option<PathBuf>,
}

/// Tunables shared by the store, the transform controller and the compositor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Preview bounding box.
    pub preview_bounds: PreviewBounds,
    /// Edge length of a 100%-scale subject in preview pixels.
    pub subject_base_size: f64,
    /// Offset applied on both axes to a duplicated text layer, in percent.
    pub duplicate_offset: f64,
    /// Inclusive subject scale range applied by every control.
    pub scale_range: [f64; 2],
    /// Export file name prefix.
    pub export_file_prefix: String,
    /// Minimum longest edge when rasterizing SVG input.
    pub svg_min_edge: u32,
    /// Font sources.
    pub fonts: FontConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            preview_bounds: PreviewBounds::default(),
            subject_base_size: 400.0,
            duplicate_offset: 5.0,
            scale_range: [10.0, 300.0],
            export_file_prefix: "thumbnail".to_owned(),
            svg_min_edge: 2048,
            fonts: FontConfig::default(),
        }
    }
}

impl EditorConfig {
    /// Read a JSON config file.
    pub fn from_path(path: &Path) -> ThumbResult<Self> {
        let s = std::fs::read_to_string(path).map_err(|e| {
            ThumbError::io(format!("failed to read config '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&s)
    }

    /// Parse a JSON config document and validate it.
    pub fn from_json_str(s: &str) -> ThumbResult<Self> {
        let cfg: Self = serde_json::from_str(s).map_err(|e| ThumbError::serde(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `THUMBKIT_FONT_DIR` and `THUMBKIT_FALLBACK_FONT` when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = std::env::var_os("THUMBKIT_FONT_DIR").filter(|v| !v.is_empty()) {
            self.fonts.dir = Some(PathBuf::from(dir));
        }
        if let Some(f) = std::env::var_os("THUMBKIT_FALLBACK_FONT").filter(|v| !v.is_empty()) {
            self.fonts.fallback = Some(PathBuf::from(f));
        }
        self
    }

    /// Reject values the geometry cannot work with.
    pub fn validate(&self) -> ThumbResult<()> {
        let PreviewBounds { width, height } = self.preview_bounds;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ThumbError::validation(
                "preview_bounds must be finite and > 0",
            ));
        }
        if !(self.subject_base_size.is_finite() && self.subject_base_size > 0.0) {
            return Err(ThumbError::validation(
                "subject_base_size must be finite and > 0",
            ));
        }
        let [lo, hi] = self.scale_range;
        if !(lo.is_finite() && hi.is_finite() && lo > 0.0 && lo <= hi) {
            return Err(ThumbError::validation(
                "scale_range must be [min, max] with 0 < min <= max",
            ));
        }
        if !self.duplicate_offset.is_finite() {
            return Err(ThumbError::validation("duplicate_offset must be finite"));
        }
        if self.export_file_prefix.is_empty()
            || self
                .export_file_prefix
                .contains(['/', '\\', ':', '\0'])
        {
            return Err(ThumbError::validation(
                "export_file_prefix must be a non-empty plain file name",
            ));
        }
        Ok(())
    }

    /// Clamp a subject scale into [`EditorConfig::scale_range`].
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        let [lo, hi] = self.scale_range;
        scale.clamp(lo, hi)
    }
}
