//! The single owner of the live scene.
//!
//! Every mutation goes through [`SessionStore`]'s action API; renderers and exports work on
//! [`SessionStore::snapshot`] clones, so edits made while an export is in flight never reach it.

use std::future::Future;
use std::io::Cursor;

use anyhow::Context;

use crate::assets::color::Color;
use crate::assets::fonts::{FontGate, FontProvider};
use crate::assets::image::{ImageLoader, ImageRef};
use crate::config::EditorConfig;
use crate::export::sink::DownloadSink;
use crate::foundation::core::Point;
use crate::foundation::error::ThumbResult;
use crate::render::compositor::{Compositor, ExportOutcome};
use crate::scene::def::LoadedSceneDef;
use crate::scene::model::{
    AspectRatio, BorderEffect, LayerId, ProcessingState, SceneModel, Selection, TextLayerPatch,
    create_text_layer, reset_subject_transform,
};

/// External background-removal collaborator.
pub trait BackgroundRemover {
    /// Return alpha-masked image bytes for `input`, reporting `(stage_key, current, total)`
    /// progress along the way.
    fn remove_background(
        &self,
        input: &[u8],
        progress: &mut dyn FnMut(&str, u64, u64),
    ) -> impl Future<Output = anyhow::Result<Vec<u8>>>;
}

/// Remover for inputs that already carry their alpha mask: decodes and re-encodes as PNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlphaPassthrough;

impl BackgroundRemover for AlphaPassthrough {
    async fn remove_background(
        &self,
        input: &[u8],
        progress: &mut dyn FnMut(&str, u64, u64),
    ) -> anyhow::Result<Vec<u8>> {
        progress("decode", 0, 2);
        let img = image::load_from_memory(input).context("decode input image")?;
        progress("encode", 1, 2);
        let mut buf = Vec::new();
        img.to_rgba8()
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .context("encode cutout png")?;
        progress("encode", 2, 2);
        Ok(buf)
    }
}

/// Handle for one upload. Only the newest ticket may change processing state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IngestTicket(u64);

/// Holds the one [`SceneModel`] for the session.
#[derive(Debug, Default)]
pub struct SessionStore {
    config: EditorConfig,
    scene: SceneModel,
    next_layer: u64,
    ingest_seq: u64,
}

impl SessionStore {
    /// Empty session. Fails when `config` does not validate.
    pub fn new(config: EditorConfig) -> ThumbResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            scene: SceneModel::default(),
            next_layer: 1,
            ingest_seq: 0,
        })
    }

    /// Editor configuration.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Read access to the live scene.
    pub fn scene(&self) -> &SceneModel {
        &self.scene
    }

    /// Immutable copy for a render or export.
    pub fn snapshot(&self) -> SceneModel {
        self.scene.clone()
    }

    // ---- top-level setters ----

    /// Set or clear the original upload.
    pub fn set_original_image(&mut self, image: Option<ImageRef>) {
        self.scene.original_image = image;
    }

    /// Set or clear the processed cutout.
    pub fn set_processed_image(&mut self, image: Option<ImageRef>) {
        self.scene.processed_image = image;
    }

    /// Replace the processing state.
    pub fn set_processing(&mut self, state: ProcessingState) {
        self.scene.processing = state;
    }

    /// Change the aspect ratio.
    pub fn set_aspect_ratio(&mut self, ar: AspectRatio) {
        self.scene.aspect_ratio = ar;
    }

    /// Replace the selection.
    pub fn select(&mut self, selection: Selection) {
        self.scene.selection = match selection {
            Selection::Text(id) if self.scene.layers.text(id).is_none() => Selection::None,
            s => s,
        };
    }

    /// Select a text layer, deselecting the subject.
    pub fn select_text(&mut self, id: LayerId) {
        self.select(Selection::Text(id));
    }

    /// Select the subject, deselecting any text layer.
    pub fn select_subject(&mut self) {
        self.select(Selection::Subject);
    }

    /// Select nothing.
    pub fn clear_selection(&mut self) {
        self.scene.selection = Selection::None;
    }

    // ---- text layers ----

    fn alloc_layer_id(&mut self) -> LayerId {
        let id = LayerId(self.next_layer.max(1));
        self.next_layer = id.0 + 1;
        id
    }

    /// Add a default text layer in front of the subject and select it.
    pub fn add_text_layer(&mut self) -> LayerId {
        self.add_text_layer_with(&TextLayerPatch::default())
    }

    /// Add a text layer with `overrides` applied to the defaults and select it.
    pub fn add_text_layer_with(&mut self, overrides: &TextLayerPatch) -> LayerId {
        let id = self.alloc_layer_id();
        let layer = create_text_layer(id, overrides);
        self.scene
            .layers
            .push_text(layer, overrides.behind.unwrap_or(false));
        self.scene.selection = Selection::Text(id);
        id
    }

    /// Partially update a text layer. Returns `false` for an unknown id.
    pub fn update_text_layer(&mut self, id: LayerId, patch: &TextLayerPatch) -> bool {
        self.scene.layers.update_text(id, patch)
    }

    /// Copy a text layer, offset by the configured delta. Selection is unchanged.
    pub fn duplicate_text_layer(&mut self, id: LayerId) -> Option<LayerId> {
        self.scene.layers.text(id)?;
        let new_id = self.alloc_layer_id();
        self.scene
            .layers
            .duplicate_text(id, new_id, self.config.duplicate_offset)
    }

    /// Delete a text layer, clearing the selection if it was selected.
    pub fn delete_text_layer(&mut self, id: LayerId) -> bool {
        let removed = self.scene.layers.remove_text(id).is_some();
        if self.scene.selection == Selection::Text(id) {
            self.scene.selection = Selection::None;
        }
        removed
    }

    /// Restack a text layer to `index` in the bottom-to-top layer list.
    pub fn move_layer(&mut self, id: LayerId, index: usize) -> bool {
        self.scene.layers.move_layer(id, index)
    }

    // ---- subject ----

    /// Move the subject center, in percent; clamped to `[0, 100]`.
    pub fn set_subject_position(&mut self, position: Point) {
        let clamp = |v: f64| if v.is_finite() { v.clamp(0.0, 100.0) } else { 50.0 };
        self.scene.subject.position = Point::new(clamp(position.x), clamp(position.y));
    }

    /// Set the subject scale, clamped to the configured range.
    pub fn set_subject_scale(&mut self, scale: f64) {
        if scale.is_finite() {
            self.scene.subject.scale = self.config.clamp_scale(scale);
        }
    }

    /// Set the subject rotation in degrees.
    pub fn set_subject_rotation(&mut self, rotation: f64) {
        if rotation.is_finite() {
            self.scene.subject.rotation = rotation;
        }
    }

    /// Center the subject at 100% scale with no rotation.
    pub fn reset_subject(&mut self) {
        self.scene.subject = reset_subject_transform();
    }

    // ---- background ----

    /// Solid background color.
    pub fn set_background_color(&mut self, color: Color) {
        self.scene.background.color = color;
    }

    /// Store a custom background and switch to it.
    pub fn set_custom_background(&mut self, image: ImageRef) {
        let bg = &mut self.scene.background;
        bg.custom_image = Some(image);
        bg.use_custom_image = true;
        bg.use_original_image = false;
    }

    /// Toggle the custom-image background. Enabling it disables the original-image background.
    pub fn toggle_use_custom_image(&mut self, enabled: bool) {
        let bg = &mut self.scene.background;
        bg.use_custom_image = enabled;
        if enabled {
            bg.use_original_image = false;
        }
    }

    /// Toggle the original-image background. Enabling it disables the custom-image background.
    pub fn toggle_use_original_image(&mut self, enabled: bool) {
        let bg = &mut self.scene.background;
        bg.use_original_image = enabled;
        if enabled {
            bg.use_custom_image = false;
        }
    }

    // ---- border ----

    /// Replace the border effect in full.
    pub fn set_border_effect(&mut self, effect: BorderEffect) {
        self.scene.border = effect.sanitized();
    }

    // ---- image ingestion ----

    /// Stage a new upload: becomes the original image, the previous cutout is dropped and
    /// processing starts at 0%.
    pub fn begin_ingest(&mut self, image: ImageRef) -> IngestTicket {
        self.ingest_seq += 1;
        self.scene.original_image = Some(image);
        self.scene.processed_image = None;
        self.scene.processing = ProcessingState {
            active: true,
            progress: 0.0,
            stage: "Starting...".to_owned(),
        };
        IngestTicket(self.ingest_seq)
    }

    fn is_current(&self, ticket: IngestTicket) -> bool {
        ticket.0 == self.ingest_seq && self.scene.processing.active
    }

    /// Relay progress for `ticket`; ignored once a newer upload started.
    pub fn report_progress(&mut self, ticket: IngestTicket, progress: f64, stage: impl Into<String>) {
        if !self.is_current(ticket) {
            return;
        }
        self.scene.processing.progress = progress.clamp(0.0, 100.0);
        self.scene.processing.stage = stage.into();
    }

    /// Complete `ticket` with the remover's result. Returns `true` if a cutout was stored.
    pub fn finish_ingest(&mut self, ticket: IngestTicket, result: anyhow::Result<ImageRef>) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!("stale background removal result ignored");
            return false;
        }
        let stored = match result {
            Ok(cutout) => {
                self.scene.processed_image = Some(cutout);
                true
            }
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "background removal failed");
                false
            }
        };
        self.scene.processing = ProcessingState::default();
        stored
    }

    /// Run the whole upload flow: stage `image`, remove its background with `remover`, store the
    /// cutout. Failure leaves no processed image and is not an error.
    #[tracing::instrument(skip_all, fields(image = image.label().unwrap_or("upload")))]
    pub async fn ingest_image<R: BackgroundRemover>(&mut self, image: ImageRef, remover: &R) -> bool {
        let ticket = self.begin_ingest(image.clone());
        self.report_progress(ticket, 10.0, "Initializing...");
        self.report_progress(ticket, 30.0, "Loading model...");
        self.report_progress(ticket, 50.0, "Processing image...");

        let result = {
            let mut relay = |key: &str, current: u64, total: u64| {
                let frac = if total == 0 {
                    0.0
                } else {
                    current as f64 / total as f64
                };
                self.report_progress(ticket, (50.0 + frac * 40.0).min(90.0), format!("Processing: {key}"));
            };
            remover.remove_background(image.bytes(), &mut relay).await
        };
        if result.is_ok() {
            self.report_progress(ticket, 100.0, "Complete!");
        }

        let label = image.label().map(|l| format!("{l} (cutout)"));
        self.finish_ingest(
            ticket,
            result.map(|bytes| {
                let cutout = ImageRef::from_bytes(bytes);
                match label {
                    Some(l) => cutout.with_label(l),
                    None => cutout,
                }
            }),
        )
    }

    // ---- documents ----

    /// Replay a loaded scene document through the action API.
    ///
    /// A document cutout is taken as the processed image as is; without one the caller runs
    /// [`SessionStore::ingest_image`] on the original.
    pub fn apply_def(&mut self, loaded: &LoadedSceneDef) {
        let def = &loaded.def;
        self.set_aspect_ratio(def.aspect_ratio);
        self.set_original_image(loaded.original.clone());
        if let Some(cutout) = &loaded.cutout {
            self.set_processed_image(Some(cutout.clone()));
        }

        self.set_subject_position(def.subject.position);
        self.set_subject_scale(def.subject.scale);
        self.set_subject_rotation(def.subject.rotation);

        self.set_background_color(def.background.color);
        if let Some(custom) = &loaded.custom_background {
            self.set_custom_background(custom.clone());
            self.toggle_use_custom_image(def.background.use_custom_image);
        }
        if def.background.use_original_image {
            self.toggle_use_original_image(true);
        }

        self.set_border_effect(def.border);
        for patch in &def.text_layers {
            self.add_text_layer_with(patch);
        }
        self.clear_selection();
    }

    // ---- export ----

    /// `true` when a processed subject exists.
    pub fn export_available(&self) -> bool {
        self.scene.processed_image.is_some()
    }

    /// Export a snapshot of the scene into `sink`. A no-op returning
    /// [`ExportOutcome::Unavailable`] when no processed subject exists.
    #[tracing::instrument(skip_all)]
    pub async fn export<L: ImageLoader, P: FontProvider, S: DownloadSink>(
        &self,
        compositor: &mut Compositor<L>,
        fonts: &mut FontGate<P>,
        sink: &mut S,
    ) -> ThumbResult<ExportOutcome> {
        if !self.export_available() {
            tracing::debug!("export requested without a processed image");
            return Ok(ExportOutcome::Unavailable);
        }
        let snapshot = self.snapshot();
        let outcome = compositor.export(&snapshot, fonts).await?;
        if let ExportOutcome::Exported(file) = &outcome {
            sink.deliver(&file.file_name, &file.png)?;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/store.rs"]
mod tests;
