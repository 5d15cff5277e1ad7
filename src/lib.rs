//! Thumbkit is a thumbnail composition and export engine.
//!
//! A session holds one scene: a background-removed subject, free text layers and an optional
//! glow, over a solid or image background. The same scene renders as a bounded preview and as a
//! full-resolution export whose proportions match the preview exactly.
//!
//! - Mutate the scene through a [`SessionStore`]
//! - Drive subject gestures with a [`TransformController`]
//! - Rasterize snapshots with a [`Compositor`], gated on fonts by a [`FontGate`]
//! - Deliver PNG exports into a [`DownloadSink`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod assets;
pub(crate) mod config;
pub(crate) mod export;
pub(crate) mod interact;
pub(crate) mod layout;
pub(crate) mod render;
pub(crate) mod scene;
pub(crate) mod session;

pub use crate::foundation::core::{Affine, Canvas, Point, Rect, Rgba8Premul, Size, Vec2};
pub use crate::foundation::error::{ThumbError, ThumbResult};

pub use crate::assets::color::Color;
pub use crate::assets::fonts::{
    DirFontProvider, FontGate, FontProvider, FontStatus, ResolvedFont, font_request_id,
};
pub use crate::assets::image::{
    DecodeLoader, DecodedImage, ImageLoader, ImageRef, decode_image, decode_svg,
};
pub use crate::config::{EditorConfig, FontConfig, PreviewBounds};
pub use crate::export::sink::{DirectorySink, DownloadSink, InMemorySink, encode_png};
pub use crate::interact::controller::{
    Corner, GestureKind, HANDLE_RADIUS, HitTarget, ROTATE_HANDLE_OFFSET, TransformController,
    hit_test,
};
pub use crate::layout::geometry::{
    cover_rect, export_dimensions, percent_to_canvas, preview_box, preview_canvas, preview_scale,
    resolve_background, subject_footprint, subject_rect,
};
pub use crate::render::compositor::{
    Compositor, ExportOutcome, ExportedFile, PaintOp, RenderOutcome, RenderTarget, RenderedScene,
    export_file_name,
};
pub use crate::render::cpu::FrameRGBA;
pub use crate::scene::def::{BackgroundDef, LoadedSceneDef, SceneDef};
pub use crate::scene::model::{
    AspectRatio, BackgroundSpec, BorderEffect, BorderStyle, Layer, LayerId, LayerStack,
    ProcessingState, SceneModel, Selection, SubjectTransform, TextLayer, TextLayerPatch,
    create_text_layer, reset_subject_transform,
};
pub use crate::session::store::{AlphaPassthrough, BackgroundRemover, IngestTicket, SessionStore};
