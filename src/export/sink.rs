//! Export delivery.
//!
//! A [`DownloadSink`] receives each finished export exactly once, as a file name and PNG bytes.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::error::{ThumbError, ThumbResult};
use crate::foundation::math::unpremultiply_rgba8_in_place;
use crate::render::cpu::FrameRGBA;

/// Destination for finished exports.
pub trait DownloadSink {
    /// Deliver one file.
    fn deliver(&mut self, file_name: &str, bytes: &[u8]) -> ThumbResult<()>;
}

/// Writes exports into a directory, creating it on first use.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    /// Sink writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&mut self, file_name: &str, bytes: &[u8]) -> ThumbResult<()> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) {
            return Err(ThumbError::validation(format!(
                "export file name '{file_name}' must be a plain file name"
            )));
        }
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create output dir '{}'", self.dir.display()))?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, bytes).with_context(|| format!("write '{}'", path.display()))?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "export written");
        self.written.push(path);
        Ok(())
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    files: Vec<(String, Vec<u8>)>,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivered files in order.
    pub fn files(&self) -> &[(String, Vec<u8>)] {
        &self.files
    }
}

impl DownloadSink for InMemorySink {
    fn deliver(&mut self, file_name: &str, bytes: &[u8]) -> ThumbResult<()> {
        self.files.push((file_name.to_owned(), bytes.to_vec()));
        Ok(())
    }
}

/// Encode a frame as straight-alpha RGBA PNG.
pub fn encode_png(frame: &FrameRGBA) -> ThumbResult<Vec<u8>> {
    let mut data = frame.data.clone();
    if frame.premultiplied {
        unpremultiply_rgba8_in_place(&mut data);
    }
    let img = image::RgbaImage::from_raw(frame.width, frame.height, data)
        .ok_or_else(|| ThumbError::render("frame buffer does not match its dimensions"))?;
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(buf)
}

#[cfg(test)]
#[path = "../../tests/unit/export/sink.rs"]
mod tests;
