/// Crate-wide result alias.
pub type ThumbResult<T> = Result<T, ThumbError>;

/// Errors surfaced by the composition and export engine.
///
/// Collaborator failures (background removal, image decode, font load) are usually absorbed by
/// the stage that owns them and never reach callers as a `ThumbError`.
#[derive(thiserror::Error, Debug)]
pub enum ThumbError {
    /// Input or configuration rejected before any work happened.
    #[error("validation error: {0}")]
    Validation(String),

    /// Image or font bytes could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Rasterization failed.
    #[error("render error: {0}")]
    Render(String),

    /// Filesystem access failed.
    #[error("io error: {0}")]
    Io(String),

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Any other error with its source chain preserved.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ThumbError {
    /// Build a [`ThumbError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ThumbError::Decode`].
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`ThumbError::Render`].
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`ThumbError::Io`].
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Build a [`ThumbError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
