/// Convenience result type used across posebatch.
pub type PoseBatchResult<T> = Result<T, PoseBatchError>;

/// Top-level error taxonomy used by crate APIs.
///
/// Registration fallbacks (too few correspondences, estimator failure) are not errors and never
/// surface here; see [`crate::Alignment`].
#[derive(thiserror::Error, Debug)]
pub enum PoseBatchError {
    /// Invalid configuration, joint names or dataset index contents.
    #[error("validation error: {0}")]
    Validation(String),

    /// Batch arrays whose shapes do not line up.
    #[error("shape mismatch: {0}")]
    Shape(String),

    /// Rasterizer could not produce a layer.
    #[error("render error: {0}")]
    Render(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PoseBatchError {
    /// Build a [`PoseBatchError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`PoseBatchError::Shape`] value.
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    /// Build a [`PoseBatchError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`PoseBatchError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
