//! Error types for the transformation engine.
//!
//! Every failure is local to the call that produced it: a rejected operation
//! or image never leaves the edit pipeline holding a partially applied result.

use thiserror::Error;

/// Errors reported by the catalog, the filter engine and the edit pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// An operation parameter is outside its declared range.
    ///
    /// Raised at construction time; the caller can correct the value and retry.
    #[error("Invalid parameter `{field}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter (e.g. `"intensity"`).
        field: &'static str,
        /// The violated bound, in human readable form.
        reason: String,
    },

    /// The image is empty or its pixel buffer does not match its dimensions.
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// A crop rectangle does not intersect the image at all.
    #[error(
        "Crop rectangle ({x}, {y}, {width}x{height}) lies outside the \
         {image_width}x{image_height} image"
    )]
    OutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    /// The output buffer could not be allocated or exceeds the pixel budget.
    #[error("Resource exhausted: cannot allocate {bytes} bytes")]
    ResourceExhausted { bytes: u64 },

    /// An edit was requested before any source image was loaded.
    #[error("No source image loaded")]
    NoSource,
}

impl EngineError {
    /// Shorthand for building an [`EngineError::InvalidParameter`].
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }

    /// Whether the caller can fix the error by changing the operation's parameters.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidParameter { .. } | EngineError::OutOfBounds { .. }
        )
    }
}

/// Result type used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;
