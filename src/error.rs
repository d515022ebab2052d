//! Error types for asset resolution.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = AssetError> = std::result::Result<T, E>;

/// Failures surfaced while resolving or loading image assets.
///
/// Malformed colors are not represented here: color resolution degrades to
/// an empty [`ParsedColor`](crate::ParsedColor) instead of failing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// An indexed image was requested but no image set is loaded.
    #[error("no images loaded, you may need to define 'shape.type' = 'images'")]
    NotMultiple,

    /// The image definition has an empty `src`.
    #[error("image definition has no src")]
    EmptySource,

    /// The fetch completed with a non-success status.
    #[error("fetching {src} failed with status code {status}")]
    Status { src: String, status: u16 },

    /// The fetch could not be performed at all.
    #[error("fetching {src} failed: {reason}")]
    Fetch { src: String, reason: String },

    /// The fetched bytes could not be decoded.
    #[error("decoding {src} failed: {reason}")]
    Decode { src: String, reason: String },

    /// The load did not finish before the configured deadline.
    #[error("loading {src} timed out after {after_ms} ms")]
    Timeout { src: String, after_ms: u64 },

    /// The load was aborted through a [`Canceller`](crate::Canceller).
    #[error("loading {src} was cancelled")]
    Cancelled { src: String },

    /// A recolored SVG could not be rasterized.
    #[error("rendering svg failed: {0}")]
    Svg(String),
}

impl AssetError {
    /// Returns true for errors that retrying the same definition cannot fix.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::NotMultiple | Self::EmptySource | Self::Decode { .. } | Self::Svg(_)
        )
    }
}
