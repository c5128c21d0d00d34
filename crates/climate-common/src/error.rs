//! Error types for climate-globe services.

use thiserror::Error;

/// Result type alias using OverlayError.
pub type OverlayResult<T> = Result<T, OverlayError>;

/// Primary error type for visualization operations.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// The sample set is empty; nothing can be rendered or indexed.
    #[error("no samples available to render")]
    InsufficientData,

    /// Raster dimensions must be positive.
    #[error("invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    /// Land boundary data could not be loaded. Callers recover by
    /// rendering with an all-land mask rather than failing the pipeline.
    #[error("boundary data unavailable: {0}")]
    BoundaryDataUnavailable(String),

    /// The sample source could not be reached or returned bad data.
    #[error("sample fetch failed: {0}")]
    FetchFailed(String),

    /// The sample source did not respond in time.
    #[error("sample fetch timed out")]
    Timeout,

    /// An install raced a newer request and was dropped. Never surfaced
    /// to the user; the newer layer stays displayed.
    #[error("stale result discarded: generation {stale} superseded by {current}")]
    StaleResultDiscarded { stale: u64, current: u64 },

    /// Invalid visualization configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Rendering failed for a reason other than the ones above.
    #[error("rendering failed: {0}")]
    RenderFailed(String),
}

impl OverlayError {
    /// Whether the error leaves the currently displayed layer usable.
    ///
    /// Every error except an internal stale-discard is reported to the
    /// caller as a failed visualization attempt; none of them clear a
    /// working display.
    pub fn is_silent(&self) -> bool {
        matches!(self, OverlayError::StaleResultDiscarded { .. })
    }
}

impl From<serde_json::Error> for OverlayError {
    fn from(err: serde_json::Error) -> Self {
        OverlayError::FetchFailed(format!("JSON error: {}", err))
    }
}
