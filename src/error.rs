/// Error types for heatmap extraction and analysis
use serde::{Deserialize, Serialize};

/// Result type for heatmap operations
pub type HeatmapResult<T> = std::result::Result<T, HeatmapError>;

/// Error kinds raised while turning page markup into an attention signal
#[derive(thiserror::Error, Debug)]
pub enum HeatmapError {
    #[error("Unrecognized dimension unit: {value:?}")]
    UnrecognizedUnit { value: String },

    #[error("Heatmap not found: {0}")]
    HeatmapNotFound(String),

    #[error("Page never became ready: {0}")]
    PreconditionTimeout(String),

    #[error("Malformed heatmap geometry: {0}")]
    MalformedGeometry(String),

    #[error("Empty or invalid sample sequence")]
    EmptyOrInvalidSamples,

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HeatmapError {
    pub fn unrecognized_unit(value: impl Into<String>) -> Self {
        Self::UnrecognizedUnit {
            value: value.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedGeometry(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::HeatmapNotFound(msg.into())
    }
}

/// Per-video outcome reported to operators
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Heatmap analyzed (and clips cut, when enabled)
    Succeeded,
    /// The video exposes no usable heatmap
    NoHeatmap,
    /// The page never reached its ready state
    TimedOut,
    /// A heatmap was present but could not be interpreted
    Malformed,
    /// Anything else, e.g. encoder or filesystem failures
    Failed,
}

impl VideoStatus {
    /// Classify an error into the status an operator sees
    pub fn from_error(error: &HeatmapError) -> Self {
        match error {
            HeatmapError::HeatmapNotFound(_) | HeatmapError::EmptyOrInvalidSamples => Self::NoHeatmap,
            HeatmapError::PreconditionTimeout(_) => Self::TimedOut,
            HeatmapError::MalformedGeometry(_) | HeatmapError::UnrecognizedUnit { .. } => Self::Malformed,
            HeatmapError::Fetch(_) | HeatmapError::Io(_) => Self::Failed,
        }
    }
}

/// Truncate raw markup for log output
pub(crate) fn excerpt(raw: &str, max_chars: usize) -> String {
    if raw.chars().count() <= max_chars {
        return raw.to_string();
    }
    let mut out: String = raw.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            VideoStatus::from_error(&HeatmapError::not_found("no chapters")),
            VideoStatus::NoHeatmap
        );
        assert_eq!(
            VideoStatus::from_error(&HeatmapError::PreconditionTimeout("networkidle".into())),
            VideoStatus::TimedOut
        );
        assert_eq!(
            VideoStatus::from_error(&HeatmapError::unrecognized_unit("10em")),
            VideoStatus::Malformed
        );
        assert_eq!(
            VideoStatus::from_error(&HeatmapError::Fetch("502".into())),
            VideoStatus::Failed
        );
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("abcdefghij", 4), "abcd…");
    }

    #[test]
    fn test_error_display_carries_raw_value() {
        let err = HeatmapError::unrecognized_unit("12vh");
        assert!(err.to_string().contains("12vh"));
    }
}
