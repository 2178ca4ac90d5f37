/// Heatmap extraction and analysis
///
/// Recovers the audience-retention curve from the player's stitched SVG overlay,
/// converts it into a time-domain signal and detects significant rise/fall intervals.

pub mod geometry;
pub mod stitcher;
pub mod path;
pub mod sampler;
pub mod analyzer;

// Re-export main types
pub use analyzer::{analyze, DEFAULT_THRESHOLD};
pub use geometry::{parse_dimension, PERCENT_SCALE};
pub use sampler::{sample, try_sample, SamplerConfig};
pub use stitcher::{extract_fragments, stitch, Fragment, FragmentGroup, UnifiedImage};

use serde::{Deserialize, Serialize};

/// One point of the attention signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Sample {
    /// Offset into the video in seconds
    pub time: f64,
    /// Relative retention, nominally 0-100 (not clamped)
    pub attention: f64,
}

impl Sample {
    pub fn new(time: f64, attention: f64) -> Self {
        Self { time, attention }
    }

    /// Both fields carry a usable number
    pub fn is_valid(&self) -> bool {
        self.time.is_finite() && self.attention.is_finite()
    }
}

/// Direction of a detected interval
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntervalKind {
    Rise,
    Fall,
}

/// Contiguous time range where attention deviates from the mean
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Interval {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds (inclusive)
    pub end: f64,
}

impl Interval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Inclusive on both ends
    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Output of the signal analyzer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    /// Mean attention over all samples, NaN when there were none
    pub average_attention: f64,
    /// Rise intervals in time order
    pub rises: Vec<Interval>,
    /// Fall intervals in time order
    pub falls: Vec<Interval>,
}

impl AnalysisResult {
    /// Neutral result for an empty or invalid signal
    pub fn empty() -> Self {
        Self {
            average_attention: f64::NAN,
            rises: Vec::new(),
            falls: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rises.is_empty() && self.falls.is_empty()
    }

    pub fn total_rises(&self) -> usize {
        self.rises.len()
    }

    pub fn total_falls(&self) -> usize {
        self.falls.len()
    }

    pub fn intervals(&self, kind: IntervalKind) -> &[Interval] {
        match kind {
            IntervalKind::Rise => &self.rises,
            IntervalKind::Fall => &self.falls,
        }
    }
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_rejects_extra_keys() {
        let ok: Sample = serde_json::from_str(r#"{"time": 1.0, "attention": 50.0}"#).unwrap();
        assert_eq!(ok, Sample::new(1.0, 50.0));

        assert!(serde_json::from_str::<Sample>(r#"{"time": 1.0, "attention": 50.0, "x": 1}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"time": 1.0}"#).is_err());
    }

    #[test]
    fn test_interval_rejects_extra_keys() {
        let ok: Interval = serde_json::from_str(r#"{"start": 3.0, "end": 4.0}"#).unwrap();
        assert_eq!(ok, Interval::new(3.0, 4.0));

        assert!(serde_json::from_str::<Interval>(r#"{"start": 3.0, "end": 4.0, "kind": "rise"}"#).is_err());
    }

    #[test]
    fn test_interval_contains_is_inclusive() {
        let interval = Interval::new(3.0, 5.0);
        assert!(interval.contains(3.0));
        assert!(interval.contains(5.0));
        assert!(!interval.contains(5.01));
        assert_eq!(interval.duration(), 2.0);
    }

    #[test]
    fn test_empty_result() {
        let result = AnalysisResult::empty();
        assert!(result.average_attention.is_nan());
        assert!(result.is_empty());
        assert_eq!(result.total_rises(), 0);
        assert_eq!(result.intervals(IntervalKind::Fall).len(), 0);
    }
}
