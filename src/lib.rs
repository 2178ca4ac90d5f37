/// Heatclip - heatmap-driven clip extraction
///
/// Reads the "most replayed" heatmap a video page renders, finds the stretches
/// where attention rises well above or falls well below its mean, and pairs
/// them with the transcript lines spoken there. Rises become clips.

pub mod clips;
pub mod config;
pub mod error;
pub mod heatmap;
pub mod page;
pub mod processing;
pub mod transcript;

// Re-export main types for easy access
pub use crate::clips::{clip_requests, ClipCutter, ClipRecord, ClipRequest};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{HeatmapError, HeatmapResult, VideoStatus};
pub use crate::heatmap::{
    analyze, parse_dimension, sample, stitch, AnalysisResult, Interval, IntervalKind, Sample, SamplerConfig,
    UnifiedImage, DEFAULT_THRESHOLD,
};
pub use crate::page::{parse_video_id, HttpFetcher, PageFetcher, SnapshotFetcher};
pub use crate::processing::{analyze_markup, BatchProcessor, ProcessingResult, VideoProcessingResult};
pub use crate::transcript::{map_intervals, ProviderChain, SignificantSections, TranscriptEntry, TranscriptProvider};
