/// Transcript sources and interval mapping
///
/// Transcripts are supplied from outside the heatmap pipeline. Providers look
/// them up per video and language, and a chain falls back across providers.

pub mod mapper;
pub mod srt;

pub use mapper::{joined_text, map_intervals, SignificantSections};
pub use srt::{parse_srt, SRTFormatter, SRTGenerator};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One timed line of subtitle text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TranscriptEntry {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Subtitle text
    pub text: String,
}

impl TranscriptEntry {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Caption shape produced by the transcript API (`start` + `duration`)
#[derive(Debug, Deserialize)]
struct TimedCaption {
    text: String,
    start: f64,
    duration: f64,
}

impl From<TimedCaption> for TranscriptEntry {
    fn from(caption: TimedCaption) -> Self {
        TranscriptEntry {
            start: caption.start,
            end: caption.start + caption.duration,
            text: SRTFormatter::clean_text(&caption.text),
        }
    }
}

/// Something that can look up a video's transcript
///
/// `Ok(None)` means this provider has nothing for the video; `Err` means the
/// lookup itself failed. Both let a [`ProviderChain`] move on.
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, video_id: &str) -> Result<Option<Vec<TranscriptEntry>>>;
}

/// Find `{dir}/{video_id}.{lang}.{ext}` for the first language that exists
fn find_language_file(dir: &Path, video_id: &str, languages: &[String], ext: &str) -> Option<(String, PathBuf)> {
    languages.iter().find_map(|lang| {
        let path = dir.join(format!("{}.{}.{}", video_id, lang, ext));
        path.exists().then(|| (lang.clone(), path))
    })
}

/// Reads SubRip files saved next to the videos
#[derive(Debug, Clone)]
pub struct SrtFileProvider {
    dir: PathBuf,
    languages: Vec<String>,
}

impl SrtFileProvider {
    pub fn new(dir: impl Into<PathBuf>, languages: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            languages,
        }
    }
}

#[async_trait]
impl TranscriptProvider for SrtFileProvider {
    fn name(&self) -> &str {
        "srt-file"
    }

    async fn fetch(&self, video_id: &str) -> Result<Option<Vec<TranscriptEntry>>> {
        let Some((lang, path)) = find_language_file(&self.dir, video_id, &self.languages, "srt") else {
            return Ok(None);
        };

        let content = tokio::fs::read_to_string(&path).await?;
        let entries = parse_srt(&content)?;
        info!("📝 Loaded {} '{}' subtitle entries from {}", entries.len(), lang, path.display());
        Ok(Some(entries))
    }
}

/// Reads transcript API dumps (`[{text, start, duration}]`)
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    dir: PathBuf,
    languages: Vec<String>,
}

impl JsonFileProvider {
    pub fn new(dir: impl Into<PathBuf>, languages: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            languages,
        }
    }
}

#[async_trait]
impl TranscriptProvider for JsonFileProvider {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn fetch(&self, video_id: &str) -> Result<Option<Vec<TranscriptEntry>>> {
        let Some((lang, path)) = find_language_file(&self.dir, video_id, &self.languages, "json") else {
            return Ok(None);
        };

        let content = tokio::fs::read_to_string(&path).await?;
        let captions: Vec<TimedCaption> = serde_json::from_str(&content)?;
        let entries: Vec<TranscriptEntry> = captions.into_iter().map(Into::into).collect();
        info!("📝 Loaded {} '{}' caption entries from {}", entries.len(), lang, path.display());
        Ok(Some(entries))
    }
}

/// Tries providers in order until one returns a transcript
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn TranscriptProvider>>,
}

impl ProviderChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: impl TranscriptProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// SRT first, then JSON, from the same directory
    pub fn from_dir(dir: impl Into<PathBuf>, languages: Vec<String>) -> Self {
        let dir = dir.into();
        Self::new()
            .with_provider(SrtFileProvider::new(dir.clone(), languages.clone()))
            .with_provider(JsonFileProvider::new(dir, languages))
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// `None` when every provider came up empty or failed
    pub async fn fetch(&self, video_id: &str) -> Option<Vec<TranscriptEntry>> {
        for provider in &self.providers {
            match provider.fetch(video_id).await {
                Ok(Some(entries)) => return Some(entries),
                Ok(None) => debug!("{} has no transcript for {}", provider.name(), video_id),
                Err(e) => warn!("⚠️ {} failed for {}: {}, trying next", provider.name(), video_id, e),
            }
        }
        warn!("No transcript available for {}", video_id);
        None
    }
}
