use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};

use crate::clips::{clip_requests, probe_duration, ClipCutter, ClipRecord, ClipRequest};
use crate::config::{Config, HeatmapConfig};
use crate::error::{HeatmapError, HeatmapResult, VideoStatus};
use crate::heatmap::{analyze, try_sample, AnalysisResult, UnifiedImage};
use crate::page::{self, HttpFetcher, PageFetcher, SnapshotFetcher};
use crate::transcript::{map_intervals, ProviderChain, SignificantSections, TranscriptEntry};

/// Everything derived from one page's markup
#[derive(Debug, Clone)]
pub struct MarkupAnalysis {
    pub sample_count: usize,
    pub analysis: AnalysisResult,
    pub sections: SignificantSections,
}

/// Stitch, sample, analyze and map one page
pub fn analyze_markup(
    markup: &str,
    duration_seconds: f64,
    transcript: Option<&[TranscriptEntry]>,
    config: &HeatmapConfig,
) -> HeatmapResult<MarkupAnalysis> {
    let image = UnifiedImage::from_markup(markup)?;
    analyze_image(&image, duration_seconds, transcript, config)
}

/// Sample, analyze and map an already stitched heatmap
///
/// A heatmap that yields no samples is reported as
/// [`HeatmapError::EmptyOrInvalidSamples`] so callers can tell it apart from a
/// quiet video.
pub fn analyze_image(
    image: &UnifiedImage,
    duration_seconds: f64,
    transcript: Option<&[TranscriptEntry]>,
    config: &HeatmapConfig,
) -> HeatmapResult<MarkupAnalysis> {
    let samples = try_sample(&image.to_svg(), duration_seconds, &config.sampler())?;
    if samples.is_empty() {
        return Err(HeatmapError::EmptyOrInvalidSamples);
    }

    let analysis = analyze(&samples, config.threshold);
    debug!(
        "📈 {} samples, average {:.2}, {} rises, {} falls",
        samples.len(),
        analysis.average_attention,
        analysis.total_rises(),
        analysis.total_falls()
    );

    let sections = map_intervals(transcript, &analysis);
    Ok(MarkupAnalysis {
        sample_count: samples.len(),
        analysis,
        sections,
    })
}

/// Processing result for a single video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoProcessingResult {
    pub video_id: String,
    pub status: VideoStatus,
    pub duration_seconds: Option<f64>,
    pub sample_count: usize,
    pub analysis: Option<AnalysisResult>,
    /// Number of transcript entries found, `None` when no transcript was available
    pub transcript_entries: Option<usize>,
    pub sections: SignificantSections,
    /// One request per rise, whether or not it was cut
    pub clip_requests: Vec<ClipRequest>,
    pub clips: Vec<ClipRecord>,
    pub processing_time: Duration,
    pub error_message: Option<String>,
}

impl VideoProcessingResult {
    fn new(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            status: VideoStatus::Failed,
            duration_seconds: None,
            sample_count: 0,
            analysis: None,
            transcript_entries: None,
            sections: SignificantSections::default(),
            clip_requests: Vec::new(),
            clips: Vec::new(),
            processing_time: Duration::from_secs(0),
            error_message: None,
        }
    }
}

/// Overall batch results, written as the results manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub succeeded: usize,
    pub no_heatmap: usize,
    pub timed_out: usize,
    pub malformed: usize,
    pub failed: usize,
    pub clips_cut: usize,
    pub total_time: Duration,
    pub results: Vec<VideoProcessingResult>,
}

impl ProcessingResult {
    fn from_results(results: Vec<VideoProcessingResult>, total_time: Duration) -> Self {
        let count = |status: VideoStatus| results.iter().filter(|r| r.status == status).count();

        Self {
            generated_at: Utc::now(),
            total: results.len(),
            succeeded: count(VideoStatus::Succeeded),
            no_heatmap: count(VideoStatus::NoHeatmap),
            timed_out: count(VideoStatus::TimedOut),
            malformed: count(VideoStatus::Malformed),
            failed: count(VideoStatus::Failed),
            clips_cut: results.iter().map(|r| r.clips.len()).sum(),
            total_time,
            results,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessingStats {
    pub max_workers: usize,
    pub available_permits: usize,
}

fn status_of(error: &anyhow::Error) -> VideoStatus {
    error
        .downcast_ref::<HeatmapError>()
        .map(VideoStatus::from_error)
        .unwrap_or(VideoStatus::Failed)
}

/// Per-video pipeline state shared by the worker tasks
#[derive(Clone)]
struct VideoPipeline {
    config: Arc<Config>,
    fetcher: Arc<dyn PageFetcher>,
    transcripts: ProviderChain,
    cutter: ClipCutter,
}

impl VideoPipeline {
    async fn process_video(&self, video_id: &str, output_dir: &Path) -> VideoProcessingResult {
        let start_time = Instant::now();
        let mut result = VideoProcessingResult::new(video_id);

        match self.run(video_id, output_dir, &mut result).await {
            Ok(()) => result.status = VideoStatus::Succeeded,
            Err(e) => {
                result.status = status_of(&e);
                result.error_message = Some(format!("{:#}", e));
            }
        }

        result.processing_time = start_time.elapsed();
        result
    }

    async fn run(&self, video_id: &str, output_dir: &Path, result: &mut VideoProcessingResult) -> Result<()> {
        let markup = self.fetcher.fetch(video_id).await?;
        let image = UnifiedImage::from_markup(&markup)?;

        let duration = self.resolve_duration(video_id, &markup).await?;
        result.duration_seconds = Some(duration);

        let transcript = if self.config.transcript.enabled {
            self.transcripts.fetch(video_id).await
        } else {
            None
        };
        result.transcript_entries = transcript.as_ref().map(Vec::len);

        let analyzed = analyze_image(&image, duration, transcript.as_deref(), &self.config.heatmap)?;
        let requests = clip_requests(video_id, &analyzed.analysis, &analyzed.sections);
        result.sample_count = analyzed.sample_count;
        result.analysis = Some(analyzed.analysis);
        result.sections = analyzed.sections;
        result.clip_requests = requests;

        if !self.config.clips.enabled || result.clip_requests.is_empty() {
            return Ok(());
        }

        let Some(source) = self.cutter.find_source(video_id) else {
            warn!(
                "⚠️ No source video for {} in {}, skipping {} clips",
                video_id,
                self.config.clips.source_dir.display(),
                result.clip_requests.len()
            );
            return Ok(());
        };

        let clip_dir = output_dir.join(video_id);
        let mut failures = Vec::new();
        for request in &result.clip_requests {
            match self.cutter.cut(&source, request, &clip_dir).await {
                Ok(record) => result.clips.push(record),
                Err(e) => {
                    warn!("❌ {}", e);
                    failures.push(request.file_stem());
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(anyhow!(
                "{} of {} clips failed: {}",
                failures.len(),
                result.clip_requests.len(),
                failures.join(", ")
            ))
        }
    }

    /// Page metadata first, then the source video
    async fn resolve_duration(&self, video_id: &str, markup: &str) -> Result<f64> {
        if let Some(duration) = page::extract_duration(markup) {
            return Ok(duration);
        }

        let source = self
            .cutter
            .find_source(video_id)
            .ok_or_else(|| anyhow!("duration unknown for {}: page has none and no source video found", video_id))?;
        debug!("⏱️ Probing duration of {}", source.display());
        probe_duration(&self.config.clips.ffprobe_path, &source).await
    }
}

/// Batch processor running videos concurrently under a worker limit
pub struct BatchProcessor {
    pipeline: VideoPipeline,
    worker_semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl BatchProcessor {
    pub fn new(config: Config, max_workers: usize) -> Self {
        let fetcher: Arc<dyn PageFetcher> = if config.page.use_http {
            let mut http = HttpFetcher::new(config.page.request_timeout_seconds, &config.page.user_agent);
            if let Some(base_url) = &config.page.http_base_url {
                http = http.with_base_url(base_url.clone());
            }
            Arc::new(http)
        } else {
            Arc::new(SnapshotFetcher::new(config.page.snapshot_dir.clone()))
        };

        Self::with_fetcher(config, max_workers, fetcher)
    }

    /// Use a custom page source instead of the configured one
    pub fn with_fetcher(config: Config, max_workers: usize, fetcher: Arc<dyn PageFetcher>) -> Self {
        let max_workers = max_workers.max(1);
        info!("🔧 Initializing BatchProcessor with {} workers", max_workers);

        let transcripts = ProviderChain::from_dir(config.transcript.dir.clone(), config.transcript.languages.clone());
        let cutter = ClipCutter::new(config.clips.clone());

        Self {
            pipeline: VideoPipeline {
                config: Arc::new(config),
                fetcher,
                transcripts,
                cutter,
            },
            worker_semaphore: Arc::new(Semaphore::new(max_workers)),
            max_concurrent: max_workers,
        }
    }

    /// Replace the transcript providers built from the config
    pub fn with_transcripts(mut self, transcripts: ProviderChain) -> Self {
        self.pipeline.transcripts = transcripts;
        self
    }

    fn output_dir(&self) -> PathBuf {
        self.pipeline.config.output.base_dir.clone()
    }

    /// Process every video and write the results manifest
    pub async fn process_videos(&self, video_ids: Vec<String>) -> Result<ProcessingResult> {
        let start_time = Instant::now();
        let output_dir = self.output_dir();

        info!("🚀 Starting heatmap processing...");
        info!("📂 Output: {}", output_dir.display());
        tokio::fs::create_dir_all(&output_dir).await?;

        if video_ids.is_empty() {
            warn!("No videos to process");
        } else {
            info!("📹 {} videos to process", video_ids.len());
        }

        let results = self.process_videos_parallel(video_ids, &output_dir).await;
        let processing_result = ProcessingResult::from_results(results, start_time.elapsed());

        let results_path = output_dir.join(&self.pipeline.config.output.results_file);
        let json_data = serde_json::to_string_pretty(&processing_result)?;
        tokio::fs::write(&results_path, json_data).await?;
        info!("💾 Results saved to: {}", results_path.display());

        Ok(processing_result)
    }

    /// Results come back in input order regardless of completion order
    async fn process_videos_parallel(&self, video_ids: Vec<String>, output_dir: &Path) -> Vec<VideoProcessingResult> {
        let (tx, mut rx) = mpsc::channel(self.max_concurrent);
        let total_videos = video_ids.len();
        let mut handles = Vec::with_capacity(total_videos);

        for (index, video_id) in video_ids.into_iter().enumerate() {
            let pipeline = self.pipeline.clone();
            let output_dir = output_dir.to_path_buf();
            let tx = tx.clone();
            let semaphore = Arc::clone(&self.worker_semaphore);
            let task_video_id = video_id.clone();

            let handle = tokio::spawn(async move {
                let video_id = task_video_id;
                let Ok(_permit) = semaphore.acquire().await else {
                    error!("Worker pool closed before {} could start", video_id);
                    return;
                };

                info!("📹 Processing video {}/{}: {}", index + 1, total_videos, video_id);
                let result = pipeline.process_video(&video_id, &output_dir).await;

                if let Err(e) = tx.send((index, result)).await {
                    error!("Failed to send result: {}", e);
                }
            });
            handles.push((index, video_id, handle));
        }

        drop(tx);

        let mut results = Vec::with_capacity(total_videos);
        while let Some((index, result)) = rx.recv().await {
            match result.status {
                VideoStatus::Succeeded => info!(
                    "✅ {}: {} rises, {} clips in {:.2}s",
                    result.video_id,
                    result.clip_requests.len(),
                    result.clips.len(),
                    result.processing_time.as_secs_f64()
                ),
                status => warn!(
                    "❌ {} ({:?}): {}",
                    result.video_id,
                    status,
                    result.error_message.as_deref().unwrap_or("Unknown error")
                ),
            }
            results.push((index, result));
        }

        // The channel only closes once every task is done, so these joins do not block
        for (index, video_id, handle) in handles {
            if results.iter().any(|(i, _)| *i == index) {
                continue;
            }
            let message = match handle.await {
                Err(e) if e.is_panic() => "worker task panicked".to_string(),
                Err(e) => format!("worker task failed: {}", e),
                Ok(()) => "worker task ended without a result".to_string(),
            };
            error!("❌ {}: {}", video_id, message);

            let mut result = VideoProcessingResult::new(&video_id);
            result.error_message = Some(message);
            results.push((index, result));
        }

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }

    pub fn get_stats(&self) -> ProcessingStats {
        ProcessingStats {
            max_workers: self.max_concurrent,
            available_permits: self.worker_semaphore.available_permits(),
        }
    }
}
