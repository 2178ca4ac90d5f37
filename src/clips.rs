use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::ClipConfig;
use crate::heatmap::AnalysisResult;
use crate::transcript::{joined_text, SRTGenerator, SignificantSections, TranscriptEntry};

/// A clip to cut: one rise interval and the subtitles spoken during it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClipRequest {
    pub video_id: String,
    /// Start offset in seconds
    pub start: f64,
    /// End offset in seconds
    pub end: f64,
    /// Joined subtitle text for the interval
    pub transcript_text: String,
    /// Entries behind `transcript_text`, kept for the subtitle file
    #[serde(default)]
    pub entries: Vec<TranscriptEntry>,
}

impl ClipRequest {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// `{video_id}_{start}_{end}` with times in milliseconds
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}_{}",
            self.video_id,
            (self.start * 1000.0).round() as u64,
            (self.end * 1000.0).round() as u64
        )
    }
}

/// A clip written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipRecord {
    pub video_id: String,
    pub start: f64,
    pub end: f64,
    pub transcript_text: String,
    pub output_path: PathBuf,
    pub subtitle_path: Option<PathBuf>,
}

/// One clip request per rise interval, paired with its transcript group
pub fn clip_requests(video_id: &str, analysis: &AnalysisResult, sections: &SignificantSections) -> Vec<ClipRequest> {
    analysis
        .rises
        .iter()
        .enumerate()
        .map(|(i, rise)| {
            let entries = sections.rises.get(i).cloned().unwrap_or_default();
            ClipRequest {
                video_id: video_id.to_string(),
                start: rise.start,
                end: rise.end,
                transcript_text: joined_text(&entries),
                entries,
            }
        })
        .collect()
}

/// Cuts clips from a downloaded source video with ffmpeg
#[derive(Debug, Clone)]
pub struct ClipCutter {
    config: ClipConfig,
}

impl ClipCutter {
    pub fn new(config: ClipConfig) -> Self {
        Self { config }
    }

    /// Locate `{source_dir}/{video_id}.{ext}` for the first supported extension
    pub fn find_source(&self, video_id: &str) -> Option<PathBuf> {
        self.config
            .source_extensions
            .iter()
            .map(|ext| self.config.source_dir.join(format!("{}.{}", video_id, ext)))
            .find(|path| path.exists())
    }

    /// Arguments passed to ffmpeg for one clip
    pub fn ffmpeg_args(&self, input: &Path, request: &ClipRequest, output: &Path) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-ss".to_string(),
            format!("{:.3}", request.start),
            "-t".to_string(),
            format!("{:.3}", request.duration().max(self.config.min_clip_seconds)),
        ];
        args.extend(self.config.encoder_args.iter().cloned());
        args.push(output.to_string_lossy().to_string());
        args
    }

    /// Cut one clip and write its subtitle file next to it
    pub async fn cut(&self, input: &Path, request: &ClipRequest, output_dir: &Path) -> Result<ClipRecord> {
        tokio::fs::create_dir_all(output_dir).await?;

        let output_path = output_dir.join(format!("{}.{}", request.file_stem(), self.config.container));
        let args = self.ffmpeg_args(input, request, &output_path);
        debug!("ffmpeg {}", args.join(" "));

        let output = tokio::process::Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .output()
            .await
            .with_context(|| format!("failed to launch {}", self.config.ffmpeg_path))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr.lines().rev().take(3).collect::<Vec<_>>().join(" | ");
            return Err(anyhow!("Clip cut failed for {}: {}", request.file_stem(), tail));
        }

        let subtitle_path = if self.config.write_subtitles {
            let srt_path = output_path.with_extension("srt");
            SRTGenerator::rebased(&request.entries, request.start)
                .save_to_file(&srt_path)
                .await?;
            Some(srt_path)
        } else {
            None
        };

        info!("✂️ Cut clip {:.1}s-{:.1}s: {}", request.start, request.end, output_path.display());

        Ok(ClipRecord {
            video_id: request.video_id.clone(),
            start: request.start,
            end: request.end,
            transcript_text: request.transcript_text.clone(),
            output_path,
            subtitle_path,
        })
    }
}

/// Read a media file's duration in seconds with ffprobe
pub async fn probe_duration(ffprobe_path: &str, video_path: &Path) -> Result<f64> {
    let output = tokio::process::Command::new(ffprobe_path)
        .arg("-v")
        .arg("quiet")
        .arg("-print_format")
        .arg("json")
        .arg("-show_format")
        .arg(video_path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(anyhow!("ffprobe failed for {}", video_path.display()));
    }

    parse_probe_duration(&String::from_utf8(output.stdout)?)
}

fn parse_probe_duration(json_str: &str) -> Result<f64> {
    let ffprobe_data: serde_json::Value = serde_json::from_str(json_str)?;
    ffprobe_data["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| anyhow!("ffprobe output has no usable duration"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heatmap::Interval;
    use tempfile::TempDir;

    fn request() -> ClipRequest {
        ClipRequest {
            video_id: "abc".to_string(),
            start: 12.5,
            end: 20.0,
            transcript_text: "hello".to_string(),
            entries: vec![TranscriptEntry::new(13.0, 14.0, "hello")],
        }
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(request().file_stem(), "abc_12500_20000");
    }

    #[test]
    fn test_ffmpeg_args() {
        let cutter = ClipCutter::new(ClipConfig::default());
        let args = cutter.ffmpeg_args(Path::new("in.mp4"), &request(), Path::new("out.webm"));

        let ss = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[ss + 1], "12.500");
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "7.500");
        assert!(args.windows(2).any(|w| w[0] == "-c:v" && w[1] == "libvpx-vp9"));
        assert_eq!(args.last().unwrap(), "out.webm");
    }

    #[test]
    fn test_zero_length_rise_gets_minimum_duration() {
        let cutter = ClipCutter::new(ClipConfig::default());
        let mut req = request();
        req.end = req.start;
        let args = cutter.ffmpeg_args(Path::new("in.mp4"), &req, Path::new("out.webm"));
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], format!("{:.3}", ClipConfig::default().min_clip_seconds));
    }

    #[test]
    fn test_clip_requests_pair_rises_with_sections() {
        let analysis = AnalysisResult {
            average_attention: 40.0,
            rises: vec![Interval::new(1.0, 2.0), Interval::new(5.0, 6.0)],
            falls: vec![Interval::new(3.0, 4.0)],
        };
        let sections = SignificantSections {
            rises: vec![vec![TranscriptEntry::new(1.5, 2.5, "a")], vec![]],
            falls: vec![vec![]],
        };

        let requests = clip_requests("vid", &analysis, &sections);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].transcript_text, "a");
        assert_eq!(requests[1].transcript_text, "");
        assert_eq!(requests[1].start, 5.0);

        // no transcript at all still yields one clip per rise
        let requests = clip_requests("vid", &analysis, &SignificantSections::default());
        assert_eq!(requests.len(), 2);
    }

    #[test]
    fn test_find_source() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("abc.webm"), b"x").unwrap();

        let cutter = ClipCutter::new(ClipConfig {
            source_dir: dir.path().to_path_buf(),
            ..ClipConfig::default()
        });
        assert_eq!(cutter.find_source("abc"), Some(dir.path().join("abc.webm")));
        assert_eq!(cutter.find_source("zzz"), None);
    }

    #[test]
    fn test_parse_probe_duration() {
        assert_eq!(parse_probe_duration(r#"{"format": {"duration": "212.480000"}}"#).unwrap(), 212.48);
        assert!(parse_probe_duration(r#"{"format": {}}"#).is_err());
        assert!(parse_probe_duration("nope").is_err());
    }
}
