use anyhow::Result;
use regex::Regex;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use super::TranscriptEntry;

/// SRT file generator and formatter
#[derive(Debug, Clone)]
pub struct SRTGenerator {
    entries: Vec<TranscriptEntry>,
}

impl SRTGenerator {
    /// Build a generator whose timestamps are relative to `origin` seconds
    ///
    /// Used for clip subtitles: an entry at 125s in a clip starting at 120s is written at 5s.
    pub fn rebased(entries: &[TranscriptEntry], origin: f64) -> Self {
        let entries = entries
            .iter()
            .map(|e| TranscriptEntry {
                start: (e.start - origin).max(0.0),
                end: (e.end - origin).max(0.0),
                text: e.text.clone(),
            })
            .collect();
        Self { entries }
    }

    /// Generate SRT content as string
    pub fn generate(&self) -> String {
        let mut srt_content = String::new();

        for (i, entry) in self.entries.iter().enumerate() {
            srt_content.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                i + 1,
                format_seconds(entry.start),
                format_seconds(entry.end),
                entry.text
            ));
        }

        srt_content
    }

    /// Save SRT to file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.generate();
        tokio::fs::write(path.as_ref(), content).await?;
        Ok(())
    }

    /// Get number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// SRT formatting utilities
pub struct SRTFormatter;

impl SRTFormatter {
    /// Parse a single SRT timestamp into seconds
    pub fn parse_timestamp(timestamp: &str) -> Result<f64> {
        parse_single_timestamp(timestamp.trim()).map(|d| d.as_secs_f64())
    }

    /// Clean text for SRT display
    pub fn clean_text(text: &str) -> String {
        text.trim()
            .replace('\n', " ")
            .replace('\r', " ")
            .replace('\t', " ")
            // Replace multiple spaces with single space
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Parse SubRip content into transcript entries
///
/// Blocks that do not carry a valid timing line are skipped and logged.
pub fn parse_srt(content: &str) -> Result<Vec<TranscriptEntry>> {
    let timing = Regex::new(r"^\s*(\d{2}:\d{2}:\d{2},\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2},\d{3})")?;
    let normalized = content.replace("\r\n", "\n");

    let mut entries = Vec::new();
    for block in normalized.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        let mut lines = block.lines();

        // Index line is optional in the wild
        let mut line = lines.next().unwrap_or("");
        if line.trim().chars().all(|c| c.is_ascii_digit()) {
            line = lines.next().unwrap_or("");
        }

        let Some(captures) = timing.captures(line) else {
            warn!("Skipping SRT block without timing line: {:?}", line);
            continue;
        };

        let start = SRTFormatter::parse_timestamp(&captures[1])?;
        let end = SRTFormatter::parse_timestamp(&captures[2])?;
        let text = SRTFormatter::clean_text(&lines.collect::<Vec<_>>().join("\n"));

        entries.push(TranscriptEntry { start, end, text });
    }

    debug!("Parsed {} SRT entries", entries.len());
    Ok(entries)
}

/// Format seconds as SRT timestamp (HH:MM:SS,mmm)
fn format_seconds(seconds: f64) -> String {
    let duration = Duration::from_secs_f64(if seconds.is_finite() { seconds.max(0.0) } else { 0.0 });
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let milliseconds = duration.subsec_millis();

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, milliseconds)
}

/// Parse a single timestamp (HH:MM:SS,mmm)
fn parse_single_timestamp(timestamp: &str) -> Result<Duration> {
    let time_parts: Vec<&str> = timestamp.split(',').collect();
    if time_parts.len() != 2 {
        return Err(anyhow::anyhow!("Invalid timestamp format: {}", timestamp));
    }

    let hms_parts: Vec<&str> = time_parts[0].split(':').collect();
    if hms_parts.len() != 3 {
        return Err(anyhow::anyhow!("Invalid time format: {}", timestamp));
    }

    let hours: u64 = hms_parts[0].parse()?;
    let minutes: u64 = hms_parts[1].parse()?;
    let seconds: u64 = hms_parts[2].parse()?;
    let milliseconds: u64 = time_parts[1].parse()?;

    let total_seconds = hours * 3600 + minutes * 60 + seconds;
    let total_millis = total_seconds * 1000 + milliseconds;

    Ok(Duration::from_millis(total_millis))
}
