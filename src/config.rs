use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::heatmap::{SamplerConfig, DEFAULT_THRESHOLD};

/// Configuration for the heatmap clip generator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Heatmap sampling and analysis
    pub heatmap: HeatmapConfig,

    /// Where page markup comes from
    pub page: PageConfig,

    /// Transcript lookup
    pub transcript: TranscriptConfig,

    /// Clip cutting with ffmpeg
    pub clips: ClipConfig,

    /// Performance and resource settings
    pub performance: PerformanceConfig,

    /// Output and logging settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    /// Deviation from mean attention that marks a rise or fall
    pub threshold: f64,

    /// Nominal path coordinate width (maps to the full duration)
    pub view_width: f64,

    /// Nominal path coordinate height (maps to 0-100 attention)
    pub view_height: f64,
}

impl HeatmapConfig {
    pub fn sampler(&self) -> SamplerConfig {
        SamplerConfig {
            width: self.view_width,
            height: self.view_height,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Directory of saved pages (`{video_id}.html`)
    pub snapshot_dir: PathBuf,

    /// Fetch pages over HTTP instead of reading snapshots
    pub use_http: bool,

    /// Serve pages from this base URL instead of the public watch page
    pub http_base_url: Option<String>,

    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,

    /// User agent sent with HTTP requests
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    /// Look up transcripts at all
    pub enabled: bool,

    /// Directory holding `{video_id}.{lang}.srt` / `.json`
    pub dir: PathBuf,

    /// Preferred languages, first match wins
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    /// Cut clips (otherwise analysis only)
    pub enabled: bool,

    /// Directory holding downloaded source videos
    pub source_dir: PathBuf,

    /// Extensions tried when locating a source video
    pub source_extensions: Vec<String>,

    /// Output container extension
    pub container: String,

    /// Codec arguments placed between the time range and the output path
    pub encoder_args: Vec<String>,

    /// ffmpeg executable
    pub ffmpeg_path: String,

    /// ffprobe executable
    pub ffprobe_path: String,

    /// Write a `.srt` next to every clip
    pub write_subtitles: bool,

    /// Lower bound for clip length; single-sample rises have zero length
    pub min_clip_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Maximum number of videos processed concurrently
    pub max_workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Base output directory
    pub base_dir: PathBuf,

    /// Results manifest file name inside `base_dir`
    pub results_file: String,

    /// Log level
    pub log_level: String,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        let sampler = SamplerConfig::default();
        Self {
            threshold: DEFAULT_THRESHOLD,
            view_width: sampler.width,
            view_height: sampler.height,
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from("./pages"),
            use_http: false,
            http_base_url: None,
            request_timeout_seconds: 60,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("./transcripts"),
            languages: vec!["tr".to_string(), "en".to_string()],
        }
    }
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source_dir: PathBuf::from("./videos"),
            source_extensions: vec![
                "mp4".to_string(),
                "webm".to_string(),
                "mkv".to_string(),
            ],
            container: "webm".to_string(),
            encoder_args: [
                "-c:v", "libvpx-vp9",
                "-crf", "0",
                "-b:v", "0",
                "-c:a", "libopus",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            write_subtitles: true,
            min_clip_seconds: 1.0,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get().min(8), // Use available cores, max 8
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./output"),
            results_file: "heatclip_results.json".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            heatmap: HeatmapConfig::default(),
            page: PageConfig::default(),
            transcript: TranscriptConfig::default(),
            clips: ClipConfig::default(),
            performance: PerformanceConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        // Try to load from various locations
        let config_paths = [
            "heatclip.toml",
            "config/heatclip.toml",
            "/etc/heatclip/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        // Try environment variables
        if let Ok(config) = Self::from_env() {
            return Ok(config);
        }

        Err(anyhow!("No configuration file found"))
    }

    /// Load a specific configuration file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&config_str)?)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Override fields from `HEATCLIP_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(workers) = std::env::var("HEATCLIP_WORKERS") {
            if let Ok(workers) = workers.parse() {
                self.performance.max_workers = workers;
            }
        }

        if let Ok(threshold) = std::env::var("HEATCLIP_THRESHOLD") {
            if let Ok(threshold) = threshold.parse() {
                self.heatmap.threshold = threshold;
            }
        }

        if let Ok(output_dir) = std::env::var("HEATCLIP_OUTPUT_DIR") {
            self.output.base_dir = PathBuf::from(output_dir);
        }

        if let Ok(log_level) = std::env::var("HEATCLIP_LOG_LEVEL") {
            self.output.log_level = log_level;
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.performance.max_workers == 0 {
            return Err(anyhow!("max_workers must be greater than 0"));
        }

        if !(self.heatmap.threshold.is_finite() && self.heatmap.threshold >= 0.0) {
            return Err(anyhow!("threshold must be a non-negative number"));
        }

        if !(self.heatmap.view_width > 0.0 && self.heatmap.view_height > 0.0) {
            return Err(anyhow!("heatmap view dimensions must be positive"));
        }

        if self.transcript.enabled && self.transcript.languages.is_empty() {
            return Err(anyhow!("at least one transcript language is required"));
        }

        if self.clips.enabled && self.clips.source_extensions.is_empty() {
            return Err(anyhow!("at least one source video extension is required"));
        }

        if self.page.request_timeout_seconds == 0 {
            return Err(anyhow!("request_timeout_seconds must be greater than 0"));
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Heatclip Configuration:\n\
            - Workers: {}\n\
            - Threshold: {}\n\
            - View box: {}x{}\n\
            - Page source: {}\n\
            - Transcript languages: {}\n\
            - Clip cutting: {}\n\
            - Output Directory: {}",
            self.performance.max_workers,
            self.heatmap.threshold,
            self.heatmap.view_width,
            self.heatmap.view_height,
            if self.page.use_http {
                "http".to_string()
            } else {
                self.page.snapshot_dir.display().to_string()
            },
            self.transcript.languages.join(", "),
            self.clips.enabled,
            self.output.base_dir.display()
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Start from an already loaded configuration
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.performance.max_workers = workers;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.config.heatmap.threshold = threshold;
        self
    }

    pub fn with_snapshot_dir(mut self, dir: PathBuf) -> Self {
        self.config.page.snapshot_dir = dir;
        self
    }

    pub fn with_source_dir(mut self, dir: PathBuf) -> Self {
        self.config.clips.source_dir = dir;
        self
    }

    pub fn with_transcript_dir(mut self, dir: PathBuf) -> Self {
        self.config.transcript.dir = dir;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.base_dir = dir;
        self
    }

    pub fn use_http(mut self, enable: bool) -> Self {
        self.config.page.use_http = enable;
        self
    }

    pub fn enable_clips(mut self, enable: bool) -> Self {
        self.config.clips.enabled = enable;
        self
    }

    pub fn enable_transcripts(mut self, enable: bool) -> Self {
        self.config.transcript.enabled = enable;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.heatmap.threshold, 1.35);
        assert_eq!(config.heatmap.sampler(), SamplerConfig::default());
        assert_eq!(config.transcript.languages, vec!["tr", "en"]);
        assert!(config.clips.encoder_args.contains(&"libopus".to_string()));
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_workers(3)
            .with_threshold(2.5)
            .enable_clips(false)
            .build();

        assert_eq!(config.performance.max_workers, 3);
        assert_eq!(config.heatmap.threshold, 2.5);
        assert!(!config.clips.enabled);
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());
        assert!(ConfigBuilder::new().with_workers(0).build().validate().is_err());
        assert!(ConfigBuilder::new().with_threshold(-1.0).build().validate().is_err());

        let mut config = Config::default();
        config.heatmap.view_width = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [heatmap]
            threshold = 2.0

            [transcript]
            languages = ["en"]
            "#,
        )
        .unwrap();

        assert_eq!(config.heatmap.threshold, 2.0);
        assert_eq!(config.heatmap.view_width, 1000.0);
        assert_eq!(config.transcript.languages, vec!["en"]);
        assert_eq!(config.output.results_file, "heatclip_results.json");
    }

    #[test]
    fn test_toml_roundtrip_through_save() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("heatclip.toml");
        let config = ConfigBuilder::new().with_threshold(3.0).build();
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.heatmap.threshold, 3.0);
    }
}
