/// Page markup sources for heatmap extraction
///
/// Rendering the player and waiting for the heatmap to settle happens outside
/// this crate. Fetchers only hand over the resulting markup, or say why they
/// could not.
use crate::error::{HeatmapError, HeatmapResult};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const WATCH_URL: &str = "https://www.youtube.com/watch";

/// Build the watch page URL for a video ID
pub fn watch_url(video_id: &str) -> String {
    format!("{}?v={}", WATCH_URL, urlencoding::encode(video_id))
}

fn is_video_id(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Extract the video ID from a bare ID or a watch/short/embed URL
pub fn parse_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    let Ok(url) = Url::parse(input) else {
        return is_video_id(input).then(|| input.to_string());
    };

    let host = url.host_str().unwrap_or("");
    let mut segments = url.path_segments().into_iter().flatten().filter(|s| !s.is_empty());

    let id = if host.ends_with("youtu.be") {
        segments.next().map(str::to_string)
    } else if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "v") {
        Some(v.into_owned())
    } else {
        match segments.next() {
            Some("shorts") | Some("embed") | Some("live") => segments.next().map(str::to_string),
            _ => None,
        }
    };

    id.filter(|id| is_video_id(id))
}

/// `H:MM:SS` / `MM:SS` / `SS` as shown by the player
///
/// Only the leading field may exceed 59.
fn parse_clock(text: &str) -> Option<f64> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    parts.iter().enumerate().try_fold(0.0, |acc, (i, part)| {
        let value: u32 = part.trim().parse().ok()?;
        if i > 0 && value >= 60 {
            return None;
        }
        Some(acc * 60.0 + value as f64)
    })
}

/// ISO-8601 durations of the form `PT1H2M3S` used in page metadata
fn parse_iso_duration(text: &str) -> Option<f64> {
    let rest = text.trim().strip_prefix("PT")?;
    let mut total = 0.0;
    let mut number = String::new();
    for c in rest.chars() {
        match c {
            '0'..='9' | '.' => number.push(c),
            'H' | 'M' | 'S' => {
                let value: f64 = number.parse().ok()?;
                number.clear();
                total += value
                    * match c {
                        'H' => 3600.0,
                        'M' => 60.0,
                        _ => 1.0,
                    };
            }
            _ => return None,
        }
    }
    number.is_empty().then_some(total)
}

/// Video duration in seconds as advertised by the page, if present
pub fn extract_duration(markup: &str) -> Option<f64> {
    let document = Html::parse_document(markup);

    let from_meta = Selector::parse(r#"meta[itemprop="duration"]"#)
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .filter_map(|el| el.value().attr("content"))
                .find_map(parse_iso_duration)
        });

    let from_player = || {
        Selector::parse("span.ytp-time-duration").ok().and_then(|sel| {
            document
                .select(&sel)
                .find_map(|el| parse_clock(&el.text().collect::<String>()))
        })
    };

    from_meta.or_else(from_player).filter(|d| *d > 0.0)
}

/// Supplies the page markup that holds a video's heatmap
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, video_id: &str) -> HeatmapResult<String>;
}

/// Reads pages previously saved by a browser session as `{dir}/{video_id}.html`
#[derive(Debug, Clone)]
pub struct SnapshotFetcher {
    dir: PathBuf,
}

impl SnapshotFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn snapshot_path(&self, video_id: &str) -> PathBuf {
        self.dir.join(format!("{}.html", video_id))
    }

    /// Video IDs of every snapshot in the directory
    pub fn discover(&self) -> Vec<String> {
        let mut ids: Vec<String> = walkdir::WalkDir::new(&self.dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.path().extension().map_or(false, |ext| ext == "html"))
            .filter_map(|entry| entry.path().file_stem().map(|s| s.to_string_lossy().to_string()))
            .collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl PageFetcher for SnapshotFetcher {
    async fn fetch(&self, video_id: &str) -> HeatmapResult<String> {
        let path = self.snapshot_path(video_id);
        if !path.exists() {
            return Err(HeatmapError::not_found(format!("no page snapshot at {}", path.display())));
        }
        let markup = tokio::fs::read_to_string(&path).await?;
        debug!("📄 Read {} characters of markup from {}", markup.len(), path.display());
        Ok(markup)
    }
}

/// Fetches the watch page over HTTP
///
/// Plain HTTP does not run the player, so the heatmap is only present when an
/// upstream proxy serves rendered markup. A request that times out is reported
/// as [`HeatmapError::PreconditionTimeout`].
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: Option<String>,
}

impl HttpFetcher {
    pub fn new(timeout_seconds: u64, user_agent: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: None,
        }
    }

    /// Fetch `{base_url}/{video_id}` instead of the public watch page
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn url_for(&self, video_id: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), urlencoding::encode(video_id)),
            None => watch_url(video_id),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, video_id: &str) -> HeatmapResult<String> {
        let url = self.url_for(video_id);
        info!("🌐 Fetching page: {}", url);

        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                HeatmapError::PreconditionTimeout(format!("{}: {}", url, e))
            } else {
                HeatmapError::Fetch(format!("{}: {}", url, e))
            }
        };

        let response = self.client.get(&url).send().await.map_err(classify)?;
        if !response.status().is_success() {
            return Err(HeatmapError::Fetch(format!("HTTP error {}: {}", response.status(), url)));
        }

        response.text().await.map_err(classify)
    }
}
