/// Converts the unified heatmap image into an ordered attention signal
use crate::error::{excerpt, HeatmapError, HeatmapResult};
use super::path::coordinate_pairs;
use super::Sample;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Nested path nodes: each stitched group wraps a defs block holding the paths
const PATH_SELECTOR: &str = "g defs path";

/// Coordinate space the path geometry is expressed in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SamplerConfig {
    /// Nominal width mapped onto the full video duration
    pub width: f64,
    /// Nominal height mapped onto 0-100 attention
    pub height: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 1000.0,
        }
    }
}

impl SamplerConfig {
    /// Map one path coordinate onto the signal
    pub fn to_sample(&self, x: f64, y: f64, duration_seconds: f64) -> Sample {
        Sample {
            time: (x / self.width) * duration_seconds,
            attention: 100.0 - (y / self.height) * 100.0,
        }
    }
}

/// Sample the serialized unified image, reporting malformed geometry as an error
pub fn try_sample(svg: &str, duration_seconds: f64, config: &SamplerConfig) -> HeatmapResult<Vec<Sample>> {
    if svg.trim().is_empty() {
        debug!("Heatmap SVG is empty, no samples");
        return Ok(Vec::new());
    }

    let fragment = Html::parse_fragment(svg);
    if !fragment.errors.is_empty() {
        debug!("SVG parsed with {} recoverable errors", fragment.errors.len());
    }

    let svg_selector = Selector::parse("svg")
        .map_err(|e| HeatmapError::malformed(format!("invalid selector: {:?}", e)))?;
    if fragment.select(&svg_selector).next().is_none() {
        return Err(HeatmapError::malformed(format!(
            "no <svg> element in {:?}",
            excerpt(svg, 120)
        )));
    }

    let path_selector = Selector::parse(PATH_SELECTOR)
        .map_err(|e| HeatmapError::malformed(format!("invalid selector: {:?}", e)))?;

    let mut samples = Vec::new();
    for path in fragment.select(&path_selector) {
        let d = path.value().attr("d").unwrap_or("");
        let points = coordinate_pairs(d)
            .map_err(|e| HeatmapError::malformed(format!("path data {:?}: {}", excerpt(d, 120), e)))?;

        samples.extend(points.into_iter().map(|(x, y)| config.to_sample(x, y, duration_seconds)));
    }

    debug!("Sampled {} heatmap points over {:.1}s", samples.len(), duration_seconds);
    Ok(samples)
}

/// Sample the unified image, degrading malformed geometry to an empty signal
pub fn sample(svg: &str, duration_seconds: f64, config: &SamplerConfig) -> Vec<Sample> {
    match try_sample(svg, duration_seconds, config) {
        Ok(samples) => samples,
        Err(e) => {
            warn!("⚠️ Treating heatmap as empty: {}", e);
            Vec::new()
        }
    }
}
