/// Stitches the player's per-chapter heatmap SVGs into one image
use crate::error::{HeatmapError, HeatmapResult};
use super::geometry::parse_dimension;
use scraper::{Html, Selector};
use std::fmt::Write as _;
use tracing::{debug, info};

const CONTAINER_SELECTOR: &str = "div.ytp-heat-map-container";
const CHAPTER_SVG_SELECTOR: &str = "div.ytp-heat-map-chapter > svg";
const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// One chapter's vector graphic as found in the page
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Raw width attribute, e.g. `"120px"` or `"12.5%"`
    pub width: String,
    /// Raw height attribute
    pub height: String,
    /// Serialized child nodes, in source order
    pub children: String,
}

impl Fragment {
    pub fn new(width: impl Into<String>, height: impl Into<String>, children: impl Into<String>) -> Self {
        Self {
            width: width.into(),
            height: height.into(),
            children: children.into(),
        }
    }
}

/// A fragment placed inside the unified image
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentGroup {
    /// Horizontal translation in pixels
    pub offset: u32,
    /// Width of the source fragment in pixels
    pub width: u32,
    /// Chapter child markup, unchanged
    pub content: String,
}

/// Single synthetic SVG made of every chapter fragment laid out left to right
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedImage {
    pub width: u32,
    pub height: u32,
    pub groups: Vec<FragmentGroup>,
}

impl UnifiedImage {
    /// Extract and stitch in one step
    pub fn from_markup(markup: &str) -> HeatmapResult<Self> {
        let fragments = extract_fragments(markup)?;
        stitch(&fragments)
    }

    /// Serialize as a standalone SVG document
    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        // Writing into a String cannot fail
        let _ = writeln!(
            svg,
            r#"<svg xmlns="{ns}" width="{w}px" height="{h}px" viewBox="0 0 {w} {h}">"#,
            ns = SVG_NAMESPACE,
            w = self.width,
            h = self.height
        );
        for group in &self.groups {
            let _ = writeln!(svg, r#"  <g transform="translate({}, 0)">{}</g>"#, group.offset, group.content);
        }
        svg.push_str("</svg>\n");
        svg
    }
}

fn selector(css: &str) -> HeatmapResult<Selector> {
    Selector::parse(css).map_err(|e| HeatmapError::malformed(format!("invalid selector {}: {:?}", css, e)))
}

/// Find the chapter SVGs inside page markup (full page or container contents)
pub fn extract_fragments(markup: &str) -> HeatmapResult<Vec<Fragment>> {
    let document = Html::parse_document(markup);
    let chapter_selector = selector(CHAPTER_SVG_SELECTOR)?;

    let mut fragments = Vec::new();
    for svg in document.select(&chapter_selector) {
        let attrs = svg.value();
        let width = attrs
            .attr("width")
            .ok_or_else(|| HeatmapError::malformed(format!("chapter svg #{} has no width", fragments.len())))?;
        let height = attrs
            .attr("height")
            .ok_or_else(|| HeatmapError::malformed(format!("chapter svg #{} has no height", fragments.len())))?;

        fragments.push(Fragment::new(width, height, svg.inner_html()));
    }

    if fragments.is_empty() {
        let has_container = document.select(&selector(CONTAINER_SELECTOR)?).next().is_some();
        return Err(if has_container {
            HeatmapError::not_found("heatmap container has no chapter svg")
        } else {
            HeatmapError::not_found("heatmap container not present in markup")
        });
    }

    debug!("Found {} heatmap chapter fragments", fragments.len());
    Ok(fragments)
}

/// Lay fragments out horizontally, each translated by the widths before it
pub fn stitch(fragments: &[Fragment]) -> HeatmapResult<UnifiedImage> {
    if fragments.is_empty() {
        return Err(HeatmapError::not_found("no heatmap fragments to stitch"));
    }

    let mut groups = Vec::with_capacity(fragments.len());
    let mut current_x: u32 = 0;
    let mut max_height: u32 = 0;

    for fragment in fragments {
        let width = parse_dimension(&fragment.width)?;
        let height = parse_dimension(&fragment.height)?;

        groups.push(FragmentGroup {
            offset: current_x,
            width,
            content: fragment.children.clone(),
        });

        current_x = current_x.saturating_add(width);
        max_height = max_height.max(height);
    }

    info!("🧩 Stitched {} heatmap fragments into {}x{}", groups.len(), current_x, max_height);

    Ok(UnifiedImage {
        width: current_x,
        height: max_height,
        groups,
    })
}
