/// Width/height normalization for heatmap fragments
use crate::error::{HeatmapError, HeatmapResult};

/// Pixels per percentage point used by the player's chapter markup
pub const PERCENT_SCALE: f64 = 10.0;

/// Convert a `px` or `%` dimension into whole pixels
pub fn parse_dimension(value: &str) -> HeatmapResult<u32> {
    let trimmed = value.trim();

    if let Some(number) = trimmed.strip_suffix("px") {
        return number
            .trim()
            .parse::<u32>()
            .map_err(|_| HeatmapError::unrecognized_unit(value));
    }

    if let Some(number) = trimmed.strip_suffix('%') {
        let percent: f64 = number
            .trim()
            .parse()
            .map_err(|_| HeatmapError::unrecognized_unit(value))?;
        if !percent.is_finite() || percent < 0.0 {
            return Err(HeatmapError::unrecognized_unit(value));
        }
        return Ok((percent * PERCENT_SCALE) as u32);
    }

    Err(HeatmapError::unrecognized_unit(value))
}
