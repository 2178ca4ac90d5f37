/// Rise/fall detection over the attention signal
use super::{AnalysisResult, Interval, Sample};
use tracing::debug;

/// Deviation from the mean, in percentage points, that counts as significant
pub const DEFAULT_THRESHOLD: f64 = 1.35;

/// Tracks one open interval while walking the signal
#[derive(Default)]
struct IntervalTracker {
    open_at: Option<f64>,
    closed: Vec<Interval>,
}

impl IntervalTracker {
    fn step(&mut self, qualifies: bool, next_qualifies: bool, time: f64) {
        if !qualifies {
            return;
        }
        let start = *self.open_at.get_or_insert(time);
        if !next_qualifies {
            self.closed.push(Interval::new(start, time));
            self.open_at = None;
        }
    }
}

/// Mean attention plus contiguous runs above `mean + threshold` and below `mean - threshold`
///
/// Samples must already be in time order. Empty input, or any sample with a
/// non-finite field, yields [`AnalysisResult::empty`].
pub fn analyze(samples: &[Sample], threshold: f64) -> AnalysisResult {
    if samples.is_empty() || !samples.iter().all(Sample::is_valid) {
        return AnalysisResult::empty();
    }

    let average = samples.iter().map(|s| s.attention).sum::<f64>() / samples.len() as f64;
    let upper = average + threshold;
    let lower = average - threshold;

    let mut rises = IntervalTracker::default();
    let mut falls = IntervalTracker::default();

    for (i, sample) in samples.iter().enumerate() {
        let next = samples.get(i + 1);

        rises.step(
            sample.attention > upper,
            next.map_or(false, |n| n.attention > upper),
            sample.time,
        );
        falls.step(
            sample.attention < lower,
            next.map_or(false, |n| n.attention < lower),
            sample.time,
        );
    }

    debug!(
        "Average attention {:.2}: {} rises, {} falls",
        average,
        rises.closed.len(),
        falls.closed.len()
    );

    AnalysisResult {
        average_attention: average,
        rises: rises.closed,
        falls: falls.closed,
    }
}
