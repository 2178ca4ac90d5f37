/// Selects the transcript entries that fall inside each detected interval
use super::TranscriptEntry;
use crate::heatmap::{AnalysisResult, Interval};
use serde::{Deserialize, Serialize};

/// Transcript entries grouped per rise and per fall interval
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SignificantSections {
    /// One group per rise interval, same order as the analysis
    pub rises: Vec<Vec<TranscriptEntry>>,
    /// One group per fall interval, same order as the analysis
    pub falls: Vec<Vec<TranscriptEntry>>,
}

fn entries_within(transcript: &[TranscriptEntry], interval: &Interval) -> Vec<TranscriptEntry> {
    transcript
        .iter()
        .filter(|entry| interval.contains(entry.start))
        .cloned()
        .collect()
}

/// Group transcript entries by the interval their start time falls in
///
/// An absent transcript yields empty groupings rather than an error.
pub fn map_intervals(transcript: Option<&[TranscriptEntry]>, analysis: &AnalysisResult) -> SignificantSections {
    let Some(transcript) = transcript else {
        return SignificantSections::default();
    };

    SignificantSections {
        rises: analysis.rises.iter().map(|i| entries_within(transcript, i)).collect(),
        falls: analysis.falls.iter().map(|i| entries_within(transcript, i)).collect(),
    }
}

/// Join a group's text the way it is shown with a clip
pub fn joined_text(entries: &[TranscriptEntry]) -> String {
    entries
        .iter()
        .map(|e| e.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript() -> Vec<TranscriptEntry> {
        [0.0, 2.0, 4.0, 6.0]
            .iter()
            .map(|t| TranscriptEntry::new(*t, t + 1.5, format!("at {}", t)))
            .collect()
    }

    fn analysis(rises: Vec<Interval>, falls: Vec<Interval>) -> AnalysisResult {
        AnalysisResult {
            average_attention: 50.0,
            rises,
            falls,
        }
    }

    #[test]
    fn test_selects_entries_inside_interval() {
        let sections = map_intervals(Some(&transcript()), &analysis(vec![Interval::new(3.0, 5.0)], vec![]));
        assert_eq!(sections.rises.len(), 1);
        assert_eq!(sections.rises[0].len(), 1);
        assert_eq!(sections.rises[0][0].start, 4.0);
        assert!(sections.falls.is_empty());
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let sections = map_intervals(Some(&transcript()), &analysis(vec![Interval::new(2.0, 4.0)], vec![]));
        let starts: Vec<f64> = sections.rises[0].iter().map(|e| e.start).collect();
        assert_eq!(starts, vec![2.0, 4.0]);
    }

    #[test]
    fn test_entry_can_appear_in_rise_and_fall() {
        let sections = map_intervals(
            Some(&transcript()),
            &analysis(vec![Interval::new(0.0, 2.0)], vec![Interval::new(2.0, 6.0)]),
        );
        assert_eq!(sections.rises[0].len(), 2);
        assert_eq!(sections.falls[0].len(), 3);
        assert_eq!(sections.rises[0][1], sections.falls[0][0]);
    }

    #[test]
    fn test_absent_transcript() {
        let sections = map_intervals(None, &analysis(vec![Interval::new(0.0, 10.0)], vec![]));
        assert!(sections.rises.is_empty());
        assert!(sections.falls.is_empty());
    }

    #[test]
    fn test_empty_group_per_interval_without_entries() {
        let sections = map_intervals(Some(&transcript()), &analysis(vec![Interval::new(10.0, 12.0)], vec![]));
        assert_eq!(sections.rises, vec![Vec::new()]);
    }

    #[test]
    fn test_joined_text() {
        let entries = vec![
            TranscriptEntry::new(0.0, 1.0, "hello"),
            TranscriptEntry::new(1.0, 2.0, ""),
            TranscriptEntry::new(2.0, 3.0, "world"),
        ];
        assert_eq!(joined_text(&entries), "hello world");
    }
}
