//! Per-user analysis statistics for the dashboard overview.
//!
//! Aggregates are computed on request from the user's stored segments;
//! nothing is pre-computed or cached.

use serde::Serialize;
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Number of segments reported in `topSegments`.
pub const TOP_SEGMENTS_LIMIT: usize = 5;

/// How often a segment was analysed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
pub struct SegmentCount {
    pub segmento: String,
    pub count: u64,
}

/// Overview returned by `/api/analysis/stats/overview`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
pub struct StatsOverview {
    pub total_analyses: u64,
    pub this_month: u64,
    pub top_segments: Vec<SegmentCount>,
}

/// Rank segments by frequency, most frequent first.
///
/// Ties are broken alphabetically so the ranking is stable across calls.
pub fn top_segments<I>(segments: I, limit: usize) -> Vec<SegmentCount>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: HashMap<String, u64> = HashMap::new();
    for segment in segments {
        *counts.entry(segment).or_insert(0) += 1;
    }

    let mut ranked: Vec<SegmentCount> = counts
        .into_iter()
        .map(|(segmento, count)| SegmentCount { segmento, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.segmento.cmp(&b.segmento)));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_top_segments_orders_by_count() {
        let ranked = top_segments(
            segments(&["saude", "tecnologia", "saude", "moda", "saude", "tecnologia"]),
            TOP_SEGMENTS_LIMIT,
        );
        assert_eq!(
            ranked,
            vec![
                SegmentCount {
                    segmento: "saude".to_string(),
                    count: 3
                },
                SegmentCount {
                    segmento: "tecnologia".to_string(),
                    count: 2
                },
                SegmentCount {
                    segmento: "moda".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_top_segments_truncates_and_breaks_ties_by_name() {
        let ranked = top_segments(segments(&["f", "e", "d", "c", "b", "a"]), 5);
        let names: Vec<&str> = ranked.iter().map(|s| s.segmento.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_top_segments_empty() {
        assert!(top_segments(Vec::new(), 5).is_empty());
    }
}
