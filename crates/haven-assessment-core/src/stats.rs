use serde::{Deserialize, Serialize};

use crate::{AssessmentResult, ResultId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Score went down.
    Improving,
    Worsening,
    Unchanged,
}

impl Trend {
    #[must_use]
    pub fn between(current: u8, previous: u8) -> Self {
        match current.cmp(&previous) {
            std::cmp::Ordering::Less => Self::Improving,
            std::cmp::Ordering::Greater => Self::Worsening,
            std::cmp::Ordering::Equal => Self::Unchanged,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Worsening => "worsening",
            Self::Unchanged => "unchanged",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub struct HistoryStatistics {
    pub total_tests: usize,
    pub average_score: u8,
    pub lowest_score: u8,
    pub highest_score: u8,
    pub improvement_count: usize,
    pub trend: Trend,
}

impl HistoryStatistics {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            total_tests: 0,
            average_score: 0,
            lowest_score: 0,
            highest_score: 0,
            improvement_count: 0,
            trend: Trend::Unchanged,
        }
    }
}

/// Summarizes newest-first results.
///
/// `improvement_count` counts adjacent pairs where `entries[i - 1].score >
/// entries[i].score`, in the order given. `trend` compares index 0 against
/// index 1.
#[must_use]
pub fn compute_statistics(entries: &[AssessmentResult]) -> HistoryStatistics {
    if entries.is_empty() {
        return HistoryStatistics::empty();
    }

    let total = entries.len();
    let sum: usize = entries.iter().map(|entry| usize::from(entry.score)).sum();
    // Integer round-half-up of sum / total.
    let average = (sum * 2 + total) / (total * 2);

    let lowest = entries.iter().map(|entry| entry.score).min().unwrap_or(0);
    let highest = entries.iter().map(|entry| entry.score).max().unwrap_or(0);

    let improvement_count = entries
        .windows(2)
        .filter(|pair| pair[0].score > pair[1].score)
        .count();

    let trend = match entries {
        [latest, previous, ..] => Trend::between(latest.score, previous.score),
        _ => Trend::Unchanged,
    };

    HistoryStatistics {
        total_tests: total,
        average_score: u8::try_from(average).unwrap_or(u8::MAX),
        lowest_score: lowest,
        highest_score: highest,
        improvement_count,
        trend,
    }
}

/// Per-entry trend against the next older entry; the oldest gets `None`.
#[must_use]
pub fn entry_trends(entries: &[AssessmentResult]) -> Vec<Option<Trend>> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            entries
                .get(index + 1)
                .map(|older| Trend::between(entry.score, older.score))
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ChartPoint {
    pub id: ResultId,
    pub score: u8,
}

/// Up to `limit` most recent scores, oldest first.
#[must_use]
pub fn chart_series(entries: &[AssessmentResult], limit: usize) -> Vec<ChartPoint> {
    let mut points: Vec<_> = entries
        .iter()
        .take(limit)
        .map(|entry| ChartPoint {
            id: entry.id.clone(),
            score: entry.score,
        })
        .collect();
    points.reverse();
    points
}
