use serde::{Deserialize, Serialize};
use time::{Duration, Month, OffsetDateTime};

use crate::{AssessmentError, AssessmentResult, ResultId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, Default)]
pub enum HistoryPeriod {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "30days")]
    Last30Days,
    #[serde(rename = "90days")]
    Last90Days,
    #[serde(rename = "1year")]
    LastYear,
}

impl HistoryPeriod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Last30Days => "30days",
            Self::Last90Days => "90days",
            Self::LastYear => "1year",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "30days" => Some(Self::Last30Days),
            "90days" => Some(Self::Last90Days),
            "1year" => Some(Self::LastYear),
            _ => None,
        }
    }

    /// Earliest timestamp still inside the period, or `None` for [`HistoryPeriod::All`].
    ///
    /// A year back from Feb 29 lands on Mar 1 of the previous year.
    #[must_use]
    pub fn cutoff(self, now: OffsetDateTime) -> Option<OffsetDateTime> {
        match self {
            Self::All => None,
            Self::Last30Days => Some(now - Duration::days(30)),
            Self::Last90Days => Some(now - Duration::days(90)),
            Self::LastYear => Some(one_year_before(now)),
        }
    }

    #[must_use]
    pub fn contains(self, timestamp: OffsetDateTime, now: OffsetDateTime) -> bool {
        match self.cutoff(now) {
            None => true,
            Some(cutoff) => timestamp >= cutoff && timestamp <= now,
        }
    }
}

fn one_year_before(now: OffsetDateTime) -> OffsetDateTime {
    let year = now.year() - 1;
    if let Ok(shifted) = now.replace_year(year) {
        return shifted;
    }

    now.replace_day(1)
        .and_then(|value| value.replace_month(Month::March))
        .and_then(|value| value.replace_year(year))
        .unwrap_or(now - Duration::days(365))
}

/// Bounded newest-first list of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryLog {
    entries: Vec<AssessmentResult>,
    capacity: usize,
}

impl HistoryLog {
    /// Creates an empty log.
    ///
    /// # Errors
    /// Returns [`AssessmentError::Configuration`] for a zero capacity.
    pub fn new(capacity: usize) -> Result<Self, AssessmentError> {
        Self::from_entries(Vec::new(), capacity)
    }

    /// Wraps already newest-first entries, dropping any beyond capacity.
    ///
    /// # Errors
    /// Returns [`AssessmentError::Configuration`] for a zero capacity.
    pub fn from_entries(
        mut entries: Vec<AssessmentResult>,
        capacity: usize,
    ) -> Result<Self, AssessmentError> {
        if capacity == 0 {
            return Err(AssessmentError::Configuration(
                "capacity MUST be >= 1".to_string(),
            ));
        }
        entries.truncate(capacity);
        Ok(Self { entries, capacity })
    }

    /// Prepends `result` and returns whatever fell off the tail.
    pub fn append(&mut self, result: AssessmentResult) -> Vec<AssessmentResult> {
        self.entries.insert(0, result);
        if self.entries.len() > self.capacity {
            self.entries.split_off(self.capacity)
        } else {
            Vec::new()
        }
    }

    /// Removes the entry with `id`. Absent ids are a no-op.
    pub fn remove(&mut self, id: &ResultId) -> Option<AssessmentResult> {
        let index = self.entries.iter().position(|entry| &entry.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn get(&self, id: &ResultId) -> Option<&AssessmentResult> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    #[must_use]
    pub fn entries(&self) -> &[AssessmentResult] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries whose timestamp falls in the period ending at `now`, newest first.
    #[must_use]
    pub fn filter_by_period(&self, period: HistoryPeriod, now: OffsetDateTime) -> Vec<AssessmentResult> {
        self.entries
            .iter()
            .filter(|entry| period.contains(entry.timestamp, now))
            .cloned()
            .collect()
    }
}
