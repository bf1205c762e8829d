//! Depression self-assessment domain: questionnaire scoring, severity
//! classification and newest-first history aggregation.
//!
//! Everything in this crate is pure. Persistence lives in
//! `haven-assessment-store-sqlite`; time is supplied through [`Clock`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{OffsetDateTime, UtcOffset};

mod clock;
mod history;
mod questionnaire;
mod result;
mod severity;
mod stats;

pub use clock::{Clock, FixedClock, SystemClock};
pub use history::{HistoryLog, HistoryPeriod};
pub use questionnaire::{
    score_answers, AnswerOption, AssessmentResponse, MAX_ANSWER, MAX_SCORE, QUESTIONS,
    QUESTION_COUNT, UNANSWERED,
};
pub use result::{AssessmentResult, ResultId};
pub use severity::{
    classify, requires_urgent_resources, Classification, SeverityBand, Urgency, CRISIS_CONTACTS,
    URGENT_RESOURCES_THRESHOLD,
};
pub use stats::{
    chart_series, compute_statistics, entry_trends, ChartPoint, HistoryStatistics, Trend,
};

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum AssessmentError {
    #[error("assessment incomplete: {answered} of {required} questions answered")]
    Incomplete { answered: usize, required: usize },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Default number of results retained in history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Default key under which the serialized history is stored.
pub const DEFAULT_STORAGE_KEY: &str = "depressionTestHistory";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryConfig {
    pub capacity: usize,
    pub storage_key: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self::v1()
    }
}

impl HistoryConfig {
    #[must_use]
    pub fn v1() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }

    /// Validates capacity and key constraints.
    ///
    /// # Errors
    /// Returns [`AssessmentError::Configuration`] when the capacity is zero
    /// or the storage key is blank.
    pub fn validate(&self) -> Result<(), AssessmentError> {
        if self.capacity == 0 {
            return Err(AssessmentError::Configuration(
                "capacity MUST be >= 1".to_string(),
            ));
        }

        if self.storage_key.trim().is_empty() {
            return Err(AssessmentError::Configuration(
                "storage_key MUST be provided".to_string(),
            ));
        }

        Ok(())
    }

    /// Decodes and validates a history configuration from JSON.
    ///
    /// # Errors
    /// Returns [`AssessmentError::Configuration`] when JSON decoding fails
    /// or decoded values violate configuration constraints.
    pub fn from_json(value: &Value) -> Result<Self, AssessmentError> {
        let config: Self = serde_json::from_value(value.clone()).map_err(|err| {
            AssessmentError::Configuration(format!("invalid history config JSON payload: {err}"))
        })?;
        config.validate()?;
        Ok(config)
    }
}

/// Parses an RFC3339 timestamp and requires UTC (`Z`) offset.
///
/// # Errors
/// Returns [`AssessmentError::Validation`] when parsing fails or an input
/// timestamp is not UTC.
pub fn parse_rfc3339_utc(value: &str) -> Result<OffsetDateTime, AssessmentError> {
    let parsed = OffsetDateTime::parse(value, &time::format_description::well_known::Rfc3339)
        .map_err(|err| AssessmentError::Validation(format!("invalid RFC3339 timestamp: {err}")))?;

    if parsed.offset() != UtcOffset::UTC {
        return Err(AssessmentError::Validation(
            "timestamp MUST use UTC offset Z".to_string(),
        ));
    }

    Ok(parsed)
}

/// Formats a timestamp as RFC3339 after normalizing to UTC.
///
/// # Errors
/// Returns [`AssessmentError::Validation`] when formatting fails.
pub fn format_rfc3339(value: OffsetDateTime) -> Result<String, AssessmentError> {
    value
        .to_offset(UtcOffset::UTC)
        .format(&time::format_description::well_known::Rfc3339)
        .map_err(|err| {
            AssessmentError::Validation(format!("failed to format RFC3339 timestamp: {err}"))
        })
}

#[must_use]
pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(UtcOffset::UTC)
}
