use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use ulid::Ulid;

use crate::{
    format_rfc3339, parse_rfc3339_utc, AssessmentError, AssessmentResponse, SeverityBand,
    MAX_ANSWER, MAX_SCORE, QUESTION_COUNT,
};

/// Opaque result identifier.
///
/// New results get a ULID. Any non-blank string is accepted on decode so
/// ids written by earlier app versions (`depression_<millis>`) keep working.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct ResultId(String);

impl ResultId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ResultId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ResultId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

impl TryFrom<String> for ResultId {
    type Error = AssessmentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().is_empty() {
            return Err(AssessmentError::Validation(
                "result id MUST be non-empty".to_string(),
            ));
        }
        Ok(Self(value))
    }
}

impl From<ResultId> for String {
    fn from(value: ResultId) -> Self {
        value.0
    }
}

impl FromStr for ResultId {
    type Err = AssessmentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::try_from(value.trim().to_string())
    }
}

/// One completed assessment. Created once on submission and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssessmentResult {
    pub id: ResultId,
    pub score: u8,
    pub answers: [u8; QUESTION_COUNT],
    #[serde(with = "rfc3339_utc")]
    pub timestamp: OffsetDateTime,
    /// Cached copy of `severity().label()`.
    #[serde(alias = "depressionType")]
    pub severity_label: String,
}

impl AssessmentResult {
    /// Scores and labels a complete response.
    ///
    /// # Errors
    /// Returns [`AssessmentError::Incomplete`] when any question is
    /// unanswered.
    pub fn from_response(
        response: &AssessmentResponse,
        timestamp: OffsetDateTime,
    ) -> Result<Self, AssessmentError> {
        Self::with_id(ResultId::new(), response, timestamp)
    }

    /// Same as [`AssessmentResult::from_response`] with a caller-chosen id.
    ///
    /// # Errors
    /// Returns [`AssessmentError::Incomplete`] when any question is
    /// unanswered.
    pub fn with_id(
        id: ResultId,
        response: &AssessmentResponse,
        timestamp: OffsetDateTime,
    ) -> Result<Self, AssessmentError> {
        let answers = response.completed_values()?;
        let score = response.score()?;
        let band = SeverityBand::from_score(score)?;

        Ok(Self {
            id,
            score,
            answers,
            timestamp,
            severity_label: band.label().to_string(),
        })
    }

    /// Band re-derived from `score`; never read from the cached label.
    ///
    /// # Errors
    /// Returns [`AssessmentError::Validation`] for a score above 27.
    pub fn severity(&self) -> Result<SeverityBand, AssessmentError> {
        SeverityBand::from_score(self.score)
    }

    /// Replaces the cached label with the one derived from `score`.
    /// Returns `true` when the stored label was stale.
    ///
    /// # Errors
    /// Returns [`AssessmentError::Validation`] for a score above 27.
    pub fn relabel(&mut self) -> Result<bool, AssessmentError> {
        let derived = self.severity()?.label();
        if self.severity_label == derived {
            return Ok(false);
        }
        self.severity_label = derived.to_string();
        Ok(true)
    }

    /// Checks the record is internally consistent after decoding.
    ///
    /// # Errors
    /// Returns [`AssessmentError::Validation`] when an answer or the score is
    /// out of range, the score is not the sum of the answers, or the cached
    /// label disagrees with the score.
    pub fn validate(&self) -> Result<(), AssessmentError> {
        if self.answers.iter().any(|answer| *answer > MAX_ANSWER) {
            return Err(AssessmentError::Validation(format!(
                "result {} has an answer above {MAX_ANSWER}",
                self.id
            )));
        }

        if self.score > MAX_SCORE {
            return Err(AssessmentError::Validation(format!(
                "result {} score MUST be in [0, {MAX_SCORE}]",
                self.id
            )));
        }

        let sum: u8 = self.answers.iter().sum();
        if sum != self.score {
            return Err(AssessmentError::Validation(format!(
                "result {} score {} does not match answer sum {sum}",
                self.id, self.score
            )));
        }

        let derived = self.severity()?.label();
        if self.severity_label != derived {
            return Err(AssessmentError::Validation(format!(
                "result {} label {:?} does not match score {} ({derived:?})",
                self.id, self.severity_label, self.score
            )));
        }

        Ok(())
    }
}

mod rfc3339_utc {
    use serde::{de::Error as _, ser::Error as _, Deserialize, Deserializer, Serializer};
    use time::{OffsetDateTime, UtcOffset};

    use super::{format_rfc3339, parse_rfc3339_utc};

    pub fn serialize<S: Serializer>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        let formatted = format_rfc3339(*value).map_err(S::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match parse_rfc3339_utc(&raw) {
            Ok(value) => Ok(value),
            // Offsets other than Z are normalized rather than rejected on read.
            Err(_) => OffsetDateTime::parse(&raw, &time::format_description::well_known::Rfc3339)
                .map(|value| value.to_offset(UtcOffset::UTC))
                .map_err(D::Error::custom),
        }
    }
}
