use serde::{Deserialize, Serialize};

use crate::AssessmentError;

pub const QUESTION_COUNT: usize = 9;
pub const MAX_ANSWER: u8 = 3;
pub const MAX_SCORE: u8 = 27;

/// Raw sentinel for a question that has not been answered yet.
pub const UNANSWERED: i8 = -1;

/// Prompts are answered for "the last 2 weeks".
pub const QUESTIONS: [&str; QUESTION_COUNT] = [
    "Little interest or pleasure in doing things?",
    "Feeling down, depressed, or hopeless?",
    "Trouble falling or staying asleep, or sleeping too much?",
    "Feeling tired or having little energy?",
    "Poor appetite or overeating?",
    "Feeling bad about yourself - or that you are a failure or have let yourself or your family down?",
    "Trouble concentrating on things, such as reading or watching television?",
    "Moving or speaking so slowly that other people could have noticed? Or the opposite - being so fidgety or restless that you have been moving around a lot more than usual?",
    "Thoughts that you would be better off dead, or of hurting yourself in some way?",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOption {
    NotAtAll,
    SeveralDays,
    MoreThanHalfTheDays,
    NearlyEveryDay,
}

impl AnswerOption {
    pub const ALL: [Self; 4] = [
        Self::NotAtAll,
        Self::SeveralDays,
        Self::MoreThanHalfTheDays,
        Self::NearlyEveryDay,
    ];

    #[must_use]
    pub fn value(self) -> u8 {
        match self {
            Self::NotAtAll => 0,
            Self::SeveralDays => 1,
            Self::MoreThanHalfTheDays => 2,
            Self::NearlyEveryDay => 3,
        }
    }

    #[must_use]
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::NotAtAll),
            1 => Some(Self::SeveralDays),
            2 => Some(Self::MoreThanHalfTheDays),
            3 => Some(Self::NearlyEveryDay),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::NotAtAll => "Not at all",
            Self::SeveralDays => "Several days",
            Self::MoreThanHalfTheDays => "More than half the days",
            Self::NearlyEveryDay => "Nearly every day",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotAtAll => "not_at_all",
            Self::SeveralDays => "several_days",
            Self::MoreThanHalfTheDays => "more_than_half_the_days",
            Self::NearlyEveryDay => "nearly_every_day",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "not_at_all" => Some(Self::NotAtAll),
            "several_days" => Some(Self::SeveralDays),
            "more_than_half_the_days" => Some(Self::MoreThanHalfTheDays),
            "nearly_every_day" => Some(Self::NearlyEveryDay),
            _ => None,
        }
    }
}

/// In-progress answers to the nine questions.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct AssessmentResponse {
    answers: [Option<AnswerOption>; QUESTION_COUNT],
}

impl AssessmentResponse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a response from sentinel-encoded answers (`-1` = unanswered).
    ///
    /// # Errors
    /// Returns [`AssessmentError::Validation`] when the length is not nine
    /// or an entry is neither the sentinel nor in `0..=3`.
    pub fn from_raw(raw: &[i8]) -> Result<Self, AssessmentError> {
        check_length(raw)?;

        let mut response = Self::new();
        for (index, value) in raw.iter().copied().enumerate() {
            if value == UNANSWERED {
                continue;
            }
            response.answers[index] = Some(option_from_raw(index, value)?);
        }
        Ok(response)
    }

    /// Records (or overwrites) the answer for one question.
    ///
    /// # Errors
    /// Returns [`AssessmentError::Validation`] when the question index or
    /// the answer value is out of range.
    pub fn answer(&mut self, question_index: usize, value: u8) -> Result<(), AssessmentError> {
        if question_index >= QUESTION_COUNT {
            return Err(AssessmentError::Validation(format!(
                "question index {question_index} MUST be < {QUESTION_COUNT}"
            )));
        }

        let option = AnswerOption::from_value(value).ok_or_else(|| {
            AssessmentError::Validation(format!("answer value MUST be in [0, {MAX_ANSWER}]"))
        })?;
        self.answers[question_index] = Some(option);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, question_index: usize) -> Option<AnswerOption> {
        self.answers.get(question_index).copied().flatten()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|slot| slot.is_some()).count()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.answered_count() == QUESTION_COUNT
    }

    /// Share of answered questions as a whole percentage, rounded half up.
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        let percent = (self.answered_count() * 100 + QUESTION_COUNT / 2) / QUESTION_COUNT;
        u8::try_from(percent).unwrap_or(100)
    }

    #[must_use]
    pub fn to_raw(&self) -> [i8; QUESTION_COUNT] {
        let mut raw = [UNANSWERED; QUESTION_COUNT];
        for (slot, answer) in raw.iter_mut().zip(self.answers.iter()) {
            if let Some(option) = answer {
                *slot = i8::try_from(option.value()).unwrap_or(UNANSWERED);
            }
        }
        raw
    }

    /// Returns the nine answer values once every question is answered.
    ///
    /// # Errors
    /// Returns [`AssessmentError::Incomplete`] while any question is unanswered.
    pub fn completed_values(&self) -> Result<[u8; QUESTION_COUNT], AssessmentError> {
        let mut values = [0_u8; QUESTION_COUNT];
        for (slot, answer) in values.iter_mut().zip(self.answers.iter()) {
            match answer {
                Some(option) => *slot = option.value(),
                None => {
                    return Err(AssessmentError::Incomplete {
                        answered: self.answered_count(),
                        required: QUESTION_COUNT,
                    })
                }
            }
        }
        Ok(values)
    }

    /// Total score of a complete response.
    ///
    /// # Errors
    /// Returns [`AssessmentError::Incomplete`] while any question is unanswered.
    pub fn score(&self) -> Result<u8, AssessmentError> {
        Ok(self.completed_values()?.iter().sum())
    }
}

/// Sums nine sentinel-encoded answers into a score in `0..=27`.
///
/// Scoring is refused while any answer is still the `-1` sentinel.
///
/// # Errors
/// Returns [`AssessmentError::Incomplete`] when any answer is unanswered and
/// [`AssessmentError::Validation`] for a wrong length or out-of-range value.
pub fn score_answers(raw: &[i8]) -> Result<u8, AssessmentError> {
    AssessmentResponse::from_raw(raw)?.score()
}

fn check_length(raw: &[i8]) -> Result<(), AssessmentError> {
    if raw.len() != QUESTION_COUNT {
        return Err(AssessmentError::Validation(format!(
            "expected exactly {QUESTION_COUNT} answers, got {}",
            raw.len()
        )));
    }
    Ok(())
}

fn option_from_raw(index: usize, value: i8) -> Result<AnswerOption, AssessmentError> {
    u8::try_from(value)
        .ok()
        .and_then(AnswerOption::from_value)
        .ok_or_else(|| {
            AssessmentError::Validation(format!(
                "answer {} MUST be in [0, {MAX_ANSWER}] or {UNANSWERED}, got {value}",
                index + 1
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn all_max_answers_score_27() {
        assert_eq!(score_answers(&[3; QUESTION_COUNT]), Ok(27));
    }

    #[test]
    fn all_zero_answers_score_0() {
        assert_eq!(score_answers(&[0; QUESTION_COUNT]), Ok(0));
    }

    #[test]
    fn sentinel_blocks_scoring() {
        let raw = [1, 2, 3, 0, -1, 1, 2, -1, 0];
        assert_eq!(
            score_answers(&raw),
            Err(AssessmentError::Incomplete {
                answered: 7,
                required: QUESTION_COUNT,
            })
        );
    }

    #[test]
    fn wrong_length_is_a_validation_error() {
        assert!(matches!(
            score_answers(&[1, 2, 3]),
            Err(AssessmentError::Validation(_))
        ));
        assert!(matches!(
            score_answers(&[0; 10]),
            Err(AssessmentError::Validation(_))
        ));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut raw = [0_i8; QUESTION_COUNT];
        raw[3] = 4;
        assert!(matches!(
            score_answers(&raw),
            Err(AssessmentError::Validation(_))
        ));

        raw[3] = -2;
        assert!(matches!(
            score_answers(&raw),
            Err(AssessmentError::Validation(_))
        ));
    }

    #[test]
    fn answering_tracks_progress_and_completion() {
        let mut response = AssessmentResponse::new();
        assert_eq!(response.progress_percent(), 0);
        assert!(!response.is_complete());

        for index in 0..4 {
            assert!(response.answer(index, 2).is_ok());
        }
        assert_eq!(response.answered_count(), 4);
        assert_eq!(response.progress_percent(), 44);

        // overwriting an answer does not change progress
        assert!(response.answer(0, 1).is_ok());
        assert_eq!(response.answered_count(), 4);
        assert_eq!(response.get(0), Some(AnswerOption::SeveralDays));

        for index in 4..QUESTION_COUNT {
            assert!(response.answer(index, 0).is_ok());
        }
        assert!(response.is_complete());
        assert_eq!(response.progress_percent(), 100);
        assert_eq!(response.score(), Ok(7));
    }

    #[test]
    fn answer_rejects_bad_index_and_value() {
        let mut response = AssessmentResponse::new();
        assert!(response.answer(QUESTION_COUNT, 1).is_err());
        assert!(response.answer(0, 4).is_err());
        assert_eq!(response.answered_count(), 0);
    }

    #[test]
    fn raw_encoding_keeps_sentinels() {
        let raw = [0, -1, 3, 2, -1, 1, 0, 0, 3];
        let response = match AssessmentResponse::from_raw(&raw) {
            Ok(value) => value,
            Err(err) => panic!("expected valid raw answers: {err}"),
        };
        assert_eq!(response.to_raw(), raw);
    }

    #[test]
    fn answer_options_are_labelled_in_order() {
        let labels: Vec<_> = AnswerOption::ALL.iter().map(|o| o.label()).collect();
        assert_eq!(
            labels,
            [
                "Not at all",
                "Several days",
                "More than half the days",
                "Nearly every day"
            ]
        );
        for option in AnswerOption::ALL {
            assert_eq!(AnswerOption::parse(option.as_str()), Some(option));
            assert_eq!(AnswerOption::from_value(option.value()), Some(option));
        }
    }

    proptest! {
        #[test]
        fn prop_score_is_sum_of_answers(answers in prop::collection::vec(0i8..=3, QUESTION_COUNT)) {
            let expected: i32 = answers.iter().map(|v| i32::from(*v)).sum();
            let score = score_answers(&answers);
            prop_assert_eq!(score.map(i32::from), Ok(expected));
            prop_assert!(expected <= i32::from(MAX_SCORE));
        }
    }
}
