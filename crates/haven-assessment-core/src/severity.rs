use serde::{Deserialize, Serialize};

use crate::{AssessmentError, MAX_SCORE};

/// Scores strictly above this value require crisis resources to be shown.
///
/// Checked independently of the band table: 15..=19 and 20..=27 are
/// different bands, but both trip this threshold.
pub const URGENT_RESOURCES_THRESHOLD: u8 = 14;

pub const CRISIS_CONTACTS: [&str; 3] = [
    "South Africa Emergency: 0800 456 789",
    "Suicide Crisis Helpline: 0800 12 13 14",
    "Lifeline Support: 0861 322 322",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SeverityBand {
    Minimal,
    Mild,
    Moderate,
    ModeratelySevere,
    Severe,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Informational,
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Informational => "informational",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl SeverityBand {
    pub const ALL: [Self; 5] = [
        Self::Minimal,
        Self::Mild,
        Self::Moderate,
        Self::ModeratelySevere,
        Self::Severe,
    ];

    /// Maps a score to its band.
    ///
    /// # Errors
    /// Returns [`AssessmentError::Validation`] when `score` exceeds 27.
    pub fn from_score(score: u8) -> Result<Self, AssessmentError> {
        match score {
            0..=4 => Ok(Self::Minimal),
            5..=9 => Ok(Self::Mild),
            10..=14 => Ok(Self::Moderate),
            15..=19 => Ok(Self::ModeratelySevere),
            20..=MAX_SCORE => Ok(Self::Severe),
            _ => Err(AssessmentError::Validation(format!(
                "score MUST be in [0, {MAX_SCORE}], got {score}"
            ))),
        }
    }

    /// Inclusive score range covered by the band.
    #[must_use]
    pub fn score_range(self) -> (u8, u8) {
        match self {
            Self::Minimal => (0, 4),
            Self::Mild => (5, 9),
            Self::Moderate => (10, 14),
            Self::ModeratelySevere => (15, 19),
            Self::Severe => (20, MAX_SCORE),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::ModeratelySevere => "moderately_severe",
            Self::Severe => "severe",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "minimal" => Some(Self::Minimal),
            "mild" => Some(Self::Mild),
            "moderate" => Some(Self::Moderate),
            "moderately_severe" => Some(Self::ModeratelySevere),
            "severe" => Some(Self::Severe),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Minimal => "Minimal or no depression",
            Self::Mild => "Mild depression",
            Self::Moderate => "Moderate depression",
            Self::ModeratelySevere => "Moderately severe depression",
            Self::Severe => "Severe depression",
        }
    }

    #[must_use]
    pub fn urgency(self) -> Urgency {
        match self {
            Self::Minimal => Urgency::Informational,
            Self::Mild => Urgency::Low,
            Self::Moderate => Urgency::Medium,
            Self::ModeratelySevere => Urgency::High,
            Self::Severe => Urgency::Critical,
        }
    }

    #[must_use]
    pub fn recommendation(self) -> &'static str {
        match self {
            Self::Minimal => "You seem to be doing well! Continue your self-care practices and stay connected with supportive people.",
            Self::Mild => "Consider talking to Haven or a mental health professional. Small steps toward support can make a big difference.",
            Self::Moderate => "It would be beneficial to speak with a mental health professional. You deserve support and care.",
            Self::ModeratelySevere => "Please consider reaching out to a mental health professional soon. Your wellbeing matters.",
            Self::Severe => "We strongly encourage you to seek professional help immediately. If you're having thoughts of self-harm, please contact emergency services or a crisis helpline.",
        }
    }

    #[must_use]
    pub fn color_hex(self) -> &'static str {
        match self {
            Self::Minimal => "#4CAF50",
            Self::Mild => "#FFC107",
            Self::Moderate => "#FF9800",
            Self::ModeratelySevere => "#FF5722",
            Self::Severe => "#F44336",
        }
    }

    #[must_use]
    pub fn emoji(self) -> &'static str {
        match self {
            Self::Minimal => "\u{1F60A}",
            Self::Mild => "\u{1F610}",
            Self::Moderate => "\u{1F61F}",
            Self::ModeratelySevere => "\u{1F61E}",
            Self::Severe => "\u{1F622}",
        }
    }

    #[must_use]
    pub fn encouragement(self) -> &'static str {
        match self {
            Self::Minimal => "You're showing great resilience!",
            Self::Mild => "Every step toward healing matters.",
            Self::Moderate => "Your courage to seek understanding is admirable.",
            Self::ModeratelySevere => "You are not alone in this journey.",
            Self::Severe => "Your life has value and meaning.",
        }
    }
}

#[must_use]
pub fn requires_urgent_resources(score: u8) -> bool {
    score > URGENT_RESOURCES_THRESHOLD
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub score: u8,
    pub band: SeverityBand,
    pub label: String,
    pub urgency: Urgency,
    pub recommendation: String,
    pub color_hex: String,
    pub encouragement: String,
    pub requires_urgent_resources: bool,
    pub score_fraction: f32,
}

/// Classifies a score into its band and presentation attributes.
///
/// # Errors
/// Returns [`AssessmentError::Validation`] when `score` exceeds 27.
pub fn classify(score: u8) -> Result<Classification, AssessmentError> {
    let band = SeverityBand::from_score(score)?;
    Ok(Classification {
        score,
        band,
        label: band.label().to_string(),
        urgency: band.urgency(),
        recommendation: band.recommendation().to_string(),
        color_hex: band.color_hex().to_string(),
        encouragement: band.encouragement().to_string(),
        requires_urgent_resources: requires_urgent_resources(score),
        score_fraction: f32::from(score) / f32::from(MAX_SCORE),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn must_band(score: u8) -> SeverityBand {
        match SeverityBand::from_score(score) {
            Ok(band) => band,
            Err(err) => panic!("expected a band for {score}: {err}"),
        }
    }

    #[test]
    fn boundary_scores_map_to_adjacent_bands() {
        let cases = [
            (0, SeverityBand::Minimal),
            (4, SeverityBand::Minimal),
            (5, SeverityBand::Mild),
            (9, SeverityBand::Mild),
            (10, SeverityBand::Moderate),
            (14, SeverityBand::Moderate),
            (15, SeverityBand::ModeratelySevere),
            (19, SeverityBand::ModeratelySevere),
            (20, SeverityBand::Severe),
            (27, SeverityBand::Severe),
        ];
        for (score, expected) in cases {
            assert_eq!(must_band(score), expected, "score {score}");
        }
    }

    #[test]
    fn every_valid_score_has_exactly_one_band() {
        for score in 0..=MAX_SCORE {
            let band = must_band(score);
            let (low, high) = band.score_range();
            assert!((low..=high).contains(&score));
            let owners = SeverityBand::ALL
                .iter()
                .filter(|b| {
                    let (l, h) = b.score_range();
                    (l..=h).contains(&score)
                })
                .count();
            assert_eq!(owners, 1);
        }
    }

    #[test]
    fn scores_above_27_are_rejected() {
        assert!(SeverityBand::from_score(28).is_err());
        assert!(classify(u8::MAX).is_err());
    }

    #[test]
    fn urgent_threshold_is_strictly_above_14() {
        assert!(!requires_urgent_resources(0));
        assert!(!requires_urgent_resources(14));
        assert!(requires_urgent_resources(15));
        assert!(requires_urgent_resources(27));
    }

    #[test]
    fn labels_match_band_table() {
        assert_eq!(must_band(4).label(), "Minimal or no depression");
        assert_eq!(must_band(5).label(), "Mild depression");
        assert_eq!(must_band(14).label(), "Moderate depression");
        assert_eq!(must_band(15).label(), "Moderately severe depression");
        assert_eq!(must_band(20).label(), "Severe depression");
    }

    #[test]
    fn severe_score_is_critical_and_urgent() {
        let classification = match classify(27) {
            Ok(value) => value,
            Err(err) => panic!("classify failed: {err}"),
        };
        assert_eq!(classification.label, "Severe depression");
        assert_eq!(classification.urgency, Urgency::Critical);
        assert!(classification.requires_urgent_resources);
        assert!((classification.score_fraction - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_score_is_informational() {
        let classification = match classify(0) {
            Ok(value) => value,
            Err(err) => panic!("classify failed: {err}"),
        };
        assert_eq!(classification.label, "Minimal or no depression");
        assert_eq!(classification.urgency, Urgency::Informational);
        assert!(!classification.requires_urgent_resources);
    }

    #[test]
    fn band_text_is_never_empty_and_names_round_trip() {
        for band in SeverityBand::ALL {
            assert!(!band.encouragement().is_empty());
            assert!(!band.recommendation().is_empty());
            assert!(band.color_hex().starts_with('#'));
            assert_eq!(SeverityBand::parse(band.as_str()), Some(band));
        }
    }
}
