//! GPA/IELTS eligibility rule shared by the standalone check and the submission gate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Suggestions returned by the standalone eligibility check.
pub const CHECK_SUGGESTIONS: [&str; 3] = [
    "Consider improving your test scores",
    "Look for universities with lower requirements",
    "Consider taking additional courses to improve your profile",
];

/// Suggestions attached to a rejected submission.
pub const SUBMISSION_SUGGESTIONS: [&str; 3] = [
    "Consider improving your test scores",
    "Look for universities with lower requirements",
    "Contact university admission office for special consideration",
];

pub const ELIGIBLE_NOTE: &str = "Meets all eligibility criteria";

/// Applicant scores being compared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub gpa: f64,
    pub ielts: f64,
}

/// A university's published minimums.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(rename = "minGPA")]
    pub min_gpa: f64,
    #[serde(rename = "minIELTS")]
    pub min_ielts: f64,
}

/// Equality counts as eligible.
pub fn is_eligible(scores: Scores, requirements: Requirements) -> bool {
    scores.gpa >= requirements.min_gpa && scores.ielts >= requirements.min_ielts
}

/// Outcome with one reason per failing criterion.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub eligible: bool,
    pub reasons: Vec<String>,
    pub suggestions: Vec<String>,
}

pub fn assess(scores: Scores, requirements: Requirements) -> Assessment {
    let eligible = is_eligible(scores, requirements);
    if eligible {
        return Assessment {
            eligible,
            reasons: vec!["All requirements met".to_string()],
            suggestions: Vec::new(),
        };
    }

    let mut reasons = Vec::new();
    if scores.gpa < requirements.min_gpa {
        reasons.push(format!(
            "Your GPA ({}) is below the minimum requirement ({})",
            scores.gpa, requirements.min_gpa
        ));
    }
    if scores.ielts < requirements.min_ielts {
        reasons.push(format!(
            "Your IELTS score ({}) is below the minimum requirement ({})",
            scores.ielts, requirements.min_ielts
        ));
    }

    Assessment {
        eligible,
        reasons,
        suggestions: CHECK_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
    }
}

/// Snapshot stored on an application at the time it was checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityCheck {
    pub passed: bool,
    pub checked_at: bson::DateTime,
    pub notes: String,
}

impl EligibilityCheck {
    pub fn record(scores: Scores, requirements: Requirements, at: DateTime<Utc>) -> Self {
        let passed = is_eligible(scores, requirements);
        let notes = if passed {
            ELIGIBLE_NOTE.to_string()
        } else {
            format!(
                "Failed eligibility: GPA ({}/{}), IELTS ({}/{})",
                scores.gpa, requirements.min_gpa, scores.ielts, requirements.min_ielts
            )
        };

        Self {
            passed,
            checked_at: bson::DateTime::from_chrono(at),
            notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn requirements() -> Requirements {
        Requirements {
            min_gpa: 3.5,
            min_ielts: 7.0,
        }
    }

    #[test]
    fn equality_is_eligible() {
        assert!(is_eligible(
            Scores {
                gpa: 3.5,
                ielts: 7.0
            },
            requirements()
        ));
    }

    #[test]
    fn eligible_iff_both_thresholds_met() {
        let gpas = [0.0, 2.9, 3.49, 3.5, 3.51, 4.0];
        let ieltses = [0.0, 6.5, 6.99, 7.0, 7.5, 9.0];
        for gpa in gpas {
            for ielts in ieltses {
                let expected = gpa >= 3.5 && ielts >= 7.0;
                assert_eq!(
                    is_eligible(Scores { gpa, ielts }, requirements()),
                    expected,
                    "gpa {gpa} ielts {ielts}"
                );
            }
        }
    }

    #[test]
    fn assessment_lists_each_failing_criterion() {
        let assessment = assess(
            Scores {
                gpa: 3.0,
                ielts: 6.5,
            },
            requirements(),
        );
        assert!(!assessment.eligible);
        assert_eq!(
            assessment.reasons,
            vec![
                "Your GPA (3) is below the minimum requirement (3.5)".to_string(),
                "Your IELTS score (6.5) is below the minimum requirement (7)".to_string(),
            ]
        );
        assert_eq!(assessment.suggestions.len(), 3);
    }

    #[test]
    fn eligible_assessment_has_no_suggestions() {
        let assessment = assess(
            Scores {
                gpa: 3.9,
                ielts: 8.0,
            },
            requirements(),
        );
        assert!(assessment.eligible);
        assert_eq!(assessment.reasons, vec!["All requirements met".to_string()]);
        assert!(assessment.suggestions.is_empty());
    }

    #[test]
    fn snapshot_records_failure_notes() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let check = EligibilityCheck::record(
            Scores {
                gpa: 3.0,
                ielts: 7.5,
            },
            requirements(),
            at,
        );
        assert!(!check.passed);
        assert_eq!(check.notes, "Failed eligibility: GPA (3/3.5), IELTS (7.5/7)");
        assert_eq!(check.checked_at.to_chrono(), at);
    }
}
