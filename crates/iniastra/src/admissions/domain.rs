use std::fmt;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::eligibility::{EligibilityCheck, Scores};

/// Review status. A flat enum: any value may be set at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    Shortlisted,
    Accepted,
    Rejected,
    Waitlisted,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 6] = [
        ApplicationStatus::Submitted,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
        ApplicationStatus::Waitlisted,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Waitlisted => "waitlisted",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|status| status.label() == raw)
    }

    /// Accepted and rejected are final decisions and stamp `decision_date`.
    pub const fn is_decision(self) -> bool {
        matches!(self, ApplicationStatus::Accepted | ApplicationStatus::Rejected)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Append-only audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: ApplicationStatus,
    pub changed_at: bson::DateTime,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewNote {
    pub note: String,
    pub reviewer: String,
    pub created_at: bson::DateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GreScore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantitative: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytical: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicBackground {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_of_completion: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkExperience {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Optional applicant details captured by the intake form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantDetails {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<bson::DateTime>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub gre_score: Option<GreScore>,
    #[serde(default)]
    pub academic_background: Option<AcademicBackground>,
    #[serde(default)]
    pub work_experience: Vec<WorkExperience>,
    #[serde(default)]
    pub statement_of_purpose: Option<String>,
    #[serde(default)]
    pub program_applied: Option<String>,
    #[serde(default)]
    pub application_fee: f64,
}

/// Stored application document. Never hard-deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub student_name: String,
    pub email: String,
    pub gpa: f64,
    pub ielts: f64,
    pub university_id: ObjectId,
    #[serde(flatten)]
    pub details: ApplicantDetails,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub status_history: Vec<StatusChange>,
    #[serde(default)]
    pub assigned_to: Option<ObjectId>,
    #[serde(default)]
    pub review_notes: Vec<ReviewNote>,
    pub is_eligible: bool,
    #[serde(default)]
    pub eligibility_check: Option<EligibilityCheck>,
    #[serde(default)]
    pub decision_date: Option<bson::DateTime>,
    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
}

impl Application {
    pub fn scores(&self) -> Scores {
        Scores {
            gpa: self.gpa,
            ielts: self.ielts,
        }
    }

    /// Applies a review change in place, the way the stores do under one write.
    pub fn apply_review(&mut self, update: &ReviewUpdate) {
        if let Some(change) = &update.status_change {
            self.status = change.status;
            self.status_history.push(change.clone());
        }
        if let Some(decided) = update.decision_date {
            self.decision_date = Some(decided);
        }
        if let Some(reviewer) = update.assigned_to {
            self.assigned_to = Some(reviewer);
        }
        if let Some(note) = &update.note {
            self.review_notes.push(note.clone());
        }
        self.updated_at = update.at;
    }
}

/// One reviewer action against an application. Stores apply it atomically:
/// scalar fields are set and the history and note logs are appended, never
/// rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewUpdate {
    pub status_change: Option<StatusChange>,
    pub decision_date: Option<bson::DateTime>,
    pub assigned_to: Option<ObjectId>,
    pub note: Option<ReviewNote>,
    pub at: bson::DateTime,
}

impl ReviewUpdate {
    fn empty(at: DateTime<Utc>) -> Self {
        Self {
            status_change: None,
            decision_date: None,
            assigned_to: None,
            note: None,
            at: bson::DateTime::from_chrono(at),
        }
    }

    /// One history entry; accepted and rejected also stamp the decision date.
    pub fn status(status: ApplicationStatus, notes: Option<String>, at: DateTime<Utc>) -> Self {
        let mut update = Self::empty(at);
        update.status_change = Some(StatusChange {
            status,
            changed_at: update.at,
            notes: notes.unwrap_or_else(|| format!("Status changed to {status}")),
        });
        if status.is_decision() {
            update.decision_date = Some(update.at);
        }
        update
    }

    /// Hands the application to a reviewer, which puts it under review.
    pub fn assignment(reviewer_id: ObjectId, reviewer_name: &str, at: DateTime<Utc>) -> Self {
        let mut update = Self::status(
            ApplicationStatus::UnderReview,
            Some(format!("Assigned to reviewer {reviewer_name}")),
            at,
        );
        update.assigned_to = Some(reviewer_id);
        update
    }

    pub fn note(note: String, reviewer: String, at: DateTime<Utc>) -> Self {
        let mut update = Self::empty(at);
        update.note = Some(ReviewNote {
            note,
            reviewer,
            created_at: update.at,
        });
        update
    }
}
