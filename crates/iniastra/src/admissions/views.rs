use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    AcademicBackground, Address, Application, ApplicationStatus, GreScore, ReviewNote,
    StatusChange, WorkExperience,
};
use crate::accounts::{Role, User};
use crate::catalog::{DegreeLevel, University};
use crate::eligibility::EligibilityCheck;

/// Joined university fields shown alongside an application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversitySummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub country: String,
    pub degree_level: DegreeLevel,
    #[serde(rename = "minGPA")]
    pub min_gpa: f64,
    #[serde(rename = "minIELTS")]
    pub min_ielts: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl From<&University> for UniversitySummary {
    fn from(university: &University) -> Self {
        Self {
            id: university.id.to_hex(),
            name: university.name.clone(),
            country: university.country.clone(),
            degree_level: university.degree_level,
            min_gpa: university.min_gpa,
            min_ielts: university.min_ielts,
            logo_url: university.logo_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssigneeSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// The joined reviewer, or the bare id when the account no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Assignee {
    User(AssigneeSummary),
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeView {
    pub status: ApplicationStatus,
    pub changed_at: DateTime<Utc>,
    pub notes: String,
}

impl From<&StatusChange> for StatusChangeView {
    fn from(change: &StatusChange) -> Self {
        Self {
            status: change.status,
            changed_at: change.changed_at.to_chrono(),
            notes: change.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewNoteView {
    pub note: String,
    pub reviewer: String,
    pub created_at: DateTime<Utc>,
}

impl From<&ReviewNote> for ReviewNoteView {
    fn from(note: &ReviewNote) -> Self {
        Self {
            note: note.note.clone(),
            reviewer: note.reviewer.clone(),
            created_at: note.created_at.to_chrono(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityCheckView {
    pub passed: bool,
    pub checked_at: DateTime<Utc>,
    pub notes: String,
}

impl From<&EligibilityCheck> for EligibilityCheckView {
    fn from(check: &EligibilityCheck) -> Self {
        Self {
            passed: check.passed,
            checked_at: check.checked_at.to_chrono(),
            notes: check.notes.clone(),
        }
    }
}

/// Application as returned by the API, with its joins resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationView {
    #[serde(rename = "_id")]
    pub id: String,
    pub student_name: String,
    pub email: String,
    pub gpa: f64,
    pub ielts: f64,
    pub university_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub university: Option<UniversitySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gre_score: Option<GreScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_background: Option<AcademicBackground>,
    pub work_experience: Vec<WorkExperience>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_of_purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_applied: Option<String>,
    pub application_fee: f64,
    pub status: ApplicationStatus,
    pub status_history: Vec<StatusChangeView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Assignee>,
    pub review_notes: Vec<ReviewNoteView>,
    pub is_eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligibility_check: Option<EligibilityCheckView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationView {
    pub fn new(
        application: &Application,
        university: Option<&University>,
        assignee: Option<&User>,
    ) -> Self {
        let details = &application.details;
        let assigned_to = application.assigned_to.map(|id| match assignee {
            Some(user) if user.id == id => Assignee::User(AssigneeSummary {
                id: user.id.to_hex(),
                name: user.name.clone(),
                email: user.email.clone(),
                role: user.role,
            }),
            _ => Assignee::Id(id.to_hex()),
        });

        Self {
            id: application.id.to_hex(),
            student_name: application.student_name.clone(),
            email: application.email.clone(),
            gpa: application.gpa,
            ielts: application.ielts,
            university_id: application.university_id.to_hex(),
            university: university.map(UniversitySummary::from),
            phone: details.phone.clone(),
            date_of_birth: details.date_of_birth.map(|date| date.to_chrono()),
            address: details.address.clone(),
            gre_score: details.gre_score.clone(),
            academic_background: details.academic_background.clone(),
            work_experience: details.work_experience.clone(),
            statement_of_purpose: details.statement_of_purpose.clone(),
            program_applied: details.program_applied.clone(),
            application_fee: details.application_fee,
            status: application.status,
            status_history: application
                .status_history
                .iter()
                .map(StatusChangeView::from)
                .collect(),
            assigned_to,
            review_notes: application
                .review_notes
                .iter()
                .map(ReviewNoteView::from)
                .collect(),
            is_eligible: application.is_eligible,
            eligibility_check: application
                .eligibility_check
                .as_ref()
                .map(EligibilityCheckView::from),
            decision_date: application.decision_date.map(|date| date.to_chrono()),
            created_at: application.created_at.to_chrono(),
            updated_at: application.updated_at.to_chrono(),
        }
    }
}

/// Review notes after appending one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewNotesView {
    pub notes: Vec<ReviewNoteView>,
}

/// Ineligible submission payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IneligibleSubmission {
    #[serde(rename = "studentGPA")]
    pub student_gpa: f64,
    #[serde(rename = "requiredGPA")]
    pub required_gpa: f64,
    #[serde(rename = "studentIELTS")]
    pub student_ielts: f64,
    #[serde(rename = "requiredIELTS")]
    pub required_ielts: f64,
    pub suggestions: Vec<String>,
}
