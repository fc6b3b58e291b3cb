use bson::oid::ObjectId;
use serde::Deserialize;

use super::domain::{
    AcademicBackground, Address, ApplicantDetails, ApplicationStatus, GreScore, WorkExperience,
};
use super::service::AdmissionsError;
use crate::query::{lenient_f64, parse_object_id, parse_timestamp};
use crate::validate::{check_max_chars, looks_like_email, trimmed};

pub const MISSING_SUBMISSION_FIELDS: &str =
    "Please provide all required fields: studentName, email, gpa, ielts, universityId";
pub const MISSING_STATUS: &str = "Status is required";
pub const MISSING_REVIEWER: &str = "Reviewer ID is required";
pub const MISSING_NOTE: &str = "Note and reviewer name are required";

/// Public application form body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSubmission {
    pub student_name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub gpa: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ielts: Option<f64>,
    pub university_id: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<Address>,
    pub gre_score: Option<GreScore>,
    pub academic_background: Option<AcademicBackground>,
    pub work_experience: Option<Vec<WorkExperience>>,
    pub statement_of_purpose: Option<String>,
    pub program_applied: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub application_fee: Option<f64>,
}

/// Submission that passed field validation; business rules still apply.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSubmission {
    pub student_name: String,
    pub email: String,
    pub gpa: f64,
    pub ielts: f64,
    pub university_id: ObjectId,
    pub details: ApplicantDetails,
}

pub fn validate_submission(
    submission: ApplicationSubmission,
) -> Result<ValidSubmission, AdmissionsError> {
    let (Some(student_name), Some(email), Some(gpa), Some(ielts), Some(university_id)) = (
        trimmed(submission.student_name),
        trimmed(submission.email),
        submission.gpa,
        submission.ielts,
        trimmed(submission.university_id),
    ) else {
        return Err(AdmissionsError::MissingFields(MISSING_SUBMISSION_FIELDS));
    };

    let mut errors = Vec::new();
    check_max_chars(
        &mut errors,
        Some(&student_name),
        100,
        "Student name cannot exceed 100 characters",
    );

    let email = email.to_lowercase();
    if !looks_like_email(&email) {
        errors.push("Please enter a valid email".to_string());
    }

    if gpa < 0.0 {
        errors.push("GPA cannot be negative".to_string());
    } else if gpa > 4.0 {
        errors.push("GPA cannot exceed 4.0".to_string());
    }
    if ielts < 0.0 {
        errors.push("IELTS score cannot be negative".to_string());
    } else if ielts > 9.0 {
        errors.push("IELTS score cannot exceed 9".to_string());
    }

    check_max_chars(
        &mut errors,
        submission.statement_of_purpose.as_deref(),
        2000,
        "Statement of purpose cannot exceed 2000 characters",
    );

    let date_of_birth = match trimmed(submission.date_of_birth) {
        None => None,
        Some(raw) => match parse_timestamp(&raw) {
            Some(date) => Some(bson::DateTime::from_chrono(date)),
            None => {
                errors.push("Date of birth must be a valid date".to_string());
                None
            }
        },
    };

    let application_fee = submission.application_fee.unwrap_or(0.0);
    if application_fee < 0.0 {
        errors.push("Application fee cannot be negative".to_string());
    }

    if !errors.is_empty() {
        return Err(AdmissionsError::Invalid(errors));
    }

    let university_id =
        parse_object_id(&university_id).ok_or(AdmissionsError::InvalidId("university"))?;

    Ok(ValidSubmission {
        student_name,
        email,
        gpa,
        ielts,
        university_id,
        details: ApplicantDetails {
            phone: trimmed(submission.phone),
            date_of_birth,
            address: submission.address,
            gre_score: submission.gre_score,
            academic_background: submission.academic_background,
            work_experience: submission.work_experience.unwrap_or_default(),
            statement_of_purpose: submission.statement_of_purpose,
            program_applied: trimmed(submission.program_applied),
            application_fee,
        },
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
    pub notes: Option<String>,
}

impl StatusUpdate {
    pub fn validate(self) -> Result<(ApplicationStatus, Option<String>), AdmissionsError> {
        let raw = trimmed(self.status).ok_or(AdmissionsError::MissingFields(MISSING_STATUS))?;
        let status = ApplicationStatus::parse(&raw).ok_or_else(|| {
            AdmissionsError::Invalid(vec![
                "Status must be one of: submitted, under_review, shortlisted, accepted, rejected, waitlisted"
                    .to_string(),
            ])
        })?;
        Ok((status, trimmed(self.notes)))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub assigned_to: Option<String>,
}

impl AssignRequest {
    pub fn validate(self) -> Result<ObjectId, AdmissionsError> {
        let raw =
            trimmed(self.assigned_to).ok_or(AdmissionsError::MissingFields(MISSING_REVIEWER))?;
        parse_object_id(&raw).ok_or(AdmissionsError::InvalidId("reviewer"))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteRequest {
    pub note: Option<String>,
    pub reviewer: Option<String>,
}

impl NoteRequest {
    pub fn validate(self) -> Result<(String, String), AdmissionsError> {
        match (trimmed(self.note), trimmed(self.reviewer)) {
            (Some(note), Some(reviewer)) => Ok((note, reviewer)),
            _ => Err(AdmissionsError::MissingFields(MISSING_NOTE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> ApplicationSubmission {
        ApplicationSubmission {
            student_name: Some("Sam Student".into()),
            email: Some("Sam@Example.com".into()),
            gpa: Some(3.6),
            ielts: Some(7.5),
            university_id: Some(ObjectId::new().to_hex()),
            ..ApplicationSubmission::default()
        }
    }

    #[test]
    fn missing_required_fields_use_the_combined_message() {
        let result = validate_submission(ApplicationSubmission {
            gpa: None,
            ..submission()
        });
        assert!(matches!(
            result,
            Err(AdmissionsError::MissingFields(MISSING_SUBMISSION_FIELDS))
        ));
    }

    #[test]
    fn normalises_email_and_defaults_fee() {
        let valid = validate_submission(submission()).expect("valid submission");
        assert_eq!(valid.email, "sam@example.com");
        assert_eq!(valid.details.application_fee, 0.0);
        assert!(valid.details.work_experience.is_empty());
    }

    #[test]
    fn out_of_range_scores_are_field_errors() {
        let result = validate_submission(ApplicationSubmission {
            gpa: Some(4.2),
            ielts: Some(-0.5),
            ..submission()
        });
        match result {
            Err(AdmissionsError::Invalid(errors)) => assert_eq!(
                errors,
                vec![
                    "GPA cannot exceed 4.0".to_string(),
                    "IELTS score cannot be negative".to_string(),
                ]
            ),
            other => panic!("expected field errors, got {other:?}"),
        }
    }

    #[test]
    fn malformed_university_id_is_rejected() {
        let result = validate_submission(ApplicationSubmission {
            university_id: Some("harvard".into()),
            ..submission()
        });
        assert!(matches!(result, Err(AdmissionsError::InvalidId("university"))));
    }

    #[test]
    fn status_updates_require_a_known_status() {
        assert!(matches!(
            StatusUpdate::default().validate(),
            Err(AdmissionsError::MissingFields(MISSING_STATUS))
        ));
        assert!(matches!(
            StatusUpdate {
                status: Some("pending".into()),
                notes: None
            }
            .validate(),
            Err(AdmissionsError::Invalid(_))
        ));
        let (status, notes) = StatusUpdate {
            status: Some("accepted".into()),
            notes: Some("Strong profile".into()),
        }
        .validate()
        .expect("valid status");
        assert_eq!(status, ApplicationStatus::Accepted);
        assert_eq!(notes.as_deref(), Some("Strong profile"));
    }

    #[test]
    fn notes_need_both_fields() {
        assert!(NoteRequest {
            note: Some("Looks good".into()),
            reviewer: None
        }
        .validate()
        .is_err());
    }
}
