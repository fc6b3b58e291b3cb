use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{DegreeLevel, IntakeSeason, University};
use crate::eligibility::{Assessment, Scores};

/// University as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityView {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub degree_level: DegreeLevel,
    pub programs: Vec<String>,
    #[serde(rename = "minGPA")]
    pub min_gpa: f64,
    #[serde(rename = "minIELTS")]
    pub min_ielts: f64,
    pub tuition_fee: f64,
    pub scholarships_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_deadline: Option<DateTime<Utc>>,
    pub intake_seasons: Vec<IntakeSeason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    pub campus_photos: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&University> for UniversityView {
    fn from(university: &University) -> Self {
        Self {
            id: university.id.to_hex(),
            name: university.name.clone(),
            country: university.country.clone(),
            city: university.city.clone(),
            description: university.description.clone(),
            degree_level: university.degree_level,
            programs: university.programs.clone(),
            min_gpa: university.min_gpa,
            min_ielts: university.min_ielts,
            tuition_fee: university.tuition_fee,
            scholarships_available: university.scholarships_available,
            application_deadline: university.application_deadline.map(|d| d.to_chrono()),
            intake_seasons: university.intake_seasons.clone(),
            ranking: university.ranking,
            website: university.website.clone(),
            contact_email: university.contact_email.clone(),
            logo_url: university.logo_url.clone(),
            campus_photos: university.campus_photos.clone(),
            is_active: university.is_active,
            created_at: university.created_at.to_chrono(),
            updated_at: university.updated_at.to_chrono(),
        }
    }
}

impl From<University> for UniversityView {
    fn from(university: University) -> Self {
        Self::from(&university)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarUniversityView {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub country: String,
    pub tuition_fee: f64,
    #[serde(rename = "minGPA")]
    pub min_gpa: f64,
    #[serde(rename = "minIELTS")]
    pub min_ielts: f64,
}

impl From<&University> for SimilarUniversityView {
    fn from(university: &University) -> Self {
        Self {
            id: university.id.to_hex(),
            name: university.name.clone(),
            country: university.country.clone(),
            tuition_fee: university.tuition_fee,
            min_gpa: university.min_gpa,
            min_ielts: university.min_ielts,
        }
    }
}

/// Single-university response with its joined application count and neighbours.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityDetailView {
    #[serde(flatten)]
    pub university: UniversityView,
    pub application_count: u64,
    pub similar_universities: Vec<SimilarUniversityView>,
}

/// Side-by-side comparison row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonView {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub country: String,
    pub degree_level: DegreeLevel,
    #[serde(rename = "minGPA")]
    pub min_gpa: f64,
    #[serde(rename = "minIELTS")]
    pub min_ielts: f64,
    pub tuition_fee: f64,
    pub programs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&University> for ComparisonView {
    fn from(university: &University) -> Self {
        Self {
            id: university.id.to_hex(),
            name: university.name.clone(),
            country: university.country.clone(),
            degree_level: university.degree_level,
            min_gpa: university.min_gpa,
            min_ielts: university.min_ielts,
            tuition_fee: university.tuition_fee,
            programs: university.programs.clone(),
            ranking: university.ranking,
            website: university.website.clone(),
            description: university.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementSummary {
    pub name: String,
    #[serde(rename = "minGPA")]
    pub min_gpa: f64,
    #[serde(rename = "minIELTS")]
    pub min_ielts: f64,
}

/// Standalone eligibility check response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityView {
    pub is_eligible: bool,
    pub university: RequirementSummary,
    pub student: Scores,
    pub reasons: Vec<String>,
    pub suggestions: Vec<String>,
}

impl EligibilityView {
    pub fn new(university: &University, student: Scores, assessment: Assessment) -> Self {
        Self {
            is_eligible: assessment.eligible,
            university: RequirementSummary {
                name: university.name.clone(),
                min_gpa: university.min_gpa,
                min_ielts: university.min_ielts,
            },
            student,
            reasons: assessment.reasons,
            suggestions: assessment.suggestions,
        }
    }
}
