//! Application intake and the staff review workflow.
//!
//! Submissions pass field validation, an active-university check, a 30-day
//! duplicate guard, and the eligibility gate before they are stored. Staff then
//! move them through the status workflow, assign reviewers, and append notes.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod stats;
pub mod validation;
pub mod views;

#[cfg(test)]
mod tests;

pub use domain::{
    AcademicBackground, Address, ApplicantDetails, Application, ApplicationStatus, GreScore,
    ReviewNote, ReviewUpdate, StatusChange, WorkExperience,
};
pub use repository::ApplicationRepository;
pub use router::application_router;
pub use service::{AdmissionsError, AdmissionsService, ApplicationDetail};
pub use stats::{ApplicationAggregates, ApplicationOverview, ApplicationStats, MonthBucket};
pub use validation::{ApplicationSubmission, AssignRequest, NoteRequest, StatusUpdate};
pub use views::{ApplicationView, IneligibleSubmission};
