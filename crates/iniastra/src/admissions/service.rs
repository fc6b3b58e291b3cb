use std::collections::BTreeSet;
use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::Duration;
use tracing::{info, warn};

use super::domain::{Application, ApplicationStatus, ReviewNote, ReviewUpdate, StatusChange};
use super::repository::ApplicationRepository;
use super::stats::{ApplicationStats, UniversityBucket};
use super::validation::{
    validate_submission, ApplicationSubmission, AssignRequest, NoteRequest, StatusUpdate,
};
use super::views::{ApplicationView, IneligibleSubmission};
use crate::accounts::{User, UserRepository};
use crate::catalog::{University, UniversityRepository};
use crate::clock::Clock;
use crate::eligibility::{is_eligible, EligibilityCheck, Scores, SUBMISSION_SUGGESTIONS};
use crate::query::{parse_object_id, ApplicationFilter, ApplicationQuery, Page};
use crate::store::RepositoryError;

pub const DUPLICATE_WINDOW_DAYS: i64 = 30;
pub const SUBMITTED_NOTE: &str = "Application submitted";

/// Application with its university and reviewer joined in.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationDetail {
    pub application: Application,
    pub university: Option<University>,
    pub assignee: Option<User>,
}

impl ApplicationDetail {
    pub fn view(&self) -> ApplicationView {
        ApplicationView::new(
            &self.application,
            self.university.as_ref(),
            self.assignee.as_ref(),
        )
    }
}

/// Intake and review workflow over the application, university, and user stores.
pub struct AdmissionsService<A, U, Us> {
    applications: Arc<A>,
    universities: Arc<U>,
    users: Arc<Us>,
    clock: Arc<dyn Clock>,
}

impl<A, U, Us> AdmissionsService<A, U, Us>
where
    A: ApplicationRepository + 'static,
    U: UniversityRepository + 'static,
    Us: UserRepository + 'static,
{
    pub fn new(
        applications: Arc<A>,
        universities: Arc<U>,
        users: Arc<Us>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            applications,
            universities,
            users,
            clock,
        }
    }

    /// Field checks, then the active university, the 30-day duplicate guard, and the
    /// eligibility gate, in that order. Only eligible submissions are stored.
    pub async fn submit(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<ApplicationDetail, AdmissionsError> {
        let submission = validate_submission(submission)?;
        let university = self
            .universities
            .find_active(submission.university_id)
            .await?
            .ok_or(AdmissionsError::UniversityNotFound)?;

        let now = self.clock.now();
        let since = now - Duration::days(DUPLICATE_WINDOW_DAYS);
        if self
            .applications
            .find_recent(&submission.email, university.id, since)
            .await?
            .is_some()
        {
            warn!(university_id = %university.id, "duplicate application rejected");
            return Err(AdmissionsError::Duplicate);
        }

        let scores = Scores {
            gpa: submission.gpa,
            ielts: submission.ielts,
        };
        let requirements = university.requirements();
        if !is_eligible(scores, requirements) {
            return Err(AdmissionsError::Ineligible(IneligibleSubmission {
                student_gpa: scores.gpa,
                required_gpa: requirements.min_gpa,
                student_ielts: scores.ielts,
                required_ielts: requirements.min_ielts,
                suggestions: SUBMISSION_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            }));
        }

        let stamp = bson::DateTime::from_chrono(now);
        let application = Application {
            id: ObjectId::new(),
            student_name: submission.student_name,
            email: submission.email,
            gpa: submission.gpa,
            ielts: submission.ielts,
            university_id: university.id,
            details: submission.details,
            status: ApplicationStatus::Submitted,
            status_history: vec![StatusChange {
                status: ApplicationStatus::Submitted,
                changed_at: stamp,
                notes: SUBMITTED_NOTE.to_string(),
            }],
            assigned_to: None,
            review_notes: Vec::new(),
            is_eligible: true,
            eligibility_check: Some(EligibilityCheck::record(scores, requirements, now)),
            decision_date: None,
            created_at: stamp,
            updated_at: stamp,
        };

        let stored = self.applications.insert(application).await?;
        info!(
            application_id = %stored.id,
            university_id = %university.id,
            "application submitted"
        );
        Ok(ApplicationDetail {
            application: stored,
            university: Some(university),
            assignee: None,
        })
    }

    pub async fn list(
        &self,
        query: ApplicationQuery,
    ) -> Result<Page<ApplicationDetail>, AdmissionsError> {
        if !query.filter.is_satisfiable() {
            return Ok(Page::empty(query.pagination));
        }
        let page = self.applications.list(&query).await?;
        let details = self.hydrate(page.items).await?;
        Ok(Page {
            items: details,
            total: page.total,
            pagination: page.pagination,
        })
    }

    pub async fn get(&self, id: &str) -> Result<ApplicationDetail, AdmissionsError> {
        let application = self.load(id).await?;
        self.hydrate_one(application).await
    }

    /// Appends exactly one history entry; accepted and rejected also stamp the decision date.
    pub async fn update_status(
        &self,
        id: &str,
        update: StatusUpdate,
    ) -> Result<ApplicationDetail, AdmissionsError> {
        let (status, notes) = update.validate()?;
        let id = parse_application_id(id)?;
        let application = self
            .applications
            .apply_review(id, &ReviewUpdate::status(status, notes, self.clock.now()))
            .await?
            .ok_or(AdmissionsError::ApplicationNotFound)?;
        info!(application_id = %application.id, status = %status, "application status changed");
        self.hydrate_one(application).await
    }

    pub async fn assign(
        &self,
        id: &str,
        request: AssignRequest,
    ) -> Result<ApplicationDetail, AdmissionsError> {
        let reviewer_id = request.validate()?;
        let application_id = self.load(id).await?.id;
        let reviewer = self
            .users
            .find(reviewer_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or(AdmissionsError::ReviewerNotFound)?;

        let update = ReviewUpdate::assignment(reviewer.id, &reviewer.name, self.clock.now());
        let application = self
            .applications
            .apply_review(application_id, &update)
            .await?
            .ok_or(AdmissionsError::ApplicationNotFound)?;
        info!(
            application_id = %application.id,
            reviewer_id = %reviewer.id,
            "application assigned"
        );

        let university = self
            .universities
            .find_any(application.university_id)
            .await?;
        Ok(ApplicationDetail {
            application,
            university,
            assignee: Some(reviewer),
        })
    }

    pub async fn add_note(
        &self,
        id: &str,
        request: NoteRequest,
    ) -> Result<Vec<ReviewNote>, AdmissionsError> {
        let (note, reviewer) = request.validate()?;
        let id = parse_application_id(id)?;
        let application = self
            .applications
            .apply_review(id, &ReviewUpdate::note(note, reviewer, self.clock.now()))
            .await?
            .ok_or(AdmissionsError::ApplicationNotFound)?;
        Ok(application.review_notes)
    }

    pub async fn stats(&self) -> Result<ApplicationStats, AdmissionsError> {
        let aggregates = self.applications.stats().await?;
        let ids: Vec<ObjectId> = aggregates
            .by_university
            .iter()
            .map(|tally| tally.university_id)
            .collect();
        let universities = if ids.is_empty() {
            Vec::new()
        } else {
            self.universities.find_many(&ids, false).await?
        };

        Ok(ApplicationStats {
            overview: aggregates.overview,
            by_status: aggregates.by_status,
            by_university: aggregates
                .by_university
                .iter()
                .map(|tally| UniversityBucket::join(tally, &universities))
                .collect(),
            monthly_trend: aggregates.monthly_trend,
        })
    }

    /// A student's own applications, newest first.
    pub async fn by_student(&self, email: &str) -> Result<Vec<ApplicationDetail>, AdmissionsError> {
        let filter = ApplicationFilter::for_student(email);
        let Some(email) = filter.email.as_deref().filter(|email| !email.is_empty()) else {
            return Ok(Vec::new());
        };
        let applications = self.applications.by_email(email).await?;
        self.hydrate(applications).await
    }

    async fn load(&self, id: &str) -> Result<Application, AdmissionsError> {
        let id = parse_application_id(id)?;
        self.applications
            .find(id)
            .await?
            .ok_or(AdmissionsError::ApplicationNotFound)
    }

    async fn hydrate_one(
        &self,
        application: Application,
    ) -> Result<ApplicationDetail, AdmissionsError> {
        let mut details = self.hydrate(vec![application]).await?;
        details.pop().ok_or(AdmissionsError::ApplicationNotFound)
    }

    /// Resolves universities (including deactivated ones) and reviewers in two batch lookups.
    async fn hydrate(
        &self,
        applications: Vec<Application>,
    ) -> Result<Vec<ApplicationDetail>, AdmissionsError> {
        let university_ids: Vec<ObjectId> = applications
            .iter()
            .map(|application| application.university_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let reviewer_ids: Vec<ObjectId> = applications
            .iter()
            .filter_map(|application| application.assigned_to)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let universities = if university_ids.is_empty() {
            Vec::new()
        } else {
            self.universities.find_many(&university_ids, false).await?
        };
        let reviewers = if reviewer_ids.is_empty() {
            Vec::new()
        } else {
            self.users.find_many(&reviewer_ids).await?
        };

        Ok(applications
            .into_iter()
            .map(|application| {
                let university = universities
                    .iter()
                    .find(|university| university.id == application.university_id)
                    .cloned();
                let assignee = application.assigned_to.and_then(|reviewer_id| {
                    reviewers
                        .iter()
                        .find(|user| user.id == reviewer_id)
                        .cloned()
                });
                ApplicationDetail {
                    application,
                    university,
                    assignee,
                }
            })
            .collect())
    }
}

/// Error type for intake and review operations.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionsError {
    #[error("invalid {0} id")]
    InvalidId(&'static str),
    #[error("{0}")]
    MissingFields(&'static str),
    #[error("application failed validation: {}", .0.join(", "))]
    Invalid(Vec<String>),
    #[error("application not found")]
    ApplicationNotFound,
    #[error("university not found")]
    UniversityNotFound,
    #[error("reviewer not found")]
    ReviewerNotFound,
    #[error("an application for this university was submitted within the last 30 days")]
    Duplicate,
    #[error("applicant does not meet the university's requirements")]
    Ineligible(IneligibleSubmission),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn parse_application_id(id: &str) -> Result<ObjectId, AdmissionsError> {
    parse_object_id(id).ok_or(AdmissionsError::InvalidId("application"))
}
