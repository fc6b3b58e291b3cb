use std::sync::Arc;

use bson::oid::ObjectId;
use serde::Deserialize;
use tracing::info;

use super::domain::University;
use super::repository::UniversityRepository;
use super::stats::UniversityStats;
use super::validation::{apply_update, build_university, UniversityPayload};
use super::views::EligibilityView;
use crate::admissions::ApplicationRepository;
use crate::clock::Clock;
use crate::eligibility::{assess, Scores};
use crate::query::{lenient_f64, parse_object_id, Page, UniversityQuery};
use crate::store::RepositoryError;

pub const MAX_COMPARED: usize = 5;
pub const SIMILAR_LIMIT: usize = 3;

/// Body of `POST /api/universities/:id/check-eligibility`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EligibilityRequest {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub gpa: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ielts: Option<f64>,
}

/// University with its joined application count and similar universities.
#[derive(Debug, Clone, PartialEq)]
pub struct UniversityDetail {
    pub university: University,
    pub application_count: u64,
    pub similar: Vec<University>,
}

/// Catalog operations over the university and application repositories.
pub struct CatalogService<U, A> {
    universities: Arc<U>,
    applications: Arc<A>,
    clock: Arc<dyn Clock>,
}

impl<U, A> CatalogService<U, A>
where
    U: UniversityRepository + 'static,
    A: ApplicationRepository + 'static,
{
    pub fn new(universities: Arc<U>, applications: Arc<A>, clock: Arc<dyn Clock>) -> Self {
        Self {
            universities,
            applications,
            clock,
        }
    }

    pub async fn list(&self, query: UniversityQuery) -> Result<Page<University>, CatalogError> {
        if !query.filter.is_satisfiable() {
            return Ok(Page::empty(query.pagination));
        }
        Ok(self.universities.list(&query).await?)
    }

    pub async fn get(&self, id: &str) -> Result<UniversityDetail, CatalogError> {
        let university = self.active(id).await?;
        let application_count = self
            .applications
            .count_for_university(university.id)
            .await?;
        let similar = self.universities.similar(&university, SIMILAR_LIMIT).await?;

        Ok(UniversityDetail {
            university,
            application_count,
            similar,
        })
    }

    pub async fn create(&self, payload: UniversityPayload) -> Result<University, CatalogError> {
        let university =
            build_university(payload, self.clock.now()).map_err(CatalogError::Invalid)?;
        let stored = self.universities.insert(university).await?;
        info!(university_id = %stored.id, name = %stored.name, "university created");
        Ok(stored)
    }

    pub async fn update(
        &self,
        id: &str,
        payload: UniversityPayload,
    ) -> Result<University, CatalogError> {
        let existing = self.active(id).await?;
        let updated =
            apply_update(&existing, payload, self.clock.now()).map_err(CatalogError::Invalid)?;
        self.universities.replace(updated.clone()).await?;
        info!(university_id = %updated.id, "university updated");
        Ok(updated)
    }

    /// Soft delete: the record stays so historical applications keep resolving it.
    pub async fn deactivate(&self, id: &str) -> Result<(), CatalogError> {
        let mut university = self.active(id).await?;
        university.is_active = false;
        university.updated_at = bson::DateTime::from_chrono(self.clock.now());
        self.universities.replace(university).await?;
        info!(university_id = %id, "university deactivated");
        Ok(())
    }

    /// Uses at most the first five ids; unknown, inactive, or malformed ids are skipped.
    pub async fn compare(&self, ids: Option<&str>) -> Result<Vec<University>, CatalogError> {
        let raw = ids
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .ok_or(CatalogError::MissingComparisonIds)?;

        let ids: Vec<ObjectId> = raw
            .split(',')
            .take(MAX_COMPARED)
            .filter_map(parse_object_id)
            .collect();

        let universities = if ids.is_empty() {
            Vec::new()
        } else {
            self.universities.find_many(&ids, true).await?
        };

        if universities.len() < 2 {
            return Err(CatalogError::NotEnoughToCompare);
        }
        Ok(universities)
    }

    pub async fn check_eligibility(
        &self,
        id: &str,
        request: EligibilityRequest,
    ) -> Result<EligibilityView, CatalogError> {
        let university = self.active(id).await?;
        let (Some(gpa), Some(ielts)) = (request.gpa, request.ielts) else {
            return Err(CatalogError::Invalid(vec![
                "GPA and IELTS scores are required".to_string(),
            ]));
        };

        let scores = Scores { gpa, ielts };
        let assessment = assess(scores, university.requirements());
        Ok(EligibilityView::new(&university, scores, assessment))
    }

    pub async fn stats(&self) -> Result<UniversityStats, CatalogError> {
        Ok(self.universities.stats().await?)
    }

    async fn active(&self, id: &str) -> Result<University, CatalogError> {
        let id = parse_object_id(id).ok_or(CatalogError::InvalidId)?;
        self.universities
            .find_active(id)
            .await?
            .ok_or(CatalogError::NotFound)
    }
}

/// Error type for catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid university id")]
    InvalidId,
    #[error("university not found")]
    NotFound,
    #[error("university failed validation: {}", .0.join(", "))]
    Invalid(Vec<String>),
    #[error("university ids are required for comparison")]
    MissingComparisonIds,
    #[error("at least 2 universities are required for comparison")]
    NotEnoughToCompare,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
