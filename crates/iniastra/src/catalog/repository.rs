use std::future::Future;

use bson::oid::ObjectId;

use super::domain::University;
use super::stats::UniversityStats;
use crate::query::{Page, UniversityQuery};
use crate::store::RepositoryError;

/// Storage abstraction for the university catalog.
///
/// `find_active` and every listing apply the soft-delete predicate; `find_any` is the
/// only lookup that also returns deactivated records.
pub trait UniversityRepository: Send + Sync {
    fn insert(
        &self,
        university: University,
    ) -> impl Future<Output = Result<University, RepositoryError>> + Send;

    /// Overwrites the stored record with the same id.
    fn replace(
        &self,
        university: University,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn find_active(
        &self,
        id: ObjectId,
    ) -> impl Future<Output = Result<Option<University>, RepositoryError>> + Send;

    fn find_any(
        &self,
        id: ObjectId,
    ) -> impl Future<Output = Result<Option<University>, RepositoryError>> + Send;

    /// Records for the given ids, in storage order, skipping unknown ids.
    fn find_many(
        &self,
        ids: &[ObjectId],
        active_only: bool,
    ) -> impl Future<Output = Result<Vec<University>, RepositoryError>> + Send;

    fn list(
        &self,
        query: &UniversityQuery,
    ) -> impl Future<Output = Result<Page<University>, RepositoryError>> + Send;

    /// Other active universities in the same country offering the same degree level.
    fn similar(
        &self,
        university: &University,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<University>, RepositoryError>> + Send;

    fn stats(&self) -> impl Future<Output = Result<UniversityStats, RepositoryError>> + Send;
}
