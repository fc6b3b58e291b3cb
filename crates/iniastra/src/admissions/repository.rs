use std::future::Future;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};

use super::domain::{Application, ReviewUpdate};
use super::stats::ApplicationAggregates;
use crate::query::{ApplicationQuery, Page};
use crate::store::RepositoryError;

/// Storage abstraction for applications. Records are never deleted.
pub trait ApplicationRepository: Send + Sync {
    fn insert(
        &self,
        application: Application,
    ) -> impl Future<Output = Result<Application, RepositoryError>> + Send;

    fn replace(
        &self,
        application: Application,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn find(
        &self,
        id: ObjectId,
    ) -> impl Future<Output = Result<Option<Application>, RepositoryError>> + Send;

    /// Applies the update in one write and returns the record as stored
    /// afterwards, or `None` when the id is unknown. Concurrent updates never
    /// drop each other's history entries or notes.
    fn apply_review(
        &self,
        id: ObjectId,
        update: &ReviewUpdate,
    ) -> impl Future<Output = Result<Option<Application>, RepositoryError>> + Send;

    /// Any application for the pair created at or after `since`.
    fn find_recent(
        &self,
        email: &str,
        university_id: ObjectId,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<Application>, RepositoryError>> + Send;

    fn list(
        &self,
        query: &ApplicationQuery,
    ) -> impl Future<Output = Result<Page<Application>, RepositoryError>> + Send;

    /// Every application for the email, newest first.
    fn by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Vec<Application>, RepositoryError>> + Send;

    fn count_for_university(
        &self,
        university_id: ObjectId,
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send;

    fn stats(&self) -> impl Future<Output = Result<ApplicationAggregates, RepositoryError>> + Send;
}
