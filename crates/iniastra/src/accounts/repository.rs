use std::future::Future;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};

use super::domain::User;
use crate::store::RepositoryError;

/// Storage abstraction for staff accounts. Email is unique; writes that would
/// duplicate one fail with `RepositoryError::Conflict`.
pub trait UserRepository: Send + Sync {
    fn insert(&self, user: User) -> impl Future<Output = Result<User, RepositoryError>> + Send;

    fn replace(&self, user: User) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn find(
        &self,
        id: ObjectId,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// User holding this reset digest whose expiry is still after `now`.
    fn find_by_reset_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    fn find_many(
        &self,
        ids: &[ObjectId],
    ) -> impl Future<Output = Result<Vec<User>, RepositoryError>> + Send;

    /// Every account, newest first.
    fn list(&self) -> impl Future<Output = Result<Vec<User>, RepositoryError>> + Send;
}
