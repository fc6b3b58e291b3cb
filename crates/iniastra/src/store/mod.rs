//! Storage adapters behind the per-domain repository traits.
//!
//! `mongo` is the production backend; `memory` backs tests and `serve --in-memory`.

pub mod memory;
pub mod mongo;

use std::sync::Arc;

pub use memory::{MemoryApplicationRepository, MemoryUniversityRepository, MemoryUserRepository};
pub use mongo::{MongoApplicationRepository, MongoStore, MongoUniversityRepository, MongoUserRepository};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Backend(#[from] mongodb::error::Error),
    #[error("stored document could not be decoded: {0}")]
    Decode(#[from] bson::de::Error),
    #[error("record could not be encoded: {0}")]
    Encode(#[from] bson::ser::Error),
}

/// The three collections handed to the services, one handle each.
pub struct Repositories<U, A, Us> {
    pub universities: Arc<U>,
    pub applications: Arc<A>,
    pub users: Arc<Us>,
}

impl<U, A, Us> Clone for Repositories<U, A, Us> {
    fn clone(&self) -> Self {
        Self {
            universities: Arc::clone(&self.universities),
            applications: Arc::clone(&self.applications),
            users: Arc::clone(&self.users),
        }
    }
}

impl Repositories<MemoryUniversityRepository, MemoryApplicationRepository, MemoryUserRepository> {
    pub fn in_memory() -> Self {
        Self {
            universities: Arc::new(MemoryUniversityRepository::default()),
            applications: Arc::new(MemoryApplicationRepository::default()),
            users: Arc::new(MemoryUserRepository::default()),
        }
    }
}
