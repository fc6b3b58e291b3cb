use std::sync::{Arc, Mutex, MutexGuard};

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};

use super::RepositoryError;
use crate::accounts::{User, UserRepository};
use crate::admissions::{Application, ApplicationAggregates, ApplicationRepository, ReviewUpdate};
use crate::catalog::{University, UniversityRepository, UniversityStats};
use crate::query::{ApplicationQuery, Page, UniversityQuery};

fn lock<T>(records: &Mutex<Vec<T>>) -> Result<MutexGuard<'_, Vec<T>>, RepositoryError> {
    records
        .lock()
        .map_err(|_| RepositoryError::Unavailable("memory store lock poisoned".to_string()))
}

/// Process-local university store; records keep insertion order.
#[derive(Debug, Default, Clone)]
pub struct MemoryUniversityRepository {
    records: Arc<Mutex<Vec<University>>>,
}

impl UniversityRepository for MemoryUniversityRepository {
    async fn insert(&self, university: University) -> Result<University, RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.iter().any(|existing| existing.id == university.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(university.clone());
        Ok(university)
    }

    async fn replace(&self, university: University) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records)?;
        let slot = guard
            .iter_mut()
            .find(|existing| existing.id == university.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = university;
        Ok(())
    }

    async fn find_active(&self, id: ObjectId) -> Result<Option<University>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard
            .iter()
            .find(|university| university.id == id && university.is_active)
            .cloned())
    }

    async fn find_any(&self, id: ObjectId) -> Result<Option<University>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard.iter().find(|university| university.id == id).cloned())
    }

    async fn find_many(
        &self,
        ids: &[ObjectId],
        active_only: bool,
    ) -> Result<Vec<University>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard
            .iter()
            .filter(|university| ids.contains(&university.id))
            .filter(|university| !active_only || university.is_active)
            .cloned()
            .collect())
    }

    async fn list(&self, query: &UniversityQuery) -> Result<Page<University>, RepositoryError> {
        let mut matching: Vec<University> = {
            let guard = lock(&self.records)?;
            guard
                .iter()
                .filter(|university| query.filter.matches(university))
                .cloned()
                .collect()
        };
        matching.sort_by(|left, right| query.sort.compare(left, right));
        Ok(Page::from_sorted(matching, query.pagination))
    }

    async fn similar(
        &self,
        university: &University,
        limit: usize,
    ) -> Result<Vec<University>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard
            .iter()
            .filter(|candidate| {
                candidate.is_active
                    && candidate.id != university.id
                    && candidate.country == university.country
                    && candidate.degree_level == university.degree_level
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn stats(&self) -> Result<UniversityStats, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(UniversityStats::from_records(
            guard.iter().filter(|university| university.is_active),
        ))
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryApplicationRepository {
    records: Arc<Mutex<Vec<Application>>>,
}

impl ApplicationRepository for MemoryApplicationRepository {
    async fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.iter().any(|existing| existing.id == application.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(application.clone());
        Ok(application)
    }

    async fn replace(&self, application: Application) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records)?;
        let slot = guard
            .iter_mut()
            .find(|existing| existing.id == application.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = application;
        Ok(())
    }

    async fn find(&self, id: ObjectId) -> Result<Option<Application>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard.iter().find(|application| application.id == id).cloned())
    }

    async fn apply_review(
        &self,
        id: ObjectId,
        update: &ReviewUpdate,
    ) -> Result<Option<Application>, RepositoryError> {
        let mut guard = lock(&self.records)?;
        Ok(guard
            .iter_mut()
            .find(|application| application.id == id)
            .map(|application| {
                application.apply_review(update);
                application.clone()
            }))
    }

    async fn find_recent(
        &self,
        email: &str,
        university_id: ObjectId,
        since: DateTime<Utc>,
    ) -> Result<Option<Application>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard
            .iter()
            .find(|application| {
                application.email == email
                    && application.university_id == university_id
                    && application.created_at.to_chrono() >= since
            })
            .cloned())
    }

    async fn list(&self, query: &ApplicationQuery) -> Result<Page<Application>, RepositoryError> {
        let mut matching: Vec<Application> = {
            let guard = lock(&self.records)?;
            guard
                .iter()
                .filter(|application| query.filter.matches(application))
                .cloned()
                .collect()
        };
        matching.sort_by(|left, right| query.sort.compare(left, right));
        Ok(Page::from_sorted(matching, query.pagination))
    }

    async fn by_email(&self, email: &str) -> Result<Vec<Application>, RepositoryError> {
        let mut matching: Vec<Application> = {
            let guard = lock(&self.records)?;
            guard
                .iter()
                .filter(|application| application.email == email)
                .cloned()
                .collect()
        };
        matching.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.cmp(&left.id))
        });
        Ok(matching)
    }

    async fn count_for_university(&self, university_id: ObjectId) -> Result<u64, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard
            .iter()
            .filter(|application| application.university_id == university_id)
            .count() as u64)
    }

    async fn stats(&self) -> Result<ApplicationAggregates, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(ApplicationAggregates::from_records(guard.iter()))
    }
}

/// Emails are compared as stored; callers normalise them before writing.
#[derive(Debug, Default, Clone)]
pub struct MemoryUserRepository {
    records: Arc<Mutex<Vec<User>>>,
}

impl UserRepository for MemoryUserRepository {
    async fn insert(&self, user: User) -> Result<User, RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard
            .iter()
            .any(|existing| existing.id == user.id || existing.email == user.email)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.push(user.clone());
        Ok(user)
    }

    async fn replace(&self, user: User) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard
            .iter()
            .any(|existing| existing.id != user.id && existing.email == user.email)
        {
            return Err(RepositoryError::Conflict);
        }
        let slot = guard
            .iter_mut()
            .find(|existing| existing.id == user.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = user;
        Ok(())
    }

    async fn find(&self, id: ObjectId) -> Result<Option<User>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard.iter().find(|user| user.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard.iter().find(|user| user.email == email).cloned())
    }

    async fn find_by_reset_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard
            .iter()
            .find(|user| {
                user.password_reset_token.as_deref() == Some(digest)
                    && user
                        .password_reset_expires
                        .is_some_and(|expires| expires.to_chrono() > now)
            })
            .cloned())
    }

    async fn find_many(&self, ids: &[ObjectId]) -> Result<Vec<User>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard
            .iter()
            .filter(|user| ids.contains(&user.id))
            .cloned()
            .collect())
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let mut users = lock(&self.records)?.clone();
        users.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.cmp(&left.id))
        });
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::Role;
    use crate::catalog::DegreeLevel;
    use crate::query::{UniversityListParams, UniversityQuery};
    use chrono::TimeZone;

    fn stamp() -> bson::DateTime {
        bson::DateTime::from_chrono(Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap())
    }

    fn university(name: &str, country: &str, fee: f64) -> University {
        University {
            id: ObjectId::new(),
            name: name.to_string(),
            country: country.to_string(),
            city: None,
            description: None,
            degree_level: DegreeLevel::Masters,
            programs: Vec::new(),
            min_gpa: 3.0,
            min_ielts: 6.5,
            tuition_fee: fee,
            scholarships_available: false,
            application_deadline: None,
            intake_seasons: Vec::new(),
            ranking: None,
            website: None,
            contact_email: None,
            logo_url: None,
            campus_photos: Vec::new(),
            is_active: true,
            created_at: stamp(),
            updated_at: stamp(),
        }
    }

    fn user(email: &str) -> User {
        User {
            id: ObjectId::new(),
            name: "Staff".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::Reviewer,
            department: None,
            is_active: true,
            last_login: None,
            password_reset_token: None,
            password_reset_expires: None,
            created_at: stamp(),
            updated_at: stamp(),
        }
    }

    #[tokio::test]
    async fn listing_hides_deactivated_universities() {
        let repository = MemoryUniversityRepository::default();
        let kept = repository
            .insert(university("Kept", "UK", 9_000.0))
            .await
            .expect("insert");
        let mut hidden = repository
            .insert(university("Hidden", "UK", 9_000.0))
            .await
            .expect("insert");
        hidden.is_active = false;
        repository.replace(hidden.clone()).await.expect("replace");

        let page = repository
            .list(&UniversityQuery::from_params(&UniversityListParams::default()))
            .await
            .expect("list");
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, kept.id);

        assert!(repository
            .find_active(hidden.id)
            .await
            .expect("find")
            .is_none());
        assert!(repository.find_any(hidden.id).await.expect("find").is_some());
    }

    #[tokio::test]
    async fn similar_excludes_self_and_other_countries() {
        let repository = MemoryUniversityRepository::default();
        let anchor = repository
            .insert(university("Anchor", "Canada", 20_000.0))
            .await
            .expect("insert");
        let peer = repository
            .insert(university("Peer", "Canada", 25_000.0))
            .await
            .expect("insert");
        repository
            .insert(university("Elsewhere", "Japan", 5_000.0))
            .await
            .expect("insert");

        let similar = repository.similar(&anchor, 3).await.expect("similar");
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].id, peer.id);
    }

    #[tokio::test]
    async fn duplicate_emails_conflict() {
        let repository = MemoryUserRepository::default();
        repository.insert(user("a@example.com")).await.expect("insert");
        let err = repository
            .insert(user("a@example.com"))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, RepositoryError::Conflict));

        let other = repository.insert(user("b@example.com")).await.expect("insert");
        let err = repository
            .replace(User {
                email: "a@example.com".to_string(),
                ..other
            })
            .await
            .expect_err("duplicate on update");
        assert!(matches!(err, RepositoryError::Conflict));
    }

    #[tokio::test]
    async fn reset_tokens_expire() {
        let repository = MemoryUserRepository::default();
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
        let mut holder = user("reset@example.com");
        holder.password_reset_token = Some("digest".to_string());
        holder.password_reset_expires = Some(bson::DateTime::from_chrono(
            now + chrono::Duration::minutes(30),
        ));
        repository.insert(holder).await.expect("insert");

        assert!(repository
            .find_by_reset_token("digest", now)
            .await
            .expect("lookup")
            .is_some());
        assert!(repository
            .find_by_reset_token("digest", now + chrono::Duration::minutes(31))
            .await
            .expect("lookup")
            .is_none());
    }
}
