use std::sync::Arc;

use bson::oid::ObjectId;
use bson::{doc, Document};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use super::{Repositories, RepositoryError};
use crate::accounts::{User, UserRepository};
use crate::admissions::stats::{
    ApplicationOverview, MonthBucket, UniversityTally, TOP_UNIVERSITIES, TREND_MONTHS,
};
use crate::admissions::{Application, ApplicationAggregates, ApplicationRepository, ReviewUpdate};
use crate::catalog::stats::{round2, CountBucket, UniversityOverview, TOP_COUNTRIES};
use crate::catalog::{University, UniversityRepository, UniversityStats};
use crate::config::DatabaseConfig;
use crate::query::{ApplicationQuery, Page, UniversityQuery};

pub const UNIVERSITIES: &str = "universities";
pub const APPLICATIONS: &str = "applications";
pub const USERS: &str = "users";

const DUPLICATE_KEY: i32 = 11000;
const APP_NAME: &str = "iniastra";

/// One MongoDB client for the process; collection handles are cheap clones of it.
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Parses the URI, applies the configured timeouts, and pings before returning.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, RepositoryError> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.app_name = Some(APP_NAME.to_string());
        options.server_selection_timeout = Some(config.server_selection_timeout);
        options.connect_timeout = Some(config.connect_timeout);

        let client = Client::with_options(options)?;
        let database = client.database(&config.database);
        let store = Self { client, database };
        store.ping().await?;
        info!(database = %config.database, "connected to mongodb");
        Ok(store)
    }

    pub async fn ping(&self) -> Result<(), RepositoryError> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    /// Text search, filter, and uniqueness indexes. Safe to run on every start.
    pub async fn ensure_indexes(&self) -> Result<(), RepositoryError> {
        let universities = self.database.collection::<Document>(UNIVERSITIES);
        universities
            .create_indexes([
                IndexModel::builder()
                    .keys(doc! { "name": "text", "description": "text", "programs": "text" })
                    .build(),
                IndexModel::builder()
                    .keys(doc! { "country": 1, "degreeLevel": 1 })
                    .build(),
                IndexModel::builder().keys(doc! { "tuitionFee": 1 }).build(),
                IndexModel::builder().keys(doc! { "isActive": 1 }).build(),
            ])
            .await?;

        let applications = self.database.collection::<Document>(APPLICATIONS);
        applications
            .create_indexes([
                IndexModel::builder()
                    .keys(doc! { "email": 1, "universityId": 1, "createdAt": -1 })
                    .build(),
                IndexModel::builder().keys(doc! { "status": 1 }).build(),
                IndexModel::builder().keys(doc! { "createdAt": -1 }).build(),
            ])
            .await?;

        let users = self.database.collection::<Document>(USERS);
        users
            .create_indexes([
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
                IndexModel::builder()
                    .keys(doc! { "passwordResetToken": 1 })
                    .build(),
            ])
            .await?;

        debug!("mongodb indexes ensured");
        Ok(())
    }

    pub fn repositories(
        &self,
    ) -> Repositories<MongoUniversityRepository, MongoApplicationRepository, MongoUserRepository>
    {
        Repositories {
            universities: Arc::new(MongoUniversityRepository {
                collection: self.database.collection(UNIVERSITIES),
            }),
            applications: Arc::new(MongoApplicationRepository {
                collection: self.database.collection(APPLICATIONS),
            }),
            users: Arc::new(MongoUserRepository {
                collection: self.database.collection(USERS),
            }),
        }
    }

    pub async fn shutdown(self) {
        self.client.shutdown().await;
        info!("mongodb client closed");
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) => write.code == DUPLICATE_KEY,
        ErrorKind::Command(command) => command.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn write_error(err: mongodb::error::Error) -> RepositoryError {
    if is_duplicate_key(&err) {
        RepositoryError::Conflict
    } else {
        RepositoryError::Backend(err)
    }
}

fn active() -> Document {
    doc! { "isActive": { "$ne": false } }
}

async fn collect<T>(cursor: mongodb::Cursor<T>) -> Result<Vec<T>, RepositoryError>
where
    T: DeserializeOwned + Send + Sync + Unpin,
{
    Ok(cursor.try_collect().await?)
}

async fn aggregate<T>(
    collection: &Collection<impl Send + Sync>,
    pipeline: Vec<Document>,
) -> Result<Vec<T>, RepositoryError>
where
    T: DeserializeOwned,
{
    let documents: Vec<Document> = collection.aggregate(pipeline).await?.try_collect().await?;
    documents
        .into_iter()
        .map(|document| bson::from_document(document).map_err(RepositoryError::from))
        .collect()
}

fn count_pipeline(matching: Document, key: &str, limit: Option<i64>) -> Vec<Document> {
    let group_key = format!("${key}");
    let mut pipeline = vec![
        doc! { "$match": matching },
        doc! { "$group": { "_id": group_key, "count": { "$sum": 1 } } },
        doc! { "$sort": { "count": -1, "_id": 1 } },
    ];
    if let Some(limit) = limit {
        pipeline.push(doc! { "$limit": limit });
    }
    pipeline
}

#[derive(Debug, Clone)]
pub struct MongoUniversityRepository {
    collection: Collection<University>,
}

impl UniversityRepository for MongoUniversityRepository {
    async fn insert(&self, university: University) -> Result<University, RepositoryError> {
        self.collection
            .insert_one(&university)
            .await
            .map_err(write_error)?;
        Ok(university)
    }

    async fn replace(&self, university: University) -> Result<(), RepositoryError> {
        let result = self
            .collection
            .replace_one(doc! { "_id": university.id }, &university)
            .await
            .map_err(write_error)?;
        if result.matched_count == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_active(&self, id: ObjectId) -> Result<Option<University>, RepositoryError> {
        let mut filter = active();
        filter.insert("_id", id);
        Ok(self.collection.find_one(filter).await?)
    }

    async fn find_any(&self, id: ObjectId) -> Result<Option<University>, RepositoryError> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_many(
        &self,
        ids: &[ObjectId],
        active_only: bool,
    ) -> Result<Vec<University>, RepositoryError> {
        let mut filter = if active_only { active() } else { Document::new() };
        filter.insert("_id", doc! { "$in": ids.to_vec() });
        let cursor = self.collection.find(filter).sort(doc! { "_id": 1 }).await?;
        collect(cursor).await
    }

    async fn list(&self, query: &UniversityQuery) -> Result<Page<University>, RepositoryError> {
        let filter = query.filter.to_document();
        let total = self.collection.count_documents(filter.clone()).await?;
        let cursor = self
            .collection
            .find(filter)
            .sort(query.sort.to_document())
            .skip(query.pagination.skip())
            .limit(query.pagination.limit as i64)
            .await?;

        Ok(Page {
            items: collect(cursor).await?,
            total,
            pagination: query.pagination,
        })
    }

    async fn similar(
        &self,
        university: &University,
        limit: usize,
    ) -> Result<Vec<University>, RepositoryError> {
        let mut filter = active();
        filter.insert("_id", doc! { "$ne": university.id });
        filter.insert("country", university.country.as_str());
        filter.insert("degreeLevel", university.degree_level.label());
        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "_id": 1 })
            .limit(limit as i64)
            .await?;
        collect(cursor).await
    }

    async fn stats(&self) -> Result<UniversityStats, RepositoryError> {
        let overview_pipeline = vec![
            doc! { "$match": active() },
            doc! { "$group": {
                "_id": null,
                "totalUniversities": { "$sum": 1 },
                "averageTuition": { "$avg": "$tuitionFee" },
                "minTuition": { "$min": "$tuitionFee" },
                "maxTuition": { "$max": "$tuitionFee" },
                "averageGPA": { "$avg": "$minGPA" },
                "averageIELTS": { "$avg": "$minIELTS" },
            } },
        ];
        let overview = aggregate::<UniversityOverview>(&self.collection, overview_pipeline)
            .await?
            .into_iter()
            .next()
            .map(|overview| UniversityOverview {
                average_tuition: round2(overview.average_tuition),
                average_gpa: round2(overview.average_gpa),
                average_ielts: round2(overview.average_ielts),
                ..overview
            });

        let by_country = aggregate::<CountBucket>(
            &self.collection,
            count_pipeline(active(), "country", Some(TOP_COUNTRIES as i64)),
        )
        .await?;
        let by_degree = aggregate::<CountBucket>(
            &self.collection,
            count_pipeline(active(), "degreeLevel", None),
        )
        .await?;

        Ok(UniversityStats {
            overview,
            by_country,
            by_degree,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationOverviewRow {
    total_applications: u64,
    eligible_applications: u64,
    #[serde(rename = "averageGPA")]
    average_gpa: f64,
    #[serde(rename = "averageIELTS")]
    average_ielts: f64,
    total_application_fees: f64,
}

#[derive(Debug, Deserialize)]
struct UniversityTallyRow {
    #[serde(rename = "_id")]
    university_id: ObjectId,
    count: u64,
    #[serde(rename = "averageGPA")]
    average_gpa: f64,
}

#[derive(Debug, Deserialize)]
struct MonthKey {
    year: i32,
    month: u32,
}

#[derive(Debug, Deserialize)]
struct MonthRow {
    #[serde(rename = "_id")]
    key: MonthKey,
    count: u64,
}

#[derive(Debug, Clone)]
pub struct MongoApplicationRepository {
    collection: Collection<Application>,
}

impl ApplicationRepository for MongoApplicationRepository {
    async fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        self.collection
            .insert_one(&application)
            .await
            .map_err(write_error)?;
        Ok(application)
    }

    async fn replace(&self, application: Application) -> Result<(), RepositoryError> {
        let result = self
            .collection
            .replace_one(doc! { "_id": application.id }, &application)
            .await
            .map_err(write_error)?;
        if result.matched_count == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find(&self, id: ObjectId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn apply_review(
        &self,
        id: ObjectId,
        update: &ReviewUpdate,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self
            .collection
            .find_one_and_update(doc! { "_id": id }, review_update_document(update)?)
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn find_recent(
        &self,
        email: &str,
        university_id: ObjectId,
        since: DateTime<Utc>,
    ) -> Result<Option<Application>, RepositoryError> {
        let filter = doc! {
            "email": email,
            "universityId": university_id,
            "createdAt": { "$gte": bson::DateTime::from_chrono(since) },
        };
        Ok(self.collection.find_one(filter).await?)
    }

    async fn list(&self, query: &ApplicationQuery) -> Result<Page<Application>, RepositoryError> {
        let filter = query.filter.to_document();
        let total = self.collection.count_documents(filter.clone()).await?;
        let cursor = self
            .collection
            .find(filter)
            .sort(query.sort.to_document())
            .skip(query.pagination.skip())
            .limit(query.pagination.limit as i64)
            .await?;

        Ok(Page {
            items: collect(cursor).await?,
            total,
            pagination: query.pagination,
        })
    }

    async fn by_email(&self, email: &str) -> Result<Vec<Application>, RepositoryError> {
        let cursor = self
            .collection
            .find(doc! { "email": email })
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .await?;
        collect(cursor).await
    }

    async fn count_for_university(&self, university_id: ObjectId) -> Result<u64, RepositoryError> {
        Ok(self
            .collection
            .count_documents(doc! { "universityId": university_id })
            .await?)
    }

    async fn stats(&self) -> Result<ApplicationAggregates, RepositoryError> {
        let overview_pipeline = vec![doc! { "$group": {
            "_id": null,
            "totalApplications": { "$sum": 1 },
            "eligibleApplications": { "$sum": { "$cond": ["$isEligible", 1, 0] } },
            "averageGPA": { "$avg": "$gpa" },
            "averageIELTS": { "$avg": "$ielts" },
            "totalApplicationFees": { "$sum": "$applicationFee" },
        } }];
        let overview = aggregate::<ApplicationOverviewRow>(&self.collection, overview_pipeline)
            .await?
            .into_iter()
            .next()
            .filter(|row| row.total_applications > 0)
            .map(|row| ApplicationOverview {
                total_applications: row.total_applications,
                eligible_applications: row.eligible_applications,
                ineligible_applications: row.total_applications - row.eligible_applications,
                eligibility_rate: round2(
                    row.eligible_applications as f64 / row.total_applications as f64 * 100.0,
                ),
                average_gpa: round2(row.average_gpa),
                average_ielts: round2(row.average_ielts),
                total_application_fees: row.total_application_fees,
            });

        let by_status =
            aggregate::<CountBucket>(&self.collection, count_pipeline(Document::new(), "status", None))
                .await?;

        let top_universities = TOP_UNIVERSITIES as i64;
        let university_pipeline = vec![
            doc! { "$group": {
                "_id": "$universityId",
                "count": { "$sum": 1 },
                "averageGPA": { "$avg": "$gpa" },
            } },
            doc! { "$sort": { "count": -1, "_id": 1 } },
            doc! { "$limit": top_universities },
        ];
        let by_university = aggregate::<UniversityTallyRow>(&self.collection, university_pipeline)
            .await?
            .into_iter()
            .map(|row| UniversityTally {
                university_id: row.university_id,
                count: row.count,
                average_gpa: round2(row.average_gpa),
            })
            .collect();

        let trend_months = TREND_MONTHS as i64;
        let trend_pipeline = vec![
            doc! { "$group": {
                "_id": { "year": { "$year": "$createdAt" }, "month": { "$month": "$createdAt" } },
                "count": { "$sum": 1 },
            } },
            doc! { "$sort": { "_id.year": -1, "_id.month": -1 } },
            doc! { "$limit": trend_months },
        ];
        let mut monthly_trend: Vec<MonthBucket> =
            aggregate::<MonthRow>(&self.collection, trend_pipeline)
                .await?
                .into_iter()
                .map(|row| MonthBucket {
                    year: row.key.year,
                    month: row.key.month,
                    count: row.count,
                })
                .collect();
        monthly_trend.reverse();

        Ok(ApplicationAggregates {
            overview,
            by_status,
            by_university,
            monthly_trend,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl UserRepository for MongoUserRepository {
    async fn insert(&self, user: User) -> Result<User, RepositoryError> {
        self.collection
            .insert_one(&user)
            .await
            .map_err(write_error)?;
        Ok(user)
    }

    async fn replace(&self, user: User) -> Result<(), RepositoryError> {
        let result = self
            .collection
            .replace_one(doc! { "_id": user.id }, &user)
            .await
            .map_err(write_error)?;
        if result.matched_count == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find(&self, id: ObjectId) -> Result<Option<User>, RepositoryError> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    async fn find_by_reset_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let filter = doc! {
            "passwordResetToken": digest,
            "passwordResetExpires": { "$gt": bson::DateTime::from_chrono(now) },
        };
        Ok(self.collection.find_one(filter).await?)
    }

    async fn find_many(&self, ids: &[ObjectId]) -> Result<Vec<User>, RepositoryError> {
        let cursor = self
            .collection
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .await?;
        collect(cursor).await
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .await?;
        collect(cursor).await
    }
}

/// `$set` for the scalar fields and `$push` for the append-only logs.
fn review_update_document(update: &ReviewUpdate) -> Result<Document, RepositoryError> {
    let mut set = doc! { "updatedAt": update.at };
    let mut push = Document::new();
    if let Some(change) = &update.status_change {
        set.insert("status", bson::to_bson(&change.status)?);
        push.insert("statusHistory", bson::to_bson(change)?);
    }
    if let Some(decided) = update.decision_date {
        set.insert("decisionDate", decided);
    }
    if let Some(reviewer) = update.assigned_to {
        set.insert("assignedTo", reviewer);
    }
    if let Some(note) = &update.note {
        push.insert("reviewNotes", bson::to_bson(note)?);
    }

    let mut document = doc! { "$set": set };
    if !push.is_empty() {
        document.insert("$push", push);
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admissions::ApplicationStatus;
    use chrono::TimeZone;

    #[test]
    fn review_updates_push_onto_the_logs() {
        let at = Utc.with_ymd_and_hms(2025, 5, 12, 14, 30, 0).unwrap();
        let stamp = bson::DateTime::from_chrono(at);
        let reviewer = ObjectId::new();

        let assigned = review_update_document(&ReviewUpdate::assignment(reviewer, "Riley", at))
            .expect("encodes");
        assert_eq!(
            assigned,
            doc! {
                "$set": {
                    "updatedAt": stamp,
                    "status": "under_review",
                    "assignedTo": reviewer,
                },
                "$push": {
                    "statusHistory": {
                        "status": "under_review",
                        "changedAt": stamp,
                        "notes": "Assigned to reviewer Riley",
                    },
                },
            }
        );

        let accepted =
            review_update_document(&ReviewUpdate::status(ApplicationStatus::Accepted, None, at))
                .expect("encodes");
        assert_eq!(
            accepted
                .get_document("$set")
                .unwrap()
                .get_datetime("decisionDate")
                .unwrap(),
            &stamp
        );

        let note = review_update_document(&ReviewUpdate::note(
            "Strong essay".to_string(),
            "Riley".to_string(),
            at,
        ))
        .expect("encodes");
        assert_eq!(note.get_document("$set").unwrap(), &doc! { "updatedAt": stamp });
        assert!(note.get_document("$push").unwrap().contains_key("reviewNotes"));
        assert!(!note.get_document("$push").unwrap().contains_key("statusHistory"));
    }

    #[test]
    fn count_pipelines_sort_by_count_then_key() {
        let pipeline = count_pipeline(active(), "country", Some(10));
        assert_eq!(pipeline.len(), 4);
        assert_eq!(
            pipeline[1],
            doc! { "$group": { "_id": "$country", "count": { "$sum": 1 } } }
        );
        assert_eq!(pipeline[2], doc! { "$sort": { "count": -1, "_id": 1 } });
        assert_eq!(pipeline[3], doc! { "$limit": 10_i64 });
    }

    #[test]
    fn aggregation_rows_decode_from_group_output() {
        let row: UniversityTallyRow = bson::from_document(doc! {
            "_id": ObjectId::new(),
            "count": 3,
            "averageGPA": 3.456,
        })
        .expect("decodes");
        assert_eq!(row.count, 3);

        let month: MonthRow = bson::from_document(doc! {
            "_id": { "year": 2025, "month": 2 },
            "count": 7_i64,
        })
        .expect("decodes");
        assert_eq!((month.key.year, month.key.month, month.count), (2025, 2, 7));
    }
}
