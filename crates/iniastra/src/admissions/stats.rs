use std::collections::{BTreeMap, HashMap};

use bson::oid::ObjectId;
use chrono::Datelike;
use serde::{Deserialize, Serialize};

use super::domain::Application;
use crate::catalog::stats::{round2, sorted_buckets, CountBucket};
use crate::catalog::University;

pub const TOP_UNIVERSITIES: usize = 10;
pub const TREND_MONTHS: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationOverview {
    pub total_applications: u64,
    pub eligible_applications: u64,
    pub ineligible_applications: u64,
    /// Percentage of eligible applications.
    pub eligibility_rate: f64,
    #[serde(rename = "averageGPA")]
    pub average_gpa: f64,
    #[serde(rename = "averageIELTS")]
    pub average_ielts: f64,
    pub total_application_fees: f64,
}

/// Per-university tally before the university names are joined in.
#[derive(Debug, Clone, PartialEq)]
pub struct UniversityTally {
    pub university_id: ObjectId,
    pub count: u64,
    pub average_gpa: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
    pub count: u64,
}

/// Raw aggregation output from the repository.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApplicationAggregates {
    pub overview: Option<ApplicationOverview>,
    pub by_status: Vec<CountBucket>,
    pub by_university: Vec<UniversityTally>,
    pub monthly_trend: Vec<MonthBucket>,
}

impl ApplicationAggregates {
    /// Folds records with the same grouping, ordering, and limits as the pipelines.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Application>) -> Self {
        let mut total = 0u64;
        let mut eligible = 0u64;
        let (mut gpa, mut ielts, mut fees) = (0.0, 0.0, 0.0);
        let mut statuses: HashMap<String, u64> = HashMap::new();
        let mut universities: HashMap<ObjectId, (u64, f64)> = HashMap::new();
        let mut months: BTreeMap<(i32, u32), u64> = BTreeMap::new();

        for application in records {
            total += 1;
            if application.is_eligible {
                eligible += 1;
            }
            gpa += application.gpa;
            ielts += application.ielts;
            fees += application.details.application_fee;
            *statuses
                .entry(application.status.label().to_string())
                .or_default() += 1;
            let tally = universities
                .entry(application.university_id)
                .or_insert((0, 0.0));
            tally.0 += 1;
            tally.1 += application.gpa;
            let created = application.created_at.to_chrono();
            *months.entry((created.year(), created.month())).or_default() += 1;
        }

        let overview = (total > 0).then(|| {
            let count = total as f64;
            ApplicationOverview {
                total_applications: total,
                eligible_applications: eligible,
                ineligible_applications: total - eligible,
                eligibility_rate: round2(eligible as f64 / count * 100.0),
                average_gpa: round2(gpa / count),
                average_ielts: round2(ielts / count),
                total_application_fees: fees,
            }
        });

        let mut by_university: Vec<UniversityTally> = universities
            .into_iter()
            .map(|(university_id, (count, gpa_sum))| UniversityTally {
                university_id,
                count,
                average_gpa: round2(gpa_sum / count as f64),
            })
            .collect();
        by_university.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.university_id.cmp(&b.university_id))
        });
        by_university.truncate(TOP_UNIVERSITIES);

        let skip = months.len().saturating_sub(TREND_MONTHS);
        let monthly_trend = months
            .into_iter()
            .skip(skip)
            .map(|((year, month), count)| MonthBucket { year, month, count })
            .collect();

        Self {
            overview,
            by_status: sorted_buckets(statuses),
            by_university,
            monthly_trend,
        }
    }
}

/// Per-university row with the joined name and country.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityBucket {
    #[serde(rename = "_id")]
    pub id: String,
    pub count: u64,
    #[serde(rename = "averageGPA")]
    pub average_gpa: f64,
    pub university_name: String,
    pub country: String,
}

impl UniversityBucket {
    /// Missing universities are reported as `Unknown`.
    pub fn join(tally: &UniversityTally, universities: &[University]) -> Self {
        let university = universities
            .iter()
            .find(|university| university.id == tally.university_id);
        Self {
            id: tally.university_id.to_hex(),
            count: tally.count,
            average_gpa: tally.average_gpa,
            university_name: university
                .map(|u| u.name.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            country: university
                .map(|u| u.country.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStats {
    #[serde(serialize_with = "overview_or_empty")]
    pub overview: Option<ApplicationOverview>,
    pub by_status: Vec<CountBucket>,
    pub by_university: Vec<UniversityBucket>,
    pub monthly_trend: Vec<MonthBucket>,
}

fn overview_or_empty<S>(
    overview: &Option<ApplicationOverview>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match overview {
        Some(overview) => overview.serialize(serializer),
        None => serde_json::Map::new().serialize(serializer),
    }
}
