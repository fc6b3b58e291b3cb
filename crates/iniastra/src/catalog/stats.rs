use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::domain::University;

/// Rounds to two decimals, as the `$round` aggregation stage does.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityOverview {
    pub total_universities: u64,
    pub average_tuition: f64,
    pub min_tuition: f64,
    pub max_tuition: f64,
    #[serde(rename = "averageGPA")]
    pub average_gpa: f64,
    #[serde(rename = "averageIELTS")]
    pub average_ielts: f64,
}

/// `{ _id: <group key>, count }` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountBucket {
    #[serde(rename = "_id")]
    pub key: String,
    pub count: u64,
}

/// Overview over active universities. `overview` is absent for an empty catalog and
/// serializes as `{}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityStats {
    #[serde(serialize_with = "overview_or_empty")]
    pub overview: Option<UniversityOverview>,
    pub by_country: Vec<CountBucket>,
    pub by_degree: Vec<CountBucket>,
}

pub const TOP_COUNTRIES: usize = 10;

impl UniversityStats {
    /// Folds already filtered records the way the aggregation pipelines do.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a University>) -> Self {
        let mut total = 0u64;
        let (mut tuition, mut gpa, mut ielts) = (0.0, 0.0, 0.0);
        let (mut min_tuition, mut max_tuition) = (f64::INFINITY, f64::NEG_INFINITY);
        let mut countries: HashMap<String, u64> = HashMap::new();
        let mut degrees: HashMap<String, u64> = HashMap::new();

        for university in records {
            total += 1;
            tuition += university.tuition_fee;
            gpa += university.min_gpa;
            ielts += university.min_ielts;
            min_tuition = min_tuition.min(university.tuition_fee);
            max_tuition = max_tuition.max(university.tuition_fee);
            *countries.entry(university.country.clone()).or_default() += 1;
            *degrees
                .entry(university.degree_level.label().to_string())
                .or_default() += 1;
        }

        let overview = (total > 0).then(|| {
            let count = total as f64;
            UniversityOverview {
                total_universities: total,
                average_tuition: round2(tuition / count),
                min_tuition,
                max_tuition,
                average_gpa: round2(gpa / count),
                average_ielts: round2(ielts / count),
            }
        });

        let mut by_country = sorted_buckets(countries);
        by_country.truncate(TOP_COUNTRIES);

        Self {
            overview,
            by_country,
            by_degree: sorted_buckets(degrees),
        }
    }
}

/// Count descending, then key ascending so ties are stable.
pub fn sorted_buckets(counts: HashMap<String, u64>) -> Vec<CountBucket> {
    let mut buckets: Vec<CountBucket> = counts
        .into_iter()
        .map(|(key, count)| CountBucket { key, count })
        .collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    buckets
}

fn overview_or_empty<S>(overview: &Option<UniversityOverview>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match overview {
        Some(overview) => overview.serialize(serializer),
        None => serde_json::Map::new().serialize(serializer),
    }
}
