use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use tracing::info;

use super::domain::University;
use super::repository::UniversityRepository;
use super::validation::{build_university, UniversityPayload};
use crate::query::coerce_f64;
use crate::store::RepositoryError;

/// The reference catalog shipped with the crate.
pub const BUNDLED_CATALOG: &str = include_str!("../../data/universities.csv");

const LIST_SEPARATOR: char = ';';

/// Parses catalog rows from CSV. List columns are `;`-separated; every row goes
/// through the same validation as `POST /api/universities`.
pub fn parse_catalog<R: Read>(reader: R, now: DateTime<Utc>) -> Result<Vec<University>, SeedError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut universities = Vec::new();

    for (index, record) in csv_reader.deserialize::<CatalogRow>().enumerate() {
        // Header is line 1.
        let row = index + 2;
        let payload = record?.into_payload().map_err(|errors| SeedError::Invalid { row, errors })?;
        let university =
            build_university(payload, now).map_err(|errors| SeedError::Invalid { row, errors })?;
        universities.push(university);
    }

    Ok(universities)
}

pub fn bundled_catalog(now: DateTime<Utc>) -> Result<Vec<University>, SeedError> {
    parse_catalog(BUNDLED_CATALOG.as_bytes(), now)
}

pub fn load_catalog(path: &Path, now: DateTime<Utc>) -> Result<Vec<University>, SeedError> {
    let file = File::open(path)?;
    parse_catalog(file, now)
}

/// Inserts every parsed university and returns how many were stored.
pub async fn seed_catalog<U>(
    repository: &U,
    universities: Vec<University>,
) -> Result<usize, RepositoryError>
where
    U: UniversityRepository,
{
    let mut inserted = 0;
    for university in universities {
        repository.insert(university).await?;
        inserted += 1;
    }
    info!(count = inserted, "seeded university catalog");
    Ok(inserted)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogRow {
    name: String,
    country: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    city: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    description: Option<String>,
    degree_level: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    programs: Option<String>,
    #[serde(rename = "minGPA")]
    min_gpa: String,
    #[serde(rename = "minIELTS")]
    min_ielts: String,
    tuition_fee: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    scholarships_available: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    application_deadline: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    intake_seasons: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    ranking: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    website: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    contact_email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    logo_url: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    campus_photos: Option<String>,
}

impl CatalogRow {
    fn into_payload(self) -> Result<UniversityPayload, Vec<String>> {
        let mut errors = Vec::new();
        let mut number = |column: &str, raw: Option<&str>| -> Option<f64> {
            let raw = raw?.trim();
            if raw.is_empty() {
                return None;
            }
            let parsed = coerce_f64(raw);
            if parsed.is_none() {
                errors.push(format!("{column}: '{raw}' is not a number"));
            }
            parsed
        };

        let min_gpa = number("minGPA", Some(self.min_gpa.as_str()));
        let min_ielts = number("minIELTS", Some(self.min_ielts.as_str()));
        let tuition_fee = number("tuitionFee", Some(self.tuition_fee.as_str()));
        let ranking = number("ranking", self.ranking.as_deref());

        let scholarships_available = match self.scholarships_available.as_deref() {
            None => None,
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => {
                    errors.push(format!("scholarshipsAvailable: '{raw}' is not a boolean"));
                    None
                }
            },
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(UniversityPayload {
            name: Some(self.name),
            country: Some(self.country),
            city: self.city,
            description: self.description,
            degree_level: Some(self.degree_level),
            programs: Some(split_list(self.programs)),
            min_gpa,
            min_ielts,
            tuition_fee,
            scholarships_available,
            application_deadline: self.application_deadline,
            intake_seasons: Some(split_list(self.intake_seasons)),
            ranking,
            website: self.website,
            contact_email: self.contact_email,
            logo_url: self.logo_url,
            campus_photos: Some(split_list(self.campus_photos)),
        })
    }
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(LIST_SEPARATOR)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Failures while reading a catalog file.
#[derive(Debug)]
pub enum SeedError {
    Io(std::io::Error),
    Csv(csv::Error),
    Invalid { row: usize, errors: Vec<String> },
}

impl fmt::Display for SeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedError::Io(err) => write!(f, "failed to read catalog: {}", err),
            SeedError::Csv(err) => write!(f, "malformed catalog csv: {}", err),
            SeedError::Invalid { row, errors } => {
                write!(f, "row {} is invalid: {}", row, errors.join(", "))
            }
        }
    }
}

impl std::error::Error for SeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SeedError::Io(err) => Some(err),
            SeedError::Csv(err) => Some(err),
            SeedError::Invalid { .. } => None,
        }
    }
}

impl From<std::io::Error> for SeedError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for SeedError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DegreeLevel, IntakeSeason};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn bundled_catalog_has_the_reference_universities() {
        let universities = bundled_catalog(now()).expect("bundled catalog parses");
        assert_eq!(universities.len(), 10);

        let harvard = &universities[0];
        assert_eq!(harvard.name, "Harvard University");
        assert_eq!(harvard.degree_level, DegreeLevel::Masters);
        assert_eq!(harvard.min_gpa, 3.7);
        assert_eq!(harvard.campus_photos.len(), 2);
        assert_eq!(harvard.ranking, Some(1));

        let toronto = &universities[1];
        assert_eq!(
            toronto.intake_seasons,
            vec![IntakeSeason::Fall, IntakeSeason::Winter]
        );
        assert!(toronto.campus_photos.is_empty());
        assert!(universities.iter().all(|u| u.is_active));
    }

    #[test]
    fn rows_are_validated_like_api_payloads() {
        let csv = "name,country,degreeLevel,minGPA,minIELTS,tuitionFee\n\
                   Test U,Nowhere,Masters,4.5,6.5,1000\n";
        match parse_catalog(csv.as_bytes(), now()) {
            Err(SeedError::Invalid { row, errors }) => {
                assert_eq!(row, 2);
                assert_eq!(errors, vec!["GPA cannot exceed 4.0".to_string()]);
            }
            other => panic!("expected invalid row, got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_columns_name_the_column() {
        let csv = "name,country,degreeLevel,minGPA,minIELTS,tuitionFee\n\
                   Test U,Nowhere,Masters,high,6.5,1000\n";
        let err = parse_catalog(csv.as_bytes(), now()).unwrap_err();
        assert!(err.to_string().contains("minGPA: 'high' is not a number"));
    }
}
