use std::fmt;

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::eligibility::Requirements;

/// Degree awarded by a listed program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DegreeLevel {
    Bachelors,
    Masters,
    PhD,
    Diploma,
}

impl DegreeLevel {
    pub const ALL: [DegreeLevel; 4] = [
        DegreeLevel::Bachelors,
        DegreeLevel::Masters,
        DegreeLevel::PhD,
        DegreeLevel::Diploma,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            DegreeLevel::Bachelors => "Bachelors",
            DegreeLevel::Masters => "Masters",
            DegreeLevel::PhD => "PhD",
            DegreeLevel::Diploma => "Diploma",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.label().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for DegreeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntakeSeason {
    Fall,
    Spring,
    Summer,
    Winter,
}

impl IntakeSeason {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fall" => Some(Self::Fall),
            "spring" => Some(Self::Spring),
            "summer" => Some(Self::Summer),
            "winter" => Some(Self::Winter),
            _ => None,
        }
    }
}

/// Stored university document. Reads outside the admin history paths only ever see
/// records with `is_active == true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct University {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub degree_level: DegreeLevel,
    #[serde(default)]
    pub programs: Vec<String>,
    #[serde(rename = "minGPA")]
    pub min_gpa: f64,
    #[serde(rename = "minIELTS")]
    pub min_ielts: f64,
    pub tuition_fee: f64,
    #[serde(default)]
    pub scholarships_available: bool,
    #[serde(default)]
    pub application_deadline: Option<bson::DateTime>,
    #[serde(default)]
    pub intake_seasons: Vec<IntakeSeason>,
    #[serde(default)]
    pub ranking: Option<i32>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub campus_photos: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
}

fn default_active() -> bool {
    true
}

impl University {
    pub fn requirements(&self) -> Requirements {
        Requirements {
            min_gpa: self.min_gpa,
            min_ielts: self.min_ielts,
        }
    }

    /// Case-insensitive match of any search term against name, description, and programs,
    /// approximating a MongoDB `$text` query.
    pub fn mentions(&self, search: &str) -> bool {
        let haystacks: Vec<String> = std::iter::once(self.name.as_str())
            .chain(self.description.as_deref())
            .chain(self.programs.iter().map(String::as_str))
            .map(str::to_lowercase)
            .collect();

        search
            .split_whitespace()
            .map(str::to_lowercase)
            .any(|term| haystacks.iter().any(|text| text.contains(&term)))
    }
}
