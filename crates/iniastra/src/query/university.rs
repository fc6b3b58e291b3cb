use std::cmp::Ordering;

use bson::{doc, Document};
use serde::Deserialize;

use super::coerce::{coerce_f64, present};
use super::pagination::{with_tiebreak, NumericRange, Pagination, SortDirection};
use crate::catalog::{DegreeLevel, University};

pub const DEFAULT_UNIVERSITY_PAGE_SIZE: u64 = 10;
const DEFAULT_MIN_FEE: f64 = 0.0;
const DEFAULT_MAX_FEE: f64 = 50_000.0;
const DEFAULT_MAX_GPA: f64 = 4.0;
const DEFAULT_MAX_IELTS: f64 = 9.0;

/// Raw `GET /api/universities` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UniversityListParams {
    pub country: Option<String>,
    pub degree: Option<String>,
    #[serde(rename = "minFee")]
    pub min_fee: Option<String>,
    #[serde(rename = "maxFee")]
    pub max_fee: Option<String>,
    #[serde(rename = "minGPA")]
    pub min_gpa: Option<String>,
    #[serde(rename = "maxGPA")]
    pub max_gpa: Option<String>,
    #[serde(rename = "minIELTS")]
    pub min_ielts: Option<String>,
    #[serde(rename = "maxIELTS")]
    pub max_ielts: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// Predicate over active universities. The GPA and IELTS ranges apply to the
/// university's published minimums, not to an applicant.
#[derive(Debug, Clone, PartialEq)]
pub struct UniversityFilter {
    pub country: Option<String>,
    pub degree_level: Option<DegreeLevel>,
    pub tuition_fee: NumericRange,
    pub min_gpa: NumericRange,
    pub min_ielts: NumericRange,
    pub search: Option<String>,
    satisfiable: bool,
}

impl Default for UniversityFilter {
    fn default() -> Self {
        Self {
            country: None,
            degree_level: None,
            tuition_fee: NumericRange::default(),
            min_gpa: NumericRange::default(),
            min_ielts: NumericRange::default(),
            search: None,
            satisfiable: true,
        }
    }
}

impl UniversityFilter {
    pub fn from_params(params: &UniversityListParams) -> Self {
        let mut satisfiable = true;
        let mut number = |raw: Option<&str>, default: Option<f64>| match present(raw) {
            Some(text) => match coerce_f64(text) {
                Some(value) => Some(value),
                None => {
                    satisfiable = false;
                    None
                }
            },
            None => default,
        };

        let tuition_fee = NumericRange {
            min: number(params.min_fee.as_deref(), Some(DEFAULT_MIN_FEE)),
            max: number(params.max_fee.as_deref(), Some(DEFAULT_MAX_FEE)),
        };
        let min_gpa = NumericRange {
            min: number(params.min_gpa.as_deref(), None),
            max: number(params.max_gpa.as_deref(), Some(DEFAULT_MAX_GPA)),
        };
        let min_ielts = NumericRange {
            min: number(params.min_ielts.as_deref(), None),
            max: number(params.max_ielts.as_deref(), Some(DEFAULT_MAX_IELTS)),
        };

        let country = present(params.country.as_deref())
            .filter(|country| *country != "All")
            .map(str::to_string);

        let degree_level = match present(params.degree.as_deref()) {
            None | Some("All") => None,
            Some(raw) => {
                let parsed = DegreeLevel::parse(raw);
                if parsed.is_none() {
                    satisfiable = false;
                }
                parsed
            }
        };

        let satisfiable = satisfiable
            && !tuition_fee.is_inverted()
            && !min_gpa.is_inverted()
            && !min_ielts.is_inverted();

        Self {
            country,
            degree_level,
            tuition_fee,
            min_gpa,
            min_ielts,
            search: present(params.search.as_deref()).map(str::to_string),
            satisfiable,
        }
    }

    /// False when a parameter failed to coerce or a range is inverted.
    pub fn is_satisfiable(&self) -> bool {
        self.satisfiable
    }

    pub fn to_document(&self) -> Document {
        let mut filter = doc! { "isActive": { "$ne": false } };
        if let Some(country) = &self.country {
            filter.insert("country", country.as_str());
        }
        if let Some(level) = self.degree_level {
            filter.insert("degreeLevel", level.label());
        }
        for (field, range) in [
            ("tuitionFee", &self.tuition_fee),
            ("minGPA", &self.min_gpa),
            ("minIELTS", &self.min_ielts),
        ] {
            if let Some(bounds) = range.to_document() {
                filter.insert(field, bounds);
            }
        }
        if let Some(search) = &self.search {
            filter.insert("$text", doc! { "$search": search.as_str() });
        }
        filter
    }

    pub fn matches(&self, university: &University) -> bool {
        self.satisfiable
            && university.is_active
            && self
                .country
                .as_deref()
                .map_or(true, |country| university.country == country)
            && self
                .degree_level
                .map_or(true, |level| university.degree_level == level)
            && self.tuition_fee.contains(university.tuition_fee)
            && self.min_gpa.contains(university.min_gpa)
            && self.min_ielts.contains(university.min_ielts)
            && self
                .search
                .as_deref()
                .map_or(true, |search| university.mentions(search))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UniversitySortField {
    #[default]
    Name,
    Country,
    TuitionFee,
    MinGpa,
    MinIelts,
    Ranking,
    CreatedAt,
}

impl UniversitySortField {
    /// Unknown fields sort by name.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "country" => Self::Country,
            "tuitionFee" => Self::TuitionFee,
            "minGPA" => Self::MinGpa,
            "minIELTS" => Self::MinIelts,
            "ranking" => Self::Ranking,
            "createdAt" => Self::CreatedAt,
            _ => Self::Name,
        }
    }

    pub const fn field(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Country => "country",
            Self::TuitionFee => "tuitionFee",
            Self::MinGpa => "minGPA",
            Self::MinIelts => "minIELTS",
            Self::Ranking => "ranking",
            Self::CreatedAt => "createdAt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UniversitySort {
    pub field: UniversitySortField,
    pub direction: SortDirection,
}

impl UniversitySort {
    pub fn from_params(sort: Option<&str>, order: Option<&str>) -> Self {
        let field = present(sort)
            .map(UniversitySortField::parse)
            .unwrap_or_default();
        let direction = match present(order) {
            Some(order) if order.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        };
        Self { field, direction }
    }

    pub fn to_document(&self) -> Document {
        with_tiebreak(self.field.field(), self.direction)
    }

    /// Missing rankings order before present ones, as they do in MongoDB.
    pub fn compare(&self, left: &University, right: &University) -> Ordering {
        let ordering = match self.field {
            UniversitySortField::Name => left.name.cmp(&right.name),
            UniversitySortField::Country => left.country.cmp(&right.country),
            UniversitySortField::TuitionFee => total_cmp(left.tuition_fee, right.tuition_fee),
            UniversitySortField::MinGpa => total_cmp(left.min_gpa, right.min_gpa),
            UniversitySortField::MinIelts => total_cmp(left.min_ielts, right.min_ielts),
            UniversitySortField::Ranking => left.ranking.cmp(&right.ranking),
            UniversitySortField::CreatedAt => left.created_at.cmp(&right.created_at),
        };
        self.direction
            .apply(ordering)
            .then_with(|| left.id.cmp(&right.id))
    }
}

fn total_cmp(left: f64, right: f64) -> Ordering {
    left.partial_cmp(&right).unwrap_or(Ordering::Equal)
}

/// Filter, sort, and page for a university listing.
#[derive(Debug, Clone, PartialEq)]
pub struct UniversityQuery {
    pub filter: UniversityFilter,
    pub sort: UniversitySort,
    pub pagination: Pagination,
}

impl UniversityQuery {
    pub fn from_params(params: &UniversityListParams) -> Self {
        Self {
            filter: UniversityFilter::from_params(params),
            sort: UniversitySort::from_params(params.sort.as_deref(), params.order.as_deref()),
            pagination: Pagination::from_params(
                params.page.as_deref(),
                params.limit.as_deref(),
                DEFAULT_UNIVERSITY_PAGE_SIZE,
            ),
        }
    }
}

impl From<UniversityListParams> for UniversityQuery {
    fn from(params: UniversityListParams) -> Self {
        Self::from_params(&params)
    }
}
