use std::cmp::Ordering;

use bson::oid::ObjectId;
use bson::{doc, Document};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use super::coerce::{escape_regex, is_date_only, parse_object_id, parse_timestamp, present};
use super::pagination::{with_tiebreak, Pagination, SortDirection};
use crate::admissions::{Application, ApplicationStatus};

pub const DEFAULT_APPLICATION_PAGE_SIZE: u64 = 20;

/// Raw `GET /api/applications` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationListParams {
    pub status: Option<String>,
    #[serde(rename = "universityId")]
    pub university_id: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    pub university_id: Option<ObjectId>,
    pub email: Option<String>,
    /// Inclusive bounds on `createdAt`.
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub search: Option<String>,
    satisfiable: bool,
}

impl Default for ApplicationFilter {
    fn default() -> Self {
        Self {
            status: None,
            university_id: None,
            email: None,
            created_from: None,
            created_to: None,
            search: None,
            satisfiable: true,
        }
    }
}

impl ApplicationFilter {
    pub fn from_params(params: &ApplicationListParams) -> Self {
        let mut satisfiable = true;

        let status = match present(params.status.as_deref()) {
            None | Some("All") => None,
            Some(raw) => {
                let parsed = ApplicationStatus::parse(raw);
                satisfiable &= parsed.is_some();
                parsed
            }
        };

        let university_id = present(params.university_id.as_deref()).and_then(|raw| {
            let parsed = parse_object_id(raw);
            satisfiable &= parsed.is_some();
            parsed
        });

        let created_from = present(params.start_date.as_deref()).and_then(|raw| {
            let parsed = parse_timestamp(raw);
            satisfiable &= parsed.is_some();
            parsed
        });

        // A bare end date covers that whole day.
        let created_to = present(params.end_date.as_deref()).and_then(|raw| {
            let parsed = parse_timestamp(raw);
            satisfiable &= parsed.is_some();
            if is_date_only(raw) {
                parsed.map(|day| day + Duration::days(1) - Duration::milliseconds(1))
            } else {
                parsed
            }
        });

        if let (Some(from), Some(to)) = (created_from, created_to) {
            satisfiable &= from <= to;
        }

        Self {
            status,
            university_id,
            email: present(params.email.as_deref()).map(str::to_lowercase),
            created_from,
            created_to,
            search: present(params.search.as_deref()).map(str::to_string),
            satisfiable,
        }
    }

    pub fn for_student(email: &str) -> Self {
        Self {
            email: Some(email.trim().to_lowercase()),
            ..Self::default()
        }
    }

    pub fn is_satisfiable(&self) -> bool {
        self.satisfiable
    }

    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        if let Some(status) = self.status {
            filter.insert("status", status.label());
        }
        if let Some(university_id) = self.university_id {
            filter.insert("universityId", university_id);
        }
        if let Some(email) = &self.email {
            filter.insert("email", email.as_str());
        }

        let mut created = Document::new();
        if let Some(from) = self.created_from {
            created.insert("$gte", bson::DateTime::from_chrono(from));
        }
        if let Some(to) = self.created_to {
            created.insert("$lte", bson::DateTime::from_chrono(to));
        }
        if !created.is_empty() {
            filter.insert("createdAt", created);
        }

        if let Some(search) = &self.search {
            let pattern = escape_regex(search);
            filter.insert(
                "$or",
                vec![
                    doc! { "studentName": { "$regex": pattern.as_str(), "$options": "i" } },
                    doc! { "email": { "$regex": pattern.as_str(), "$options": "i" } },
                ],
            );
        }
        filter
    }

    pub fn matches(&self, application: &Application) -> bool {
        if !self.satisfiable {
            return false;
        }

        let created_at = application.created_at.to_chrono();
        self.status.map_or(true, |status| application.status == status)
            && self
                .university_id
                .map_or(true, |id| application.university_id == id)
            && self
                .email
                .as_deref()
                .map_or(true, |email| application.email == email)
            && self.created_from.map_or(true, |from| created_at >= from)
            && self.created_to.map_or(true, |to| created_at <= to)
            && self.search.as_deref().map_or(true, |search| {
                let needle = search.to_lowercase();
                application.student_name.to_lowercase().contains(&needle)
                    || application.email.to_lowercase().contains(&needle)
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplicationSortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Gpa,
    Ielts,
    StudentName,
    Status,
}

impl ApplicationSortField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "createdAt" => Some(Self::CreatedAt),
            "updatedAt" => Some(Self::UpdatedAt),
            "gpa" => Some(Self::Gpa),
            "ielts" => Some(Self::Ielts),
            "studentName" => Some(Self::StudentName),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    pub const fn field(self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
            Self::Gpa => "gpa",
            Self::Ielts => "ielts",
            Self::StudentName => "studentName",
            Self::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationSort {
    pub field: ApplicationSortField,
    pub direction: SortDirection,
}

impl Default for ApplicationSort {
    /// Newest first.
    fn default() -> Self {
        Self {
            field: ApplicationSortField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

impl ApplicationSort {
    /// Parses `field` or `-field`; unknown fields fall back to `-createdAt`.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = present(raw) else {
            return Self::default();
        };
        let (direction, name) = match raw.strip_prefix('-') {
            Some(name) => (SortDirection::Desc, name),
            None => (SortDirection::Asc, raw.strip_prefix('+').unwrap_or(raw)),
        };
        match ApplicationSortField::parse(name) {
            Some(field) => Self { field, direction },
            None => Self::default(),
        }
    }

    pub fn to_document(&self) -> Document {
        with_tiebreak(self.field.field(), self.direction)
    }

    pub fn compare(&self, left: &Application, right: &Application) -> Ordering {
        let ordering = match self.field {
            ApplicationSortField::CreatedAt => left.created_at.cmp(&right.created_at),
            ApplicationSortField::UpdatedAt => left.updated_at.cmp(&right.updated_at),
            ApplicationSortField::Gpa => left.gpa.partial_cmp(&right.gpa).unwrap_or(Ordering::Equal),
            ApplicationSortField::Ielts => left
                .ielts
                .partial_cmp(&right.ielts)
                .unwrap_or(Ordering::Equal),
            ApplicationSortField::StudentName => left.student_name.cmp(&right.student_name),
            ApplicationSortField::Status => left.status.label().cmp(right.status.label()),
        };
        self.direction
            .apply(ordering)
            .then_with(|| left.id.cmp(&right.id))
    }
}

/// Filter, sort, and page for an application listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationQuery {
    pub filter: ApplicationFilter,
    pub sort: ApplicationSort,
    pub pagination: Pagination,
}

impl ApplicationQuery {
    pub fn from_params(params: &ApplicationListParams) -> Self {
        Self {
            filter: ApplicationFilter::from_params(params),
            sort: ApplicationSort::parse(params.sort.as_deref()),
            pagination: Pagination::from_params(
                params.page.as_deref(),
                params.limit.as_deref(),
                DEFAULT_APPLICATION_PAGE_SIZE,
            ),
        }
    }
}

impl From<ApplicationListParams> for ApplicationQuery {
    fn from(params: ApplicationListParams) -> Self {
        Self::from_params(&params)
    }
}
