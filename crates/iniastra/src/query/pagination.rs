use std::cmp::Ordering;

use bson::Document;
use serde::Serialize;

use super::coerce::present;

pub const MAX_PAGE_SIZE: u64 = 100;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    /// Non-numeric or non-positive values fall back to the defaults; `limit` is clamped.
    pub fn from_params(page: Option<&str>, limit: Option<&str>, default_limit: u64) -> Self {
        let page = present(page)
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|page| *page >= 1)
            .unwrap_or(1);
        let limit = present(limit)
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|limit| *limit >= 1)
            .unwrap_or(default_limit)
            .min(MAX_PAGE_SIZE);

        Self { page, limit }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn meta(&self, count: usize, total: u64) -> PageMeta {
        let total_pages = total.div_ceil(self.limit);
        PageMeta {
            count,
            total,
            total_pages,
            current_page: self.page,
            has_next_page: self.page < total_pages,
            has_prev_page: self.page > 1,
        }
    }
}

/// Metadata flattened into list envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub count: usize,
    pub total: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

/// One page of records plus the unpaged total.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn empty(pagination: Pagination) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            pagination,
        }
    }

    pub fn meta(&self) -> PageMeta {
        self.pagination.meta(self.items.len(), self.total)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            pagination: self.pagination,
        }
    }

    /// Slices an already filtered and sorted result set.
    pub fn from_sorted(records: Vec<T>, pagination: Pagination) -> Self {
        let total = records.len() as u64;
        let items = records
            .into_iter()
            .skip(pagination.skip() as usize)
            .take(pagination.limit as usize)
            .collect();
        Self {
            items,
            total,
            pagination,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn contains(&self, value: f64) -> bool {
        self.min.map(|min| value >= min).unwrap_or(true)
            && self.max.map(|max| value <= max).unwrap_or(true)
    }

    pub fn is_inverted(&self) -> bool {
        matches!((self.min, self.max), (Some(min), Some(max)) if min > max)
    }

    pub fn to_document(&self) -> Option<Document> {
        let mut bounds = Document::new();
        if let Some(min) = self.min {
            bounds.insert("$gte", min);
        }
        if let Some(max) = self.max {
            bounds.insert("$lte", max);
        }
        (!bounds.is_empty()).then_some(bounds)
    }
}

pub(crate) fn with_tiebreak(field: &str, direction: SortDirection) -> Document {
    let mut sort = Document::new();
    sort.insert(field, direction.as_i32());
    sort.insert("_id", 1);
    sort
}
