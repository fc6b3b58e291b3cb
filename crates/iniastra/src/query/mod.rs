//! Translation of HTTP query parameters into backend-neutral filter, sort, and page values.
//!
//! Each filter renders to a BSON document for MongoDB and also evaluates in-process so the
//! in-memory store answers the same questions. Parameters are only coerced, never
//! validated: anything that fails to coerce makes the filter unsatisfiable and the listing
//! comes back empty.

mod application;
mod coerce;
mod pagination;
mod university;

pub use application::{
    ApplicationFilter, ApplicationListParams, ApplicationQuery, ApplicationSort,
    ApplicationSortField,
};
pub use coerce::{lenient_f64, parse_object_id, parse_timestamp};
pub use pagination::{NumericRange, Page, PageMeta, Pagination, SortDirection};
pub use university::{
    UniversityFilter, UniversityListParams, UniversityQuery, UniversitySort, UniversitySortField,
};

pub(crate) use coerce::{coerce_f64, escape_regex, present};
