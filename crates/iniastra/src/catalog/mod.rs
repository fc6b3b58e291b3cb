//! University catalog: records, filtered listing, comparison, eligibility checks,
//! aggregate stats, and the CSV seed importer.

pub mod domain;
pub mod import;
pub mod repository;
pub mod router;
pub mod service;
pub mod stats;
pub mod validation;
pub mod views;

#[cfg(test)]
mod tests;

pub use domain::{DegreeLevel, IntakeSeason, University};
pub use import::{bundled_catalog, load_catalog, parse_catalog, seed_catalog, SeedError};
pub use repository::UniversityRepository;
pub use router::university_router;
pub use service::{CatalogError, CatalogService, EligibilityRequest, UniversityDetail};
pub use stats::{CountBucket, UniversityOverview, UniversityStats};
pub use validation::{apply_update, build_university, UniversityPayload};
pub use views::{
    ComparisonView, EligibilityView, SimilarUniversityView, UniversityDetailView, UniversityView,
};
