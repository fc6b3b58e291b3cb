//! Backend for the Iniastra university application platform: the university
//! catalog, application intake and review, and staff accounts, served over axum
//! and stored in MongoDB.

pub mod accounts;
pub mod admissions;
pub mod api;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod query;
pub mod store;
pub mod telemetry;

mod validate;
