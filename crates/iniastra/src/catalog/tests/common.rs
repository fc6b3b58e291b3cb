use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::{Extension, Router};
use bson::oid::ObjectId;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::accounts::{Role, TokenAuthority, User};
use crate::catalog::{university_router, CatalogService, University, UniversityPayload};
use crate::clock::{Clock, FixedClock};
use crate::store::{MemoryApplicationRepository, MemoryUniversityRepository, Repositories};

pub(super) type MemoryCatalog = CatalogService<MemoryUniversityRepository, MemoryApplicationRepository>;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

pub(super) struct Harness {
    pub(super) service: Arc<MemoryCatalog>,
    pub(super) repositories: Repositories<
        MemoryUniversityRepository,
        MemoryApplicationRepository,
        crate::store::MemoryUserRepository,
    >,
    pub(super) clock: Arc<FixedClock>,
}

pub(super) fn build_service() -> Harness {
    let repositories = Repositories::in_memory();
    let clock = Arc::new(FixedClock::new(now()));
    let service = Arc::new(CatalogService::new(
        Arc::clone(&repositories.universities),
        Arc::clone(&repositories.applications),
        clock.clone() as Arc<dyn Clock>,
    ));
    Harness {
        service,
        repositories,
        clock,
    }
}

pub(super) fn payload(name: &str, country: &str, tuition_fee: f64) -> UniversityPayload {
    UniversityPayload {
        name: Some(name.to_string()),
        country: Some(country.to_string()),
        degree_level: Some("Masters".to_string()),
        programs: Some(vec!["Computer Science".to_string()]),
        min_gpa: Some(3.0),
        min_ielts: Some(6.5),
        tuition_fee: Some(tuition_fee),
        ..UniversityPayload::default()
    }
}

pub(super) async fn seed(service: &MemoryCatalog, name: &str, country: &str, fee: f64) -> University {
    service
        .create(payload(name, country, fee))
        .await
        .expect("university created")
}

pub(super) fn tokens(clock: Arc<FixedClock>) -> Arc<TokenAuthority> {
    Arc::new(TokenAuthority::new(
        b"catalog-secret",
        Duration::from_secs(3_600),
        clock,
    ))
}

/// Bearer token for a synthetic account; the extractors never look users up.
pub(super) fn bearer(tokens: &TokenAuthority, role: Role) -> String {
    let stamp = bson::DateTime::from_chrono(now());
    let user = User {
        id: ObjectId::new(),
        name: "Staff Member".to_string(),
        email: "staff@example.com".to_string(),
        password_hash: String::new(),
        role,
        department: None,
        is_active: true,
        last_login: None,
        password_reset_token: None,
        password_reset_expires: None,
        created_at: stamp,
        updated_at: stamp,
    };
    format!("Bearer {}", tokens.issue(&user).expect("token issued"))
}

pub(super) fn router(harness: &Harness) -> (Router, Arc<TokenAuthority>) {
    let tokens = tokens(harness.clock.clone());
    let router = university_router(Arc::clone(&harness.service)).layer(Extension(tokens.clone()));
    (router, tokens)
}

pub(super) fn request(
    method: Method,
    uri: &str,
    authorization: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(authorization) = authorization {
        builder = builder.header(header::AUTHORIZATION, authorization);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub(super) async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}
