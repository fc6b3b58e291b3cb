use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::{Extension, Router};
use bson::oid::ObjectId;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::accounts::{Role, TokenAuthority, User, UserRepository};
use crate::admissions::{application_router, AdmissionsService, ApplicationSubmission};
use crate::catalog::{build_university, University, UniversityPayload, UniversityRepository};
use crate::clock::{Clock, FixedClock};
use crate::store::{
    MemoryApplicationRepository, MemoryUniversityRepository, MemoryUserRepository, Repositories,
};

pub(super) type MemoryAdmissions =
    AdmissionsService<MemoryApplicationRepository, MemoryUniversityRepository, MemoryUserRepository>;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 12, 14, 30, 0).unwrap()
}

pub(super) struct Harness {
    pub(super) service: Arc<MemoryAdmissions>,
    pub(super) repositories:
        Repositories<MemoryUniversityRepository, MemoryApplicationRepository, MemoryUserRepository>,
    pub(super) clock: Arc<FixedClock>,
    pub(super) university: University,
}

/// Service over empty stores plus one active university requiring GPA 3.0 and IELTS 6.5.
pub(super) async fn build_service() -> Harness {
    let repositories = Repositories::in_memory();
    let clock = Arc::new(FixedClock::new(now()));
    let service = Arc::new(AdmissionsService::new(
        Arc::clone(&repositories.applications),
        Arc::clone(&repositories.universities),
        Arc::clone(&repositories.users),
        clock.clone() as Arc<dyn Clock>,
    ));
    let university = insert_university(&repositories.universities, "Northfield University").await;
    Harness {
        service,
        repositories,
        clock,
        university,
    }
}

pub(super) async fn insert_university(
    universities: &MemoryUniversityRepository,
    name: &str,
) -> University {
    let university = build_university(
        UniversityPayload {
            name: Some(name.to_string()),
            country: Some("Ireland".to_string()),
            degree_level: Some("Masters".to_string()),
            min_gpa: Some(3.0),
            min_ielts: Some(6.5),
            tuition_fee: Some(18_000.0),
            ..UniversityPayload::default()
        },
        now(),
    )
    .expect("valid university");
    universities
        .insert(university)
        .await
        .expect("university stored")
}

pub(super) fn submission(university: &University, email: &str, gpa: f64, ielts: f64) -> ApplicationSubmission {
    ApplicationSubmission {
        student_name: Some("Jordan Applicant".to_string()),
        email: Some(email.to_string()),
        gpa: Some(gpa),
        ielts: Some(ielts),
        university_id: Some(university.id.to_hex()),
        program_applied: Some("Data Science".to_string()),
        application_fee: Some(75.0),
        ..ApplicationSubmission::default()
    }
}

pub(super) fn staff(name: &str, role: Role) -> User {
    let stamp = bson::DateTime::from_chrono(now());
    User {
        id: ObjectId::new(),
        name: name.to_string(),
        email: format!("{}@northfield.example", name.to_lowercase().replace(' ', ".")),
        password_hash: String::new(),
        role,
        department: Some("Admissions".to_string()),
        is_active: true,
        last_login: None,
        password_reset_token: None,
        password_reset_expires: None,
        created_at: stamp,
        updated_at: stamp,
    }
}

pub(super) async fn insert_staff(users: &MemoryUserRepository, name: &str, role: Role) -> User {
    users.insert(staff(name, role)).await.expect("user stored")
}

pub(super) fn router(harness: &Harness) -> (Router, Arc<TokenAuthority>) {
    let tokens = Arc::new(TokenAuthority::new(
        b"admissions-secret",
        Duration::from_secs(3_600),
        harness.clock.clone(),
    ));
    let router = application_router(Arc::clone(&harness.service)).layer(Extension(tokens.clone()));
    (router, tokens)
}

pub(super) fn bearer(tokens: &TokenAuthority, role: Role) -> String {
    let user = staff("Token Holder", role);
    format!("Bearer {}", tokens.issue(&user).expect("token issued"))
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
