use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::{Extension, Router};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::accounts::{account_router, AccountService, RegisterRequest, TokenAuthority, User};
use crate::clock::FixedClock;
use crate::store::MemoryUserRepository;

pub(super) const PASSWORD: &str = "s3cure-passphrase";

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 3, 8, 0, 0).unwrap()
}

pub(super) struct Harness {
    pub(super) service: Arc<AccountService<MemoryUserRepository>>,
    pub(super) users: Arc<MemoryUserRepository>,
    pub(super) tokens: Arc<TokenAuthority>,
    pub(super) clock: Arc<FixedClock>,
}

pub(super) fn build_service(expose_reset_token: bool) -> Harness {
    let users = Arc::new(MemoryUserRepository::default());
    let clock = Arc::new(FixedClock::new(now()));
    let tokens = Arc::new(TokenAuthority::new(
        b"accounts-secret",
        Duration::from_secs(7 * 24 * 3_600),
        clock.clone(),
    ));
    let service = Arc::new(AccountService::new(
        Arc::clone(&users),
        Arc::clone(&tokens),
        expose_reset_token,
    ));
    Harness {
        service,
        users,
        tokens,
        clock,
    }
}

pub(super) fn registration(name: &str, email: &str, role: Option<&str>) -> RegisterRequest {
    RegisterRequest {
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        password: Some(PASSWORD.to_string()),
        role: role.map(str::to_string),
        department: None,
    }
}

pub(super) async fn register(harness: &Harness, name: &str, email: &str, role: &str) -> User {
    harness
        .service
        .register(registration(name, email, Some(role)))
        .await
        .expect("registration succeeds")
}

pub(super) fn router(harness: &Harness) -> Router {
    account_router(Arc::clone(&harness.service)).layer(Extension(Arc::clone(&harness.tokens)))
}

pub(super) fn bearer_for(harness: &Harness, user: &User) -> String {
    format!(
        "Bearer {}",
        harness.tokens.issue(user).expect("token issued")
    )
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
