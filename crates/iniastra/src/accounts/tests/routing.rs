use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::accounts::UserRepository;

#[tokio::test]
async fn login_returns_token_and_safe_user() {
    let harness = build_service(false);
    register(&harness, "Avery Admin", "avery@example.com", "admin").await;

    let response = router(&harness)
        .oneshot(request(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({ "email": "avery@example.com", "password": PASSWORD })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["message"], "Login successful");
    assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["data"]["user"]["role"], "admin");
    assert!(body["data"]["user"].get("password").is_none());
    assert!(body["data"]["user"].get("passwordResetToken").is_none());
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let harness = build_service(false);
    register(&harness, "Avery Admin", "avery@example.com", "admin").await;

    let response = router(&harness)
        .oneshot(request(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({ "email": "avery@example.com", "password": "nope-nope" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["message"],
        "Invalid email or password"
    );
}

#[tokio::test]
async fn registration_is_admin_only() {
    let harness = build_service(false);
    let admin = register(&harness, "Avery Admin", "avery@example.com", "admin").await;
    let reviewer = register(&harness, "Riley", "riley@example.com", "reviewer").await;
    let app = router(&harness);
    let new_user = json!({
        "name": "Officer Oak",
        "email": "oak@example.com",
        "password": "long-enough-pw",
        "role": "admission_officer"
    });

    let denied = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/users/register",
            Some(&bearer_for(&harness, &reviewer)),
            Some(new_user.clone()),
        ))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let created = app
        .oneshot(request(
            Method::POST,
            "/api/users/register",
            Some(&bearer_for(&harness, &admin)),
            Some(new_user),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = body_json(created).await;
    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["data"]["role"], "admission_officer");
}

#[tokio::test]
async fn profile_reads_the_token_subject() {
    let harness = build_service(false);
    let user = register(&harness, "Riley", "riley@example.com", "reviewer").await;
    let app = router(&harness);

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            "/api/users/profile",
            Some(&bearer_for(&harness, &user)),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["email"], "riley@example.com");

    let anonymous = app
        .oneshot(request(Method::GET, "/api/users/profile", None, None))
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deactivated_accounts_lose_their_own_routes() {
    let harness = build_service(false);
    let mut user = register(&harness, "Former Staff", "former@example.com", "reviewer").await;
    let token = bearer_for(&harness, &user);
    user.is_active = false;
    harness.users.replace(user).await.expect("deactivated");
    let app = router(&harness);

    let profile = app
        .clone()
        .oneshot(request(Method::GET, "/api/users/profile", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(profile.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(profile).await["message"],
        "Your account has been deactivated"
    );

    let password = app
        .oneshot(request(
            Method::PUT,
            "/api/users/change-password",
            Some(&token),
            Some(json!({ "currentPassword": PASSWORD, "newPassword": "another-passphrase" })),
        ))
        .await
        .unwrap();
    assert_eq!(password.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_tokens_are_rejected() {
    let harness = build_service(false);
    let user = register(&harness, "Riley", "riley@example.com", "reviewer").await;
    let token = bearer_for(&harness, &user);

    harness.clock.advance(chrono::Duration::days(8));
    let response = router(&harness)
        .oneshot(request(Method::GET, "/api/users/profile", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["message"],
        "Not authorized, token is invalid or expired"
    );
}

#[tokio::test]
async fn user_listing_counts_accounts() {
    let harness = build_service(false);
    let admin = register(&harness, "Avery Admin", "avery@example.com", "admin").await;
    register(&harness, "Riley", "riley@example.com", "reviewer").await;

    let response = router(&harness)
        .oneshot(request(
            Method::GET,
            "/api/users",
            Some(&bearer_for(&harness, &admin)),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["count"], 2);
}

#[tokio::test]
async fn password_reset_round_trip_over_http() {
    let harness = build_service(true);
    register(&harness, "Drew", "drew@example.com", "reviewer").await;
    let app = router(&harness);

    let forgot = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/users/forgot-password",
            None,
            Some(json!({ "email": "drew@example.com" })),
        ))
        .await
        .unwrap();
    assert_eq!(forgot.status(), StatusCode::OK);
    let body = body_json(forgot).await;
    let token = body["data"]["resetToken"]
        .as_str()
        .expect("token exposed")
        .to_string();

    let reset = app
        .clone()
        .oneshot(request(
            Method::POST,
            &format!("/api/users/reset-password/{token}"),
            None,
            Some(json!({ "password": "brand-new-pass" })),
        ))
        .await
        .unwrap();
    assert_eq!(reset.status(), StatusCode::OK);
    assert_eq!(body_json(reset).await["message"], "Password reset successful");

    let reused = app
        .oneshot(request(
            Method::POST,
            &format!("/api/users/reset-password/{token}"),
            None,
            Some(json!({ "password": "brand-new-pass" })),
        ))
        .await
        .unwrap();
    assert_eq!(reused.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(reused).await["message"],
        "Token is invalid or has expired"
    );
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let harness = build_service(false);
    let response = router(&harness)
        .oneshot(
            axum::http::Request::builder()
                .method(Method::POST)
                .uri("/api/users/login")
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["status"], "error");
}
