use chrono::Duration;

use super::common::*;
use crate::accounts::{
    AccountError, ChangePasswordRequest, LoginRequest, ProfileUpdate, ResetPasswordRequest, Role,
    UserRepository,
};

fn login(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: Some(email.to_string()),
        password: Some(password.to_string()),
    }
}

#[tokio::test]
async fn login_issues_a_token_and_records_the_visit() {
    let harness = build_service(false);
    let user = register(&harness, "Avery Admin", "avery@example.com", "admin").await;
    assert!(user.last_login.is_none());

    let session = harness
        .service
        .login(login("AVERY@example.com", PASSWORD))
        .await
        .expect("login succeeds");
    let claims = harness.tokens.verify(&session.token).expect("token verifies");
    assert_eq!(claims.user_id(), Some(user.id));
    assert_eq!(claims.role, Role::Admin);
    assert_eq!(
        session.user.last_login.map(|at| at.to_chrono()),
        Some(now())
    );
}

#[tokio::test]
async fn login_failures_do_not_reveal_which_part_was_wrong() {
    let harness = build_service(false);
    register(&harness, "Avery Admin", "avery@example.com", "admin").await;

    assert!(matches!(
        harness.service.login(login("avery@example.com", "wrong-password")).await,
        Err(AccountError::InvalidCredentials)
    ));
    assert!(matches!(
        harness.service.login(login("nobody@example.com", PASSWORD)).await,
        Err(AccountError::InvalidCredentials)
    ));
    assert!(matches!(
        harness.service.login(LoginRequest::default()).await,
        Err(AccountError::MissingCredentials)
    ));
}

#[tokio::test]
async fn deactivated_accounts_cannot_log_in() {
    let harness = build_service(false);
    let mut user = register(&harness, "Former Staff", "former@example.com", "reviewer").await;
    user.is_active = false;
    harness.users.replace(user).await.expect("deactivated");

    assert!(matches!(
        harness.service.login(login("former@example.com", PASSWORD)).await,
        Err(AccountError::Deactivated)
    ));
}

#[tokio::test]
async fn registration_rejects_duplicate_emails() {
    let harness = build_service(false);
    let user = harness
        .service
        .register(registration("Rowan", "rowan@example.com", None))
        .await
        .expect("registered");
    assert_eq!(user.role, Role::Reviewer);
    assert!(user.password_hash.starts_with("$argon2"));

    assert!(matches!(
        harness
            .service
            .register(registration("Rowan Again", "Rowan@Example.com", None))
            .await,
        Err(AccountError::EmailTaken)
    ));
}

#[tokio::test]
async fn profile_updates_keep_emails_unique() {
    let harness = build_service(false);
    let first = register(&harness, "First", "first@example.com", "reviewer").await;
    register(&harness, "Second", "second@example.com", "reviewer").await;

    let updated = harness
        .service
        .update_profile(
            first.id,
            ProfileUpdate {
                name: Some("First Renamed".into()),
                department: Some("Graduate Admissions".into()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .expect("profile updated");
    assert_eq!(updated.name, "First Renamed");
    assert_eq!(updated.email, "first@example.com");
    assert_eq!(updated.department.as_deref(), Some("Graduate Admissions"));

    assert!(matches!(
        harness
            .service
            .update_profile(
                first.id,
                ProfileUpdate {
                    email: Some("second@example.com".into()),
                    ..ProfileUpdate::default()
                },
            )
            .await,
        Err(AccountError::EmailTaken)
    ));
}

#[tokio::test]
async fn changing_passwords_checks_the_current_one() {
    let harness = build_service(false);
    let user = register(&harness, "Casey", "casey@example.com", "admission_officer").await;

    assert!(matches!(
        harness
            .service
            .change_password(
                user.id,
                ChangePasswordRequest {
                    current_password: Some("not-it".into()),
                    new_password: Some("another-passphrase".into()),
                },
            )
            .await,
        Err(AccountError::IncorrectPassword)
    ));

    harness
        .service
        .change_password(
            user.id,
            ChangePasswordRequest {
                current_password: Some(PASSWORD.into()),
                new_password: Some("another-passphrase".into()),
            },
        )
        .await
        .expect("password changed");
    harness
        .service
        .login(login("casey@example.com", "another-passphrase"))
        .await
        .expect("new password works");
}

#[tokio::test]
async fn reset_tokens_are_single_use() {
    let harness = build_service(true);
    register(&harness, "Drew", "drew@example.com", "reviewer").await;

    let ticket = harness
        .service
        .forgot_password(Some("drew@example.com".into()))
        .await
        .expect("ticket issued");
    assert_eq!(ticket.expires_at, now() + Duration::minutes(30));
    let token = ticket.token.expect("token exposed");

    let stored = harness
        .users
        .find_by_email("drew@example.com")
        .await
        .expect("lookup")
        .expect("user");
    assert_ne!(stored.password_reset_token.as_deref(), Some(token.as_str()));

    harness
        .service
        .reset_password(
            &token,
            ResetPasswordRequest {
                password: Some("fresh-passphrase".into()),
            },
        )
        .await
        .expect("reset succeeds");
    harness
        .service
        .login(login("drew@example.com", "fresh-passphrase"))
        .await
        .expect("reset password works");

    assert!(matches!(
        harness
            .service
            .reset_password(
                &token,
                ResetPasswordRequest {
                    password: Some("third-passphrase".into()),
                },
            )
            .await,
        Err(AccountError::InvalidResetToken)
    ));
}

#[tokio::test]
async fn reset_tokens_expire_after_thirty_minutes() {
    let harness = build_service(true);
    register(&harness, "Eden", "eden@example.com", "reviewer").await;
    let token = harness
        .service
        .forgot_password(Some("eden@example.com".into()))
        .await
        .expect("ticket issued")
        .token
        .expect("token exposed");

    harness.clock.advance(Duration::minutes(31));
    assert!(matches!(
        harness
            .service
            .reset_password(
                &token,
                ResetPasswordRequest {
                    password: Some("late-passphrase".into()),
                },
            )
            .await,
        Err(AccountError::InvalidResetToken)
    ));
}

#[tokio::test]
async fn reset_tokens_stay_private_unless_exposed() {
    let harness = build_service(false);
    register(&harness, "Finley", "finley@example.com", "reviewer").await;
    let ticket = harness
        .service
        .forgot_password(Some("finley@example.com".into()))
        .await
        .expect("ticket issued");
    assert!(ticket.token.is_none());

    assert!(matches!(
        harness
            .service
            .forgot_password(Some("ghost@example.com".into()))
            .await,
        Err(AccountError::NotFound)
    ));
}

#[tokio::test]
async fn bootstrap_creates_an_administrator() {
    let harness = build_service(false);
    let admin = harness
        .service
        .bootstrap_admin("Root Admin", "root@example.com", PASSWORD)
        .await
        .expect("admin created");
    assert_eq!(admin.role, Role::Admin);
    assert_eq!(harness.service.list().await.expect("list").len(), 1);
}
