use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::Router;

use super::repository::UserRepository;
use super::service::AccountService;
use super::validation::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, ProfileUpdate, RegisterRequest,
    ResetPasswordRequest,
};
use super::views::{LoginView, ResetTicketView, UserView};
use crate::api::{AdminUser, ApiError, ApiJson, AuthUser, Envelope};

/// `/api/users` routes.
pub fn account_router<Us>(service: Arc<AccountService<Us>>) -> Router
where
    Us: UserRepository + 'static,
{
    Router::new()
        .route("/api/users", get(list_handler::<Us>))
        .route("/api/users/login", post(login_handler::<Us>))
        .route("/api/users/register", post(register_handler::<Us>))
        .route(
            "/api/users/profile",
            get(profile_handler::<Us>).put(update_profile_handler::<Us>),
        )
        .route("/api/users/change-password", put(change_password_handler::<Us>))
        .route("/api/users/forgot-password", post(forgot_password_handler::<Us>))
        .route(
            "/api/users/reset-password/:token",
            post(reset_password_handler::<Us>),
        )
        .with_state(service)
}

pub(crate) async fn login_handler<Us>(
    State(service): State<Arc<AccountService<Us>>>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Envelope<LoginView>, ApiError>
where
    Us: UserRepository + 'static,
{
    let session = service.login(request).await?;
    Ok(Envelope::ok(LoginView {
        token: session.token,
        user: UserView::from(session.user),
    })
    .with_message("Login successful"))
}

pub(crate) async fn register_handler<Us>(
    State(service): State<Arc<AccountService<Us>>>,
    AdminUser(_admin): AdminUser,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<Envelope<UserView>, ApiError>
where
    Us: UserRepository + 'static,
{
    let user = service.register(request).await?;
    Ok(Envelope::created(UserView::from(user)).with_message("User registered successfully"))
}

pub(crate) async fn profile_handler<Us>(
    State(service): State<Arc<AccountService<Us>>>,
    caller: AuthUser,
) -> Result<Envelope<UserView>, ApiError>
where
    Us: UserRepository + 'static,
{
    let user = service.profile(caller.id).await?;
    Ok(Envelope::ok(UserView::from(user)))
}

pub(crate) async fn update_profile_handler<Us>(
    State(service): State<Arc<AccountService<Us>>>,
    caller: AuthUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Envelope<UserView>, ApiError>
where
    Us: UserRepository + 'static,
{
    let user = service.update_profile(caller.id, update).await?;
    Ok(Envelope::ok(UserView::from(user)).with_message("Profile updated successfully"))
}

pub(crate) async fn change_password_handler<Us>(
    State(service): State<Arc<AccountService<Us>>>,
    caller: AuthUser,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> Result<Envelope<()>, ApiError>
where
    Us: UserRepository + 'static,
{
    service.change_password(caller.id, request).await?;
    Ok(Envelope::message("Password changed successfully"))
}

pub(crate) async fn list_handler<Us>(
    State(service): State<Arc<AccountService<Us>>>,
    AdminUser(_admin): AdminUser,
) -> Result<Envelope<Vec<UserView>>, ApiError>
where
    Us: UserRepository + 'static,
{
    let users = service.list().await?;
    Ok(Envelope::listed(users.iter().map(UserView::from).collect()))
}

pub(crate) async fn forgot_password_handler<Us>(
    State(service): State<Arc<AccountService<Us>>>,
    ApiJson(request): ApiJson<ForgotPasswordRequest>,
) -> Result<Envelope<ResetTicketView>, ApiError>
where
    Us: UserRepository + 'static,
{
    let ticket = service.forgot_password(request.email).await?;
    Ok(Envelope::ok(ResetTicketView {
        reset_token: ticket.token,
        expires_at: ticket.expires_at,
    })
    .with_message("Password reset token generated"))
}

pub(crate) async fn reset_password_handler<Us>(
    State(service): State<Arc<AccountService<Us>>>,
    Path(token): Path<String>,
    ApiJson(request): ApiJson<ResetPasswordRequest>,
) -> Result<Envelope<()>, ApiError>
where
    Us: UserRepository + 'static,
{
    service.reset_password(&token, request).await?;
    Ok(Envelope::message("Password reset successful"))
}
