use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use super::domain::{Role, User};
use super::password::{hash_password, verify_password};
use super::repository::UserRepository;
use super::reset::{digest_reset_token, issue_reset_token, RESET_TOKEN_TTL_MINUTES};
use super::token::TokenAuthority;
use super::validation::{
    check_password, validate_profile_update, validate_registration, ChangePasswordRequest,
    LoginRequest, ProfileUpdate, RegisterRequest, ResetPasswordRequest,
};
use crate::clock::Clock;
use crate::store::RepositoryError;
use crate::validate::trimmed;

/// Issued session token plus the account it belongs to.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// A freshly issued reset token. `token` is only populated when echoing it is allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResetTicket {
    pub token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Staff accounts: login, self-service profile, admin registration, password reset.
pub struct AccountService<Us> {
    users: Arc<Us>,
    tokens: Arc<TokenAuthority>,
    expose_reset_token: bool,
}

impl<Us> AccountService<Us>
where
    Us: UserRepository + 'static,
{
    pub fn new(users: Arc<Us>, tokens: Arc<TokenAuthority>, expose_reset_token: bool) -> Self {
        Self {
            users,
            tokens,
            expose_reset_token,
        }
    }

    fn clock(&self) -> &Arc<dyn Clock> {
        self.tokens.clock()
    }

    pub async fn login(&self, request: LoginRequest) -> Result<Session, AccountError> {
        let (Some(email), Some(password)) = (trimmed(request.email), request.password) else {
            return Err(AccountError::MissingCredentials);
        };

        let mut user = self
            .users
            .find_by_email(&email.to_lowercase())
            .await?
            .ok_or(AccountError::InvalidCredentials)?;
        if !verify_password(&password, &user.password_hash) {
            warn!(user_id = %user.id, "login rejected: wrong password");
            return Err(AccountError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AccountError::Deactivated);
        }

        let now = bson::DateTime::from_chrono(self.clock().now());
        user.last_login = Some(now);
        user.updated_at = now;
        self.users.replace(user.clone()).await?;

        let token = self.tokens.issue(&user)?;
        info!(user_id = %user.id, role = %user.role, "user logged in");
        Ok(Session { token, user })
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<User, AccountError> {
        let account = validate_registration(request).map_err(AccountError::Invalid)?;
        if self.users.find_by_email(&account.email).await?.is_some() {
            return Err(AccountError::EmailTaken);
        }

        let now = bson::DateTime::from_chrono(self.clock().now());
        let user = User {
            id: ObjectId::new(),
            name: account.name,
            email: account.email,
            password_hash: hash_password(&account.password)
                .map_err(|err| AccountError::Hashing(err.to_string()))?,
            role: account.role,
            department: account.department,
            is_active: true,
            last_login: None,
            password_reset_token: None,
            password_reset_expires: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self.users.insert(user).await.map_err(conflict_as_taken)?;
        info!(user_id = %stored.id, role = %stored.role, "user registered");
        Ok(stored)
    }

    /// Creates the first administrator from the command line.
    pub async fn bootstrap_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AccountError> {
        self.register(RegisterRequest {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            role: Some(Role::Admin.label().to_string()),
            department: None,
        })
        .await
    }

    /// The caller's own account. Tokens outlive deactivation, so this refuses
    /// deactivated accounts.
    pub async fn profile(&self, id: ObjectId) -> Result<User, AccountError> {
        let user = self.users.find(id).await?.ok_or(AccountError::NotFound)?;
        if !user.is_active {
            return Err(AccountError::Deactivated);
        }
        Ok(user)
    }

    pub async fn update_profile(
        &self,
        id: ObjectId,
        update: ProfileUpdate,
    ) -> Result<User, AccountError> {
        let changes = validate_profile_update(update).map_err(AccountError::Invalid)?;
        let mut user = self.profile(id).await?;

        if let Some(email) = changes.email {
            if email != user.email {
                if self.users.find_by_email(&email).await?.is_some() {
                    return Err(AccountError::EmailTaken);
                }
                user.email = email;
            }
        }
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(department) = changes.department {
            user.department = Some(department);
        }
        user.updated_at = bson::DateTime::from_chrono(self.clock().now());

        self.users
            .replace(user.clone())
            .await
            .map_err(conflict_as_taken)?;
        Ok(user)
    }

    pub async fn change_password(
        &self,
        id: ObjectId,
        request: ChangePasswordRequest,
    ) -> Result<(), AccountError> {
        let mut user = self.profile(id).await?;
        let current = request.current_password.unwrap_or_default();
        if !verify_password(&current, &user.password_hash) {
            return Err(AccountError::IncorrectPassword);
        }

        let mut errors = Vec::new();
        let new_password =
            check_password(request.new_password, &mut errors).ok_or(AccountError::Invalid(errors))?;
        self.set_password(&mut user, &new_password)?;
        self.users.replace(user).await?;
        info!(user_id = %id, "password changed");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<User>, AccountError> {
        Ok(self.users.list().await?)
    }

    /// Stores the digest of a new reset token valid for thirty minutes.
    pub async fn forgot_password(&self, email: Option<String>) -> Result<ResetTicket, AccountError> {
        let email = trimmed(email)
            .map(|email| email.to_lowercase())
            .ok_or_else(|| AccountError::Invalid(vec!["Email is required".to_string()]))?;
        let mut user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AccountError::NotFound)?;

        let issued = issue_reset_token();
        let expires_at = self.clock().now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        user.password_reset_token = Some(issued.digest);
        user.password_reset_expires = Some(bson::DateTime::from_chrono(expires_at));
        user.updated_at = bson::DateTime::from_chrono(self.clock().now());
        self.users.replace(user.clone()).await?;

        info!(user_id = %user.id, "password reset token issued");
        Ok(ResetTicket {
            token: self.expose_reset_token.then_some(issued.token),
            expires_at,
        })
    }

    /// One-time use: the stored digest is cleared on success.
    pub async fn reset_password(
        &self,
        token: &str,
        request: ResetPasswordRequest,
    ) -> Result<(), AccountError> {
        let digest = digest_reset_token(token.trim());
        let mut user = self
            .users
            .find_by_reset_token(&digest, self.clock().now())
            .await?
            .ok_or(AccountError::InvalidResetToken)?;

        let mut errors = Vec::new();
        let password =
            check_password(request.password, &mut errors).ok_or(AccountError::Invalid(errors))?;
        self.set_password(&mut user, &password)?;
        user.clear_reset();
        self.users.replace(user.clone()).await?;
        info!(user_id = %user.id, "password reset");
        Ok(())
    }

    fn set_password(&self, user: &mut User, password: &str) -> Result<(), AccountError> {
        user.password_hash =
            hash_password(password).map_err(|err| AccountError::Hashing(err.to_string()))?;
        user.updated_at = bson::DateTime::from_chrono(self.clock().now());
        Ok(())
    }
}

fn conflict_as_taken(error: RepositoryError) -> AccountError {
    match error {
        RepositoryError::Conflict => AccountError::EmailTaken,
        other => AccountError::Repository(other),
    }
}

/// Error type for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("email and password are required")]
    MissingCredentials,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("account has been deactivated")]
    Deactivated,
    #[error("current password is incorrect")]
    IncorrectPassword,
    #[error("a user with this email already exists")]
    EmailTaken,
    #[error("account failed validation: {}", .0.join(", "))]
    Invalid(Vec<String>),
    #[error("user not found")]
    NotFound,
    #[error("reset token is invalid or has expired")]
    InvalidResetToken,
    #[error("token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
