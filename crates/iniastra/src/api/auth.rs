use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use bson::oid::ObjectId;
use tracing::debug;

use super::error::ApiError;
use crate::accounts::{Role, TokenAuthority};

/// Roles allowed through staff-only routes.
pub const STAFF_ROLES: [Role; 3] = [Role::Admin, Role::Reviewer, Role::AdmissionOfficer];

/// Caller identified by a valid bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: ObjectId,
    pub role: Role,
}

impl AuthUser {
    pub fn require(self, allowed: &[Role]) -> Result<Self, ApiError> {
        if allowed.contains(&self.role) {
            Ok(self)
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tokens = parts
            .extensions
            .get::<Arc<TokenAuthority>>()
            .cloned()
            .ok_or_else(|| {
                ApiError::internal("Authentication is not configured", "missing token authority")
            })?;

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                ApiError::Unauthorized("Not authorized, no token provided".to_string())
            })?;

        let claims = tokens.verify(token).map_err(|err| {
            debug!(error = %err, "bearer token rejected");
            ApiError::Unauthorized("Not authorized, token is invalid or expired".to_string())
        })?;
        let id = claims.user_id().ok_or_else(|| {
            ApiError::Unauthorized("Not authorized, token is invalid or expired".to_string())
        })?;

        Ok(Self {
            id,
            role: claims.role,
        })
    }
}

/// Any staff role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaffUser(pub AuthUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for StaffUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        user.require(&STAFF_ROLES).map(Self)
    }
}

/// Administrators only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminUser(pub AuthUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        user.require(&[Role::Admin]).map(Self)
    }
}
