use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use tracing::error;

use crate::accounts::AccountError;
use crate::admissions::AdmissionsError;
use crate::catalog::CatalogError;
use crate::store::RepositoryError;

pub const FORBIDDEN_MESSAGE: &str = "You do not have permission to perform this action";
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests, please try again later.";

/// Transport error rendered as the JSON error envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation error")]
    Validation(Vec<String>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{message}")]
    Rejected { message: String, data: Value },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{}", FORBIDDEN_MESSAGE)]
    Forbidden,
    #[error("{}", RATE_LIMITED_MESSAGE)]
    TooManyRequests,
    #[error("{context}")]
    Internal {
        context: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApiError {
    pub fn internal(
        context: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Internal {
            context,
            source: source.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) | ApiError::Rejected { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) | ApiError::Forbidden => StatusCode::UNAUTHORIZED,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let payload = match &self {
            ApiError::Validation(errors) => json!({
                "status": "error",
                "message": self.to_string(),
                "errors": errors,
            }),
            ApiError::Rejected { message, data } => json!({
                "status": "error",
                "message": message,
                "data": data,
            }),
            ApiError::Internal { context, source } => {
                error!(context = *context, error = %source, "request failed");
                json!({
                    "status": "error",
                    "message": context,
                    "error": source.to_string(),
                })
            }
            _ => json!({
                "status": "error",
                "message": self.to_string(),
            }),
        };
        (status, axum::Json(payload)).into_response()
    }
}

impl From<CatalogError> for ApiError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::InvalidId => ApiError::BadRequest("Invalid university id".to_string()),
            CatalogError::NotFound => ApiError::NotFound("University"),
            CatalogError::Invalid(errors) => ApiError::Validation(errors),
            CatalogError::MissingComparisonIds => {
                ApiError::BadRequest("University IDs are required for comparison".to_string())
            }
            CatalogError::NotEnoughToCompare => ApiError::BadRequest(
                "At least 2 universities are required for comparison".to_string(),
            ),
            CatalogError::Repository(source) => {
                ApiError::internal("Error processing university request", source)
            }
        }
    }
}

impl From<AdmissionsError> for ApiError {
    fn from(value: AdmissionsError) -> Self {
        match value {
            AdmissionsError::InvalidId(kind) => ApiError::BadRequest(format!("Invalid {kind} id")),
            AdmissionsError::MissingFields(message) => ApiError::BadRequest(message.to_string()),
            AdmissionsError::Invalid(errors) => ApiError::Validation(errors),
            AdmissionsError::ApplicationNotFound => ApiError::NotFound("Application"),
            AdmissionsError::UniversityNotFound => ApiError::NotFound("University"),
            AdmissionsError::ReviewerNotFound => ApiError::NotFound("Reviewer"),
            AdmissionsError::Duplicate => ApiError::BadRequest(
                "You have already applied to this university recently. Please wait 30 days before applying again."
                    .to_string(),
            ),
            AdmissionsError::Ineligible(rejection) => ApiError::Rejected {
                message: "Not eligible for this university".to_string(),
                data: serde_json::to_value(&rejection).unwrap_or(Value::Null),
            },
            AdmissionsError::Repository(RepositoryError::Conflict) => {
                ApiError::BadRequest("Duplicate application detected".to_string())
            }
            AdmissionsError::Repository(source) => {
                ApiError::internal("Error processing application request", source)
            }
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(value: AccountError) -> Self {
        match value {
            AccountError::MissingCredentials => {
                ApiError::BadRequest("Please provide email and password".to_string())
            }
            AccountError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid email or password".to_string())
            }
            AccountError::Deactivated => {
                ApiError::Unauthorized("Your account has been deactivated".to_string())
            }
            AccountError::IncorrectPassword => {
                ApiError::Unauthorized("Current password is incorrect".to_string())
            }
            AccountError::EmailTaken => {
                ApiError::BadRequest("User with this email already exists".to_string())
            }
            AccountError::Invalid(errors) => ApiError::Validation(errors),
            AccountError::NotFound => ApiError::NotFound("User"),
            AccountError::InvalidResetToken => {
                ApiError::BadRequest("Token is invalid or has expired".to_string())
            }
            AccountError::Token(source) => ApiError::internal("Error issuing token", source),
            AccountError::Hashing(message) => {
                ApiError::internal("Error processing password", message)
            }
            AccountError::Repository(source) => {
                ApiError::internal("Error processing user request", source)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn validation_errors_list_each_message() {
        let response =
            ApiError::Validation(vec!["Country is required".to_string()]).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Validation error");
        assert_eq!(body["errors"][0], "Country is required");
    }

    #[tokio::test]
    async fn forbidden_is_reported_as_unauthorized() {
        let response = ApiError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["message"], FORBIDDEN_MESSAGE);
    }

    #[tokio::test]
    async fn internal_errors_echo_the_source_message() {
        let response = ApiError::from(CatalogError::Repository(RepositoryError::Unavailable(
            "lock poisoned".to_string(),
        )))
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Error processing university request");
        assert_eq!(body["error"], "repository unavailable: lock poisoned");
    }
}
