//! HTTP surface shared by the domain routers: the response envelope, transport
//! errors, extractors, auth gates, and the `/api` middleware stack.

pub mod auth;
pub mod cors;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod rate_limit;

use std::sync::Arc;

use axum::{middleware, Extension, Router};

pub use auth::{AdminUser, AuthUser, StaffUser, STAFF_ROLES};
pub use envelope::Envelope;
pub use error::ApiError;
pub use extract::{ApiJson, ApiQuery};
pub use rate_limit::RateLimiter;

use crate::accounts::{account_router, AccountService, TokenAuthority, UserRepository};
use crate::admissions::{application_router, AdmissionsService, ApplicationRepository};
use crate::catalog::{university_router, CatalogService, UniversityRepository};
use crate::config::HttpConfig;
use crate::store::Repositories;

/// The three domain services wired over one set of repositories.
pub struct ApiServices<U, A, Us> {
    pub catalog: Arc<CatalogService<U, A>>,
    pub admissions: Arc<AdmissionsService<A, U, Us>>,
    pub accounts: Arc<AccountService<Us>>,
    pub tokens: Arc<TokenAuthority>,
}

impl<U, A, Us> ApiServices<U, A, Us>
where
    U: UniversityRepository + 'static,
    A: ApplicationRepository + 'static,
    Us: UserRepository + 'static,
{
    /// Every service shares the token authority's clock.
    pub fn new(
        repositories: &Repositories<U, A, Us>,
        tokens: Arc<TokenAuthority>,
        expose_reset_token: bool,
    ) -> Self {
        let clock = Arc::clone(tokens.clock());
        Self {
            catalog: Arc::new(CatalogService::new(
                Arc::clone(&repositories.universities),
                Arc::clone(&repositories.applications),
                Arc::clone(&clock),
            )),
            admissions: Arc::new(AdmissionsService::new(
                Arc::clone(&repositories.applications),
                Arc::clone(&repositories.universities),
                Arc::clone(&repositories.users),
                clock,
            )),
            accounts: Arc::new(AccountService::new(
                Arc::clone(&repositories.users),
                Arc::clone(&tokens),
                expose_reset_token,
            )),
            tokens,
        }
    }
}

/// The three domain routers merged, without the `/api` middleware.
pub fn api_routes<U, A, Us>(services: &ApiServices<U, A, Us>) -> Router
where
    U: UniversityRepository + 'static,
    A: ApplicationRepository + 'static,
    Us: UserRepository + 'static,
{
    Router::new()
        .merge(university_router(Arc::clone(&services.catalog)))
        .merge(application_router(Arc::clone(&services.admissions)))
        .merge(account_router(Arc::clone(&services.accounts)))
}

/// Applies, from the inside out, the `/api` rate limit, the token authority
/// extension, and CORS. Routes and fallbacks added to `router` beforehand are
/// covered too.
pub fn with_api_layers<U, A, Us>(
    router: Router,
    services: &ApiServices<U, A, Us>,
    http: &HttpConfig,
) -> Router {
    let limiter = Arc::new(
        RateLimiter::new(
            http.rate_limit_max,
            http.rate_limit_window,
            Arc::clone(services.tokens.clock()),
        )
        .trusting_proxy(http.trust_proxy),
    );

    router
        .layer(middleware::from_fn_with_state(limiter, rate_limit::rate_limit))
        .layer(Extension(Arc::clone(&services.tokens)))
        .layer(cors::cors_layer(&http.allowed_origins))
}

pub fn api_router<U, A, Us>(services: &ApiServices<U, A, Us>, http: &HttpConfig) -> Router
where
    U: UniversityRepository + 'static,
    A: ApplicationRepository + 'static,
    Us: UserRepository + 'static,
{
    with_api_layers(api_routes(services), services, http)
}
