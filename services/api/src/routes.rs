use crate::infra::AppState;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::{SecondsFormat, Utc};
use iniastra::accounts::UserRepository;
use iniastra::admissions::ApplicationRepository;
use iniastra::api::{api_routes, with_api_layers, ApiServices};
use iniastra::catalog::UniversityRepository;
use iniastra::config::HttpConfig;
use serde_json::{json, Value};

/// The `/api` surface plus the operational endpoints and the JSON 404 fallback,
/// all behind CORS. Only `/api` paths count against the rate limit.
pub(crate) fn with_operational_routes<U, A, Us>(
    services: &ApiServices<U, A, Us>,
    http: &HttpConfig,
) -> Router
where
    U: UniversityRepository + 'static,
    A: ApplicationRepository + 'static,
    Us: UserRepository + 'static,
{
    let router = api_routes(services)
        .route("/", get(welcome))
        .route("/api/health", get(api_health))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .fallback(not_found);
    with_api_layers(router, services, http)
}

pub(crate) async fn welcome() -> Json<Value> {
    Json(json!({
        "message": "Welcome to University Application API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "universities": "/api/universities",
            "applications": "/api/applications",
            "users": "/api/users",
            "health": "/api/health",
        },
    }))
}

pub(crate) async fn api_health(Extension(state): Extension<AppState>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "University Application API is running",
        "uptime": state.uptime_secs(),
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

pub(crate) async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    if state.is_ready() {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "initializing" })),
        )
    }
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn not_found(method: Method, uri: Uri) -> impl IntoResponse {
    let target = uri
        .path_and_query()
        .map(|target| target.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "status": "error",
            "message": format!("Cannot {method} {target}"),
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use iniastra::accounts::TokenAuthority;
    use iniastra::clock::SystemClock;
    use iniastra::store::Repositories;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app() -> (Router, AppState) {
        let state = AppState::new(PrometheusBuilder::new().build_recorder().handle());
        let tokens = Arc::new(TokenAuthority::new(
            b"routes-secret",
            Duration::from_secs(60),
            Arc::new(SystemClock),
        ));
        let services = ApiServices::new(&Repositories::in_memory(), tokens, false);
        let http = HttpConfig {
            allowed_origins: vec!["http://localhost:5173".to_string()],
            rate_limit_max: 100,
            rate_limit_window: Duration::from_secs(900),
            trust_proxy: false,
        };
        let router = with_operational_routes(&services, &http).layer(Extension(state.clone()));
        (router, state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::ORIGIN, "http://localhost:5173")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn welcome_lists_the_endpoints() {
        let (router, _) = app();
        let response = router.oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["endpoints"]["universities"], "/api/universities");
    }

    #[tokio::test]
    async fn api_health_reports_uptime() {
        let (router, _) = app();
        let response = router.oneshot(get_request("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "success");
        assert!(body["uptime"].as_f64().is_some());
        assert!(body["timestamp"].as_str().is_some_and(|ts| ts.ends_with('Z')));
    }

    #[tokio::test]
    async fn readiness_follows_the_flag() {
        let (router, state) = app();
        let waiting = router.clone().oneshot(get_request("/ready")).await.unwrap();
        assert_eq!(waiting.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.set_ready(true);
        let ready = router.oneshot(get_request("/ready")).await.unwrap();
        assert_eq!(ready.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_routes_get_a_json_404() {
        let (router, _) = app();
        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/api/nothing?x=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Cannot DELETE /api/nothing?x=1");
    }

    #[tokio::test]
    async fn api_routes_carry_rate_limit_headers() {
        let (router, _) = app();
        let response = router.oneshot(get_request("/api/universities")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["ratelimit-limit"], "100");
        assert_eq!(response.headers()["ratelimit-remaining"], "99");
    }

    #[tokio::test]
    async fn api_health_is_rate_limited_and_cors_enabled() {
        let (router, _) = app();
        let response = router.oneshot(get_request("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["ratelimit-limit"], "100");
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );
    }

    #[tokio::test]
    async fn unknown_api_paths_count_against_the_limit() {
        let (router, _) = app();
        let response = router.oneshot(get_request("/api/missing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["ratelimit-remaining"], "99");
    }

    #[tokio::test]
    async fn operational_routes_skip_the_limit() {
        let (router, _) = app();
        let response = router.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("ratelimit-limit").is_none());
    }
}
