use crate::cli::ServeArgs;
use crate::infra::{shutdown_signal, AppState};
use crate::routes::with_operational_routes;
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use iniastra::accounts::{TokenAuthority, UserRepository};
use iniastra::admissions::ApplicationRepository;
use iniastra::api::ApiServices;
use iniastra::catalog::{bundled_catalog, seed_catalog, UniversityRepository};
use iniastra::clock::SystemClock;
use iniastra::config::AppConfig;
use iniastra::error::AppError;
use iniastra::store::{MongoStore, Repositories};
use iniastra::telemetry;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let app_state = AppState::new(prometheus_handle);

    if args.in_memory {
        let repositories = Repositories::in_memory();
        let seeded = seed_catalog(
            repositories.universities.as_ref(),
            bundled_catalog(Utc::now())?,
        )
        .await?;
        info!(seeded, "serving from the in-memory store");

        let app = application(&config, &repositories, app_state.clone()).layer(prometheus_layer);
        serve(&config, app, app_state).await
    } else {
        let store = MongoStore::connect(&config.database).await?;
        store.ensure_indexes().await?;

        let app =
            application(&config, &store.repositories(), app_state.clone()).layer(prometheus_layer);
        let result = serve(&config, app, app_state).await;
        store.shutdown().await;
        result
    }
}

fn application<U, A, Us>(
    config: &AppConfig,
    repositories: &Repositories<U, A, Us>,
    app_state: AppState,
) -> Router
where
    U: UniversityRepository + 'static,
    A: ApplicationRepository + 'static,
    Us: UserRepository + 'static,
{
    let tokens = Arc::new(TokenAuthority::from_config(
        &config.auth,
        Arc::new(SystemClock),
    ));
    let services = ApiServices::new(repositories, tokens, config.auth.expose_reset_token);
    with_operational_routes(&services, &config.http).layer(Extension(app_state))
}

async fn serve(config: &AppConfig, app: Router, app_state: AppState) -> Result<(), AppError> {
    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    app_state.set_ready(true);

    info!(environment = ?config.environment, %addr, "university application api ready");

    let readiness = app_state.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        readiness.set_ready(false);
        info!("shutdown signal received, draining connections");
    })
    .await?;
    Ok(())
}
