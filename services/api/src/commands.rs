use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Args;
use iniastra::accounts::{AccountService, TokenAuthority};
use iniastra::catalog::{bundled_catalog, load_catalog, seed_catalog};
use iniastra::clock::SystemClock;
use iniastra::config::AppConfig;
use iniastra::error::AppError;
use iniastra::store::MongoStore;
use iniastra::telemetry;
use tracing::info;

#[derive(Args, Debug, Default)]
pub(crate) struct SeedArgs {
    /// CSV file to import. Defaults to the bundled reference catalog.
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct CreateAdminArgs {
    #[arg(long)]
    pub(crate) name: String,
    #[arg(long)]
    pub(crate) email: String,
    /// At least 8 characters
    #[arg(long)]
    pub(crate) password: String,
}

async fn connect() -> Result<(AppConfig, MongoStore), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let store = MongoStore::connect(&config.database).await?;
    store.ensure_indexes().await?;
    Ok((config, store))
}

pub(crate) async fn seed(args: SeedArgs) -> Result<(), AppError> {
    let universities = match &args.csv {
        Some(path) => load_catalog(path, Utc::now())?,
        None => bundled_catalog(Utc::now())?,
    };

    let (_config, store) = connect().await?;
    let repositories = store.repositories();
    let result = seed_catalog(repositories.universities.as_ref(), universities).await;
    store.shutdown().await;
    let inserted = result?;

    let source = args
        .csv
        .as_deref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "bundled catalog".to_string());
    println!("Seeded {inserted} universities from {source}");
    Ok(())
}

pub(crate) async fn create_admin(args: CreateAdminArgs) -> Result<(), AppError> {
    let (config, store) = connect().await?;
    let tokens = Arc::new(TokenAuthority::from_config(
        &config.auth,
        Arc::new(SystemClock),
    ));
    let accounts = AccountService::new(store.repositories().users, tokens, false);
    let result = accounts
        .bootstrap_admin(&args.name, &args.email, &args.password)
        .await;
    store.shutdown().await;

    let admin = result?;
    info!(user_id = %admin.id, "administrator created");
    println!("Created administrator {} <{}>", admin.name, admin.email);
    Ok(())
}
