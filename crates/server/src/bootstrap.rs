use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use wattson_agent::{
    build_supervisor, CompletionError, HttpCompletionClient, OrchestratorRuntime, RosterStores,
};
use wattson_core::config::{AppConfig, ConfigError, LoadOptions};
use wattson_db::repositories::{
    SqlForecastRepository, SqlPeakLoadRepository, SqlSessionRepository, SqlSolarTicketRepository,
};
use wattson_db::{connect_with_settings, migrations, DbPool};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub runtime: Arc<OrchestratorRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("completion client initialization failed: {0}")]
    Completion(#[source] CompletionError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let completion = Arc::new(
        HttpCompletionClient::new(config.completion.clone())
            .map_err(BootstrapError::Completion)?,
    );

    let supervisor = Arc::new(build_supervisor(
        completion,
        RosterStores {
            forecasts: Arc::new(SqlForecastRepository::new(db_pool.clone())),
            tickets: Arc::new(SqlSolarTicketRepository::new(db_pool.clone())),
            items: Arc::new(SqlPeakLoadRepository::new(db_pool.clone())),
        },
        &config.session,
    ));

    let runtime = Arc::new(OrchestratorRuntime::new(
        Arc::new(SqlSessionRepository::new(db_pool.clone())),
        supervisor,
        config.session.clone(),
    ));

    Ok(Application { config, db_pool, runtime })
}
