//! The Runner/Gateway binary: loads configuration, connects to Postgres,
//! wires the orchestrator's dependencies, and serves the HTTP surface
//! until SIGTERM/SIGINT.

use crucible_config::Config;
use crucible_gateway::AppState;
use crucible_registry::{HttpRegistryClient, ManifestResolver, RegistryClient};
use crucible_runner::{EnvSecretSource, NullJournalSink, Orchestrator};
use crucible_sandbox::CliContainerRuntime;
use crucible_schema::SchemaCache;
use crucible_store::{PostgresCacheStore, PostgresExecutionStore};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let config = Config::from_env()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    let registry_client: Arc<dyn RegistryClient> =
        Arc::new(HttpRegistryClient::new(config.registry_url.clone(), reqwest::Client::new()));
    let resolver = Arc::new(ManifestResolver::new(registry_client.clone()));
    let executions = Arc::new(PostgresExecutionStore::new(pool.clone()));
    let cache = Arc::new(PostgresCacheStore::new(pool));

    let cache_ttl = chrono::Duration::from_std(config.cache_ttl).unwrap_or_else(|_| chrono::Duration::minutes(30));

    let orchestrator = Arc::new(Orchestrator {
        resolver,
        registry: registry_client,
        schemas: Arc::new(SchemaCache::default()),
        executions: executions.clone(),
        cache,
        runtime: Arc::new(CliContainerRuntime::new(config.default_backend.to_string())),
        secrets: Arc::new(EnvSecretSource),
        // A Postgres-backed journal sink is not implemented yet; audit
        // entries are only visible through the `tracing` spans emitted
        // alongside them until one lands.
        journal: Arc::new(NullJournalSink),
        retry_policy: config.retry_policy(),
        cache_ttl,
    });

    let state = AppState::new(orchestrator, executions, config.registry_url.clone(), reqwest::Client::new());
    let app = crucible_gateway::router(state.clone());

    let addr = format!("{}:{}", config.bind_host, config.bind_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "crucible-server listening");

    let shutdown_grace = std::time::Duration::from_secs(30);
    axum::serve(listener, app)
        .with_graceful_shutdown(crucible_gateway::shutdown_signal(state, shutdown_grace))
        .await?;

    Ok(())
}
