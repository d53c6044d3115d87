use std::sync::Arc;

use anyhow::{Context, Result};
use care_dashboard::config::ServiceConfig;
use care_dashboard::routes::{self, AppState};
use care_dashboard::{built_info, telemetry};
use care_store::{init_db_pool, DataStore, SqliteStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::from_env().context("Configuração inválida")?;
    telemetry::init_tracing(config.log_format)?;

    info!(
        "Iniciando {} v{} em {}",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        config.bind_addr
    );

    let pool = init_db_pool(&config.db).await?;
    let store: Arc<dyn DataStore> = Arc::new(SqliteStore::new(pool));
    let state = AppState::new(store, config.dashboard.clone());
    let app = routes::router(state.clone(), config.max_concurrent_requests);

    axum::Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Falha no servidor HTTP")?;

    state.sessions.close_all().await;
    info!("Serviço encerrado");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Falha ao aguardar sinal de encerramento: {}", e);
    }
}
