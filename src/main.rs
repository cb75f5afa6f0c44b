use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};

use todo_agent::config::{AppConfig, StoreBackend};
use todo_agent::llm::ChatClient;
use todo_agent::server::{create_router, AppState};
use todo_agent::store::{InMemoryTodoStore, PgTodoStore, TodoStore};
use todo_agent::tracing::{init_tracing, shutdown_tracing};
use todo_agent::{AgentController, ToolBox};

const SERVICE_NAME: &str = "todo-agent";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // A missing .env file is fine; real deployments set the environment directly
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env()?;
    init_tracing(
        SERVICE_NAME,
        config.telemetry.otlp_endpoint.as_deref(),
        config.telemetry.json_logs,
    )?;

    // ─────────────────────────────────────────────────────────────────────────
    // Store
    // ─────────────────────────────────────────────────────────────────────────
    let mut pg_store: Option<Arc<PgTodoStore>> = None;
    let store: Arc<dyn TodoStore> = match config.store.backend {
        StoreBackend::Postgres => {
            let url = config
                .store
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL is not set")?;
            let pg = Arc::new(PgTodoStore::connect_lazy(url, config.store.max_connections)?);
            if config.store.auto_schema {
                pg.ensure_schema().await?;
                info!("todos schema ensured");
            }
            pg_store = Some(Arc::clone(&pg));
            pg
        }
        StoreBackend::Memory => {
            info!("using in-memory todo store; data is lost on restart");
            Arc::new(InMemoryTodoStore::new())
        }
    };

    // ─────────────────────────────────────────────────────────────────────────
    // Agent
    // ─────────────────────────────────────────────────────────────────────────
    info!(model = %config.llm.model, base_url = %config.llm.base_url, "configuring chat model");
    let model = Arc::new(ChatClient::new(config.llm.clone()));
    let agent = Arc::new(AgentController::new(
        model,
        ToolBox::new(Arc::clone(&store)),
        config.agent.clone(),
    ));

    // ─────────────────────────────────────────────────────────────────────────
    // HTTP server
    // ─────────────────────────────────────────────────────────────────────────
    let app = create_router(AppState { agent, store }, &config.server.cors);
    let addr = config.server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, backend = ?config.store.backend, "todo-agent listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(pg) = pg_store {
        pg.close().await;
        info!("database pool closed");
    }
    shutdown_tracing();

    if let Err(e) = served {
        error!(error = %e, "server exited with error");
        return Err(e.into());
    }

    info!("shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
