mod api;
mod auth;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use vigil_core::Config;
use vigil_engine::{AlertScheduler, HistoryRecorder, QueryExecutor, StateManager};
use vigil_notify::WebhookNotifier;
use vigil_rules::RuleLoader;
use vigil_search::SearchClient;

use crate::state::AppState;

/// Build the engine component graph and start the scheduler.
///
/// Returns `None` when OpenSearch is unreachable on the first probe: the
/// HTTP surface still comes up, but readiness fails until a restart.
async fn build_engine(config: &Config) -> Option<(Arc<SearchClient>, Arc<AlertScheduler>)> {
    let client = match SearchClient::new(&config.opensearch) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!(error = %e, "failed to build OpenSearch client");
            return None;
        }
    };

    match client.info().await {
        Ok(info) => info!(
            "connected to OpenSearch {}",
            info["version"]["number"].as_str().unwrap_or("unknown")
        ),
        Err(e) => {
            error!(
                error = %e,
                url = client.base_url(),
                "failed to connect to OpenSearch; starting degraded"
            );
            return None;
        }
    }

    let rule_loader = Arc::new(RuleLoader::new(config.alerting.rules_dir.clone()));
    let state_manager = Arc::new(StateManager::new(
        Arc::clone(&client),
        config.alerting.state_index.clone(),
    ));
    let history = Arc::new(HistoryRecorder::new(
        Arc::clone(&client),
        config.alerting.history_index.clone(),
    ));
    let notifier = Arc::new(WebhookNotifier::new(
        Duration::from_secs(config.alerting.webhook_timeout_secs),
        config.alerting.webhook_retries,
    ));

    state_manager.initialize().await;
    history.initialize().await;

    let scheduler = Arc::new(AlertScheduler::new(
        rule_loader,
        QueryExecutor::new(Arc::clone(&client)),
        state_manager,
        notifier,
        history,
    ));
    scheduler.start().await;

    Some((client, scheduler))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    vigil_core::config::load_dotenv();
    let config = Config::from_env();
    if let Err(e) = config.validate() {
        error!(error = %e, "invalid service configuration");
        std::process::exit(1);
    }
    config.log_summary();

    let engine = build_engine(&config).await;
    let (search, scheduler) = match engine {
        Some((client, scheduler)) => (Some(client), Some(scheduler)),
        None => (None, None),
    };

    let app_state = Arc::new(AppState {
        config: config.clone(),
        search,
        scheduler,
    });

    let app = Router::new()
        .route("/", get(api::root))
        .route("/health", get(api::health))
        .route("/health/liveness", get(api::liveness))
        .route("/health/readiness", get(api::readiness))
        .route("/api/v1/alerts/rules", get(api::list_rules))
        .route("/api/v1/alerts/rules/reload", post(api::reload_rules))
        .route("/api/v1/alerts/rules/{name}/status", get(api::rule_status))
        .route("/api/v1/alerts/rules/{name}/trigger", post(api::trigger_rule))
        .route("/api/v1/alerts/history", get(api::get_history))
        .layer(CorsLayer::permissive())
        .with_state(app_state.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("management API listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = &app_state.scheduler {
        scheduler.stop().await;
    }
    info!("alerting service stopped");
    Ok(())
}
