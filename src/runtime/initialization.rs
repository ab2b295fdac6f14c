//! # Initialization
//!
//! Controller startup: rustls provider, tracing, configuration, metrics,
//! probe server, Kubernetes client, PagerDuty client, reconciler context.

use crate::config::OperatorConfig;
use crate::constants::{
    DEFAULT_SERVER_POLL_INTERVAL_MS, DEFAULT_SERVER_STARTUP_TIMEOUT_SECS, EVENT_REPORTER,
};
use crate::controller::events::KubeEventPublisher;
use crate::controller::reconciler::{KubeStore, Reconciler, ReconcilerSettings};
use crate::controller::server::{start_server, ServerState};
use crate::observability;
use crate::provider::{PagerdutyREST, RulesetClient};
use anyhow::{Context, Result};
use clap::Parser;
use kube::Client;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Everything the watch loop needs
pub struct InitializationResult {
    pub client: Client,
    pub config: OperatorConfig,
    pub reconciler: Arc<Reconciler>,
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("config", &self.config)
            .field("server_ready", &self.server_state.is_ready.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Initialize the operator runtime from the command line and environment
///
/// # Errors
/// Fails on invalid configuration, when the probe server cannot bind, when no
/// Kubernetes client can be built, or when the shared ruleset is unreachable.
pub async fn initialize() -> Result<InitializationResult> {
    // Required for rustls 0.23+ before any TLS connection is made
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pagerduty_operator=info".into()),
        )
        .init();

    info!("Starting PagerDuty operator v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    let config = OperatorConfig::parse();
    config.validate().context("Invalid operator configuration")?;
    info!("Configuration: {:?}", config);

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_handle = {
        let state = Arc::clone(&server_state);
        let port = config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = start_server(port, state).await {
                error!("HTTP server error: {}", e);
            }
        })
    };
    wait_for_server_ready(&server_state, &server_handle).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let pagerduty = PagerdutyREST::with_base_url(config.api_url.clone(), config.api_key.clone())
        .context("Failed to build PagerDuty client")?;
    verify_ruleset(&pagerduty, &config.ruleset_id).await?;

    let store = Arc::new(KubeStore::new(client.clone()));
    let reconciler = Arc::new(Reconciler::with_store(
        Arc::new(pagerduty),
        store,
        Arc::new(KubeEventPublisher::new(client.clone(), EVENT_REPORTER)),
        ReconcilerSettings::from(&config),
    ));

    info!("Operator initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        config,
        reconciler,
        server_state,
    })
}

/// The shared ruleset must exist before any routing rule can be written
async fn verify_ruleset<C: RulesetClient + ?Sized>(client: &C, ruleset_id: &str) -> Result<()> {
    let ruleset = client
        .get_ruleset(ruleset_id)
        .await
        .with_context(|| format!("Unable to get the shared ruleset {ruleset_id}"))?;
    info!("Routing rules go to ruleset {} ({})", ruleset.name, ruleset_id);
    Ok(())
}

/// Wait for the HTTP server to bind
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    let startup_timeout = Duration::from_secs(DEFAULT_SERVER_STARTUP_TIMEOUT_SECS);
    let poll_interval = Duration::from_millis(DEFAULT_SERVER_POLL_INTERVAL_MS);
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_listening.load(Ordering::Relaxed) {
            info!("HTTP server is accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}
