//! PowerVS insights server entry point.
//!
//! Initialises tracing, loads configuration from `POWERVS_*` environment
//! variables with an optional YAML fallback file, builds the shared
//! aggregation engine, and starts a Streamable-HTTP MCP server exposing
//! its operations as read-only tools.

mod api;
mod cache;
mod error;
mod health;
mod inventory;
mod resources;
mod state;
mod tools;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};

use powervs_common::{ClientSettings, SettingsOverlay};

use crate::api::PowerCloudHttp;
use crate::state::{AppState, Scope};
use crate::tools::InsightsTools;

// ===================================================================
// Configuration
// ===================================================================

/// Server configuration loaded from environment variables via `envy`.
///
/// Each field maps to `POWERVS_<FIELD>`:
///   - `POWERVS_LISTEN_ADDR`  (default `0.0.0.0:8080`)
///   - `POWERVS_CONFIG_FILE`  (optional, YAML fallback for settings)
///
/// Client settings come from `POWERVS_API_KEY`, `POWERVS_ACCOUNT_ID`,
/// `POWERVS_BASE_URL`, and `POWERVS_CRN`, with any field the
/// environment omits supplied by the YAML file.
#[derive(Debug, Deserialize)]
struct Config {
    /// Socket address to bind the HTTP server to.
    #[serde(default = "default_listen_addr")]
    listen_addr: String,

    /// Path to a YAML file with fallback client settings.
    config_file: Option<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

/// Load the fallback overlay from the YAML file, if one is configured.
fn file_overlay(path: Option<&str>) -> Result<SettingsOverlay> {
    let Some(path) = path else {
        return Ok(SettingsOverlay::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {path}"))?;
    serde_yaml::from_str(&raw).with_context(|| format!("failed to parse config file {path}"))
}

// ===================================================================
// Health endpoint
// ===================================================================

/// Minimal health-check handler for container / load-balancer probes.
async fn health() -> StatusCode {
    StatusCode::OK
}

// ===================================================================
// Entry point
// ===================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialise tracing with RUST_LOG env filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("powervs-insights starting");

    // 2. Load configuration: POWERVS_* env vars first, YAML fallback
    //    for whatever the environment leaves out.
    let config: Config = envy::prefixed("POWERVS_")
        .from_env()
        .context("failed to load config from POWERVS_* env vars")?;
    let env_overlay: SettingsOverlay = envy::prefixed("POWERVS_")
        .from_env()
        .context("failed to load client settings from POWERVS_* env vars")?;
    let fallback = file_overlay(config.config_file.as_deref())?;

    let settings = ClientSettings::resolve(env_overlay, fallback)
        .context("incomplete client settings (POWERVS_API_KEY and POWERVS_ACCOUNT_ID are required)")?;

    // 3. Build the upstream client and the shared engine state.
    let http = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;
    let api = PowerCloudHttp::new(http, &settings.base_url, &settings.api_key);
    let app_state =
        AppState::new(api, settings).context("failed to resolve the credential scope")?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        scope = match &app_state.scope {
            Scope::Account => "account-wide",
            Scope::Workspace(_) => "single-workspace",
        },
        "configuration loaded",
    );

    let state = Arc::new(app_state);

    // 4. Build the Streamable-HTTP MCP service. The factory closure
    //    creates a fresh InsightsTools per session, each sharing the
    //    same Arc<AppState> — and therefore the same caches.
    let state_for_factory = state.clone();
    let service = StreamableHttpService::new(
        move || Ok(InsightsTools::new(state_for_factory.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    // 5. Compose the axum router:
    //    - `/mcp`    → MCP Streamable-HTTP transport
    //    - `/health` → health-check probe
    let router = axum::Router::new()
        .nest_service("/mcp", service)
        .route("/health", axum::routing::get(health));

    // 6. Bind and serve.
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    tracing::info!("MCP server ready — http://{}/mcp", config.listen_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("powervs-insights shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) for graceful shutdown.
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("failed to install Ctrl-C handler");
    }
    tracing::info!("received shutdown signal");
}
