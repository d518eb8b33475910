mod action;
mod app;
mod app_state;
mod component;
mod components;
mod core;
mod focus;
mod http;
mod theme;
mod widgets;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{broadcast, mpsc};

use bookrec_core::catalog::OptionCatalog;
use bookrec_core::config::Config;
use bookrec_core::gemini::GeminiClient;
use bookrec_core::orchestrator::Orchestrator;
use bookrec_core::platform;
use bookrec_core::protocol::BroadcastMessage;
use bookrec_core::state::StateManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = platform::data_dir();
    let log_dir = match std::fs::create_dir_all(&data_dir) {
        Ok(()) => data_dir,
        Err(_) => platform::temp_dir(),
    };
    let log_path = log_dir.join("bookrec.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("opening log file {}", log_path.display()))?;

    // RUST_LOG overrides; HTTP client internals are noisy at debug.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("bookrec log: {}", log_path.display());
    tracing::info!("bookrec starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = Config::load().context("loading config.toml")?;
    let api_key = config.api.resolve_api_key().with_context(|| {
        format!(
            "no API key: set {} or api.api_key in config.toml",
            config.api.api_key_env
        )
    })?;
    let catalog = Arc::new(
        OptionCatalog::load_or_builtin(&config.catalog.catalog_toml)
            .context("loading option catalog")?,
    );

    // ── Broadcast channel (session → TUI) ────────────────────────────────────
    let (broadcast_tx, broadcast_rx) = broadcast::channel::<BroadcastMessage>(1024);

    // ── SessionEvent channel (TUI/HTTP → session) ────────────────────────────
    let (event_tx, event_rx) = mpsc::channel::<core::SessionEvent>(1024);

    // ── Build the session ────────────────────────────────────────────────────
    let state_manager = Arc::new(StateManager::new());
    let client = Arc::new(GeminiClient::new(&config.api, api_key));
    let orchestrator = Orchestrator::new(state_manager.clone(), client, broadcast_tx.clone());
    let session_core = core::SessionCore::new(orchestrator.clone(), catalog.clone(), broadcast_tx.clone());

    // ── HTTP server ──────────────────────────────────────────────────────────
    if config.http.enabled {
        http::start_server(
            config.http.bind_address.clone(),
            config.http.port,
            http::HttpState {
                state_manager: state_manager.clone(),
                catalog: catalog.clone(),
                orchestrator,
                event_tx: event_tx.clone(),
            },
        );
    }

    // ── Spawn SessionCore event loop ─────────────────────────────────────────
    let session_task = tokio::spawn(async move {
        if let Err(e) = session_core.run(event_rx).await {
            tracing::error!("SessionCore exited with error: {}", e);
        }
    });

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let app = app::App::new(
        event_tx.clone(),
        state_manager,
        catalog,
        config.ui.show_keys_bar,
    );
    let result = app.run(broadcast_rx).await;

    let _ = event_tx.send(core::SessionEvent::Shutdown).await;
    let _ = session_task.await;
    tracing::info!("bookrec exiting");

    result
}
