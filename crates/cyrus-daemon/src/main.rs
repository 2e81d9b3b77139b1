//! `cyrusd` — the Supervisor Runtime (C11): process entry point wiring
//! config, transport, tracker, session, procedure, assistant and
//! orchestrator together. Grounded on `astrid-cli::daemon_main`'s
//! signal-select-then-ordered-teardown shape and
//! `astrid-gateway::server::lifecycle`'s unload sequencing.

mod config;
mod dispatch;
mod runtime;
mod shutdown;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cyrus_core::Event;
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::config::Args;
use crate::runtime::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let state_dir = args.state_dir();
    let config_path = args.config_path();

    let persisted = cyrus_persistence::load(&state_dir).await.context("loading persisted session state")?;
    let state = Arc::new(AppState::new(args));
    state.restore_stores(persisted.restore_stores());

    let initial_repositories = cyrus_config::load(&config_path).await.context("loading initial repository configuration")?;
    state.reload(initial_repositories).await;
    tracing::info!(path = %config_path.display(), "loaded repository configuration");

    let (event_tx, mut event_rx) = mpsc::channel::<(String, Event)>(256);
    let transports: Arc<DashMap<String, tokio::task::JoinHandle<()>>> = Arc::new(DashMap::new());
    spawn_transports(&state, &transports, &event_tx).await?;

    let (_watcher, mut reload_rx) = cyrus_config::watch(config_path.clone()).context("starting config watcher")?;
    let watcher_state = Arc::clone(&state);
    let watcher_transports = Arc::clone(&transports);
    let watcher_tx = event_tx.clone();
    let watcher_task = tokio::spawn(async move {
        while let Some(repositories) = reload_rx.recv().await {
            let orphaned_tokens = watcher_state.reload(repositories).await;
            despawn_transports(&watcher_transports, &orphaned_tokens);
            if let Err(err) = spawn_transports(&watcher_state, &watcher_transports, &watcher_tx).await {
                tracing::warn!(error = %err, "failed to spawn transport for a newly configured tracker token");
            }
            tracing::info!("repository configuration reloaded");
        }
    });

    let dispatch_state = Arc::clone(&state);
    let dispatch_task = tokio::spawn(async move {
        while let Some((token, event)) = event_rx.recv().await {
            dispatch::dispatch(&dispatch_state, token, event).await;
        }
    });

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, stopping daemon");

    watcher_task.abort();
    dispatch_task.abort();
    for entry in transports.iter() {
        entry.value().abort();
    }

    shutdown::shutdown(state, &state_dir).await;
    tracing::info!("daemon stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Spawn a transport for every tracker token in the current repository set
/// that doesn't already have one running. In direct mode this is a single
/// shared HTTP server bound once; in proxy mode it's one WebSocket
/// connection per distinct token (spec.md §4.9).
async fn spawn_transports(
    state: &Arc<AppState>,
    transports: &Arc<DashMap<String, tokio::task::JoinHandle<()>>>,
    tx: &mpsc::Sender<(String, Event)>,
) -> anyhow::Result<()> {
    let use_proxy = state.args.use_proxy();

    if !use_proxy {
        const DIRECT_KEY: &str = "__direct__";
        if transports.contains_key(DIRECT_KEY) {
            return Ok(());
        }
        let addr = format!("{}:{}", state.args.server_host, state.args.server_port)
            .parse()
            .context("parsing server bind address")?;
        let mut transport = cyrus_transport::DirectTransport::bind(addr).await.context("binding direct webhook transport")?;
        let tx = tx.clone();
        let handle = tokio::spawn(async move {
            while let Some((token, event)) = cyrus_transport::Transport::recv(&mut transport).await {
                if tx.send((token, event)).await.is_err() {
                    break;
                }
            }
        });
        transports.insert(DIRECT_KEY.to_string(), handle);
        tracing::info!(addr = %format!("{}:{}", state.args.server_host, state.args.server_port), "direct webhook transport listening");
        return Ok(());
    }

    let Some(proxy_url) = state.args.proxy_url.clone() else {
        anyhow::bail!("proxy transport selected but no proxy URL configured");
    };
    let tokens: HashSet<String> = {
        let repositories = state.repositories.read().expect("repositories lock poisoned");
        repositories.iter().map(|r| r.tracker_token.clone()).collect()
    };
    for token in tokens {
        if transports.contains_key(&token) {
            continue;
        }
        let mut transport = cyrus_transport::ProxyTransport::connect(proxy_url.clone(), token.clone());
        let tx = tx.clone();
        let handle = tokio::spawn(async move {
            while let Some((token, event)) = cyrus_transport::Transport::recv(&mut transport).await {
                if tx.send((token, event)).await.is_err() {
                    break;
                }
            }
        });
        transports.insert(token.clone(), handle);
        tracing::info!(token, "proxy transport connected");
    }
    Ok(())
}

/// Abort and remove the transport for every token no sibling repository
/// uses anymore. A no-op in direct mode, where transports aren't keyed by
/// token.
fn despawn_transports(transports: &Arc<DashMap<String, tokio::task::JoinHandle<()>>>, orphaned_tokens: &[String]) {
    for token in orphaned_tokens {
        if let Some((_, handle)) = transports.remove(token) {
            handle.abort();
            tracing::info!(token, "tore down transport for a repository token with no remaining repositories");
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();
}
