// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Pledge Vault Host
//!
//! Entry point for the `pledge-node` binary. Parses CLI arguments, initializes
//! logging and metrics, drives the block clock, and serves the HTTP API.
//!
//! The binary supports four subcommands:
//!
//! - `run`     — host the vault until SIGINT/SIGTERM
//! - `init`    — initialize a data directory with a default config
//! - `replay`  — run a JSON scenario against a fresh vault
//! - `version` — print build version information

mod api;
mod calls;
mod cli;
mod config;
mod host;
mod logging;
mod metrics;
mod replay;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;

use pledge_contracts::SavingsVault;

use cli::{Commands, PledgeNodeCli};
use config::NodeConfig;
use host::VaultHost;
use logging::LogFormat;
use metrics::NodeMetrics;

/// Name of the config file inside the data directory.
const CONFIG_FILE: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = PledgeNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args, cli.log_format).await,
        Commands::Init(args) => init_node(args, cli.log_format),
        Commands::Replay(args) => replay_scenario(args, cli.log_format),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Resolves the config: explicit path, then `<data_dir>/config.toml`, then
/// devnet defaults.
fn resolve_config(explicit: Option<&Path>, data_dir: Option<&Path>) -> Result<NodeConfig> {
    if let Some(path) = explicit {
        return NodeConfig::load(path);
    }
    if let Some(path) = data_dir.map(|d| d.join(CONFIG_FILE)).filter(|p| p.exists()) {
        return NodeConfig::load(&path);
    }
    tracing::warn!("no config file found, using devnet role identities");
    Ok(NodeConfig::devnet())
}

/// Hosts the vault: restores the snapshot, runs the clock, serves the API
/// and metrics endpoints, and snapshots again on shutdown.
async fn run_node(args: cli::RunArgs, log_format: LogFormat) -> Result<()> {
    logging::init_logging(
        "pledge_node=info,pledge_contracts=info,tower_http=debug",
        log_format,
    );

    let config = resolve_config(args.config.as_deref(), Some(args.data_dir.as_path()))?;
    let rpc_port = args.rpc_port.unwrap_or(config.node.rpc_port);
    let metrics_port = args.metrics_port.unwrap_or(config.node.metrics_port);

    tracing::info!(
        rpc_port,
        metrics_port,
        block_time_ms = config.node.block_time_ms,
        data_dir = %args.data_dir.display(),
        "starting pledge-node"
    );

    std::fs::create_dir_all(&args.data_dir).with_context(|| {
        format!("failed to create data directory: {}", args.data_dir.display())
    })?;

    // --- Vault ---
    let snapshot_path = args.data_dir.join(host::SNAPSHOT_FILE);
    let host = if snapshot_path.exists() {
        Arc::new(VaultHost::load(&snapshot_path)?)
    } else {
        tracing::info!("no snapshot found, starting a fresh vault");
        Arc::new(VaultHost::new(SavingsVault::new(config.vault.clone()), 0))
    };

    // Role identities live in the vault state once it exists.
    let settings = host.settings();
    if settings != config.vault {
        tracing::warn!(
            snapshot = %snapshot_path.display(),
            "[vault] config section ignored, settings restored from snapshot"
        );
    }
    tracing::info!(
        authority = %settings.authority,
        governance = %settings.governance,
        reward_source = %settings.reward_source,
        max_deposits_per_user = settings.max_deposits_per_user,
        "vault roles in force"
    );

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new());
    node_metrics.refresh(&host.summary());

    // --- Application state ---
    let app_state = api::AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        host: Arc::clone(&host),
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("RPC/API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Block clock ---
    let clock_host = Arc::clone(&host);
    let clock_metrics = Arc::clone(&node_metrics);
    let block_time = std::time::Duration::from_millis(config.node.block_time_ms);
    let clock_loop = tokio::spawn(async move {
        let mut interval = tokio::time::interval(block_time);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let h = clock_host.tick();
            clock_metrics.block_height.set(h as i64);
            tracing::trace!(height = h, "block");
        }
    });

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    clock_loop.abort();
    host.save(&snapshot_path)?;
    tracing::info!(
        height = host.block_height(),
        transfers_executed = host.executed_transfers(),
        "pledge-node stopped"
    );
    Ok(())
}

/// Creates the data directory and writes a devnet `config.toml`.
fn init_node(args: cli::InitArgs, log_format: LogFormat) -> Result<()> {
    logging::init_logging("pledge_node=info", log_format);

    let data_dir = &args.data_dir;
    tracing::info!(data_dir = %data_dir.display(), "initializing data directory");

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let config_path = data_dir.join(CONFIG_FILE);
    if config_path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    let config = NodeConfig::devnet();
    std::fs::write(&config_path, config.to_toml()?)
        .with_context(|| format!("failed to write config to {}", config_path.display()))?;

    println!("Data directory initialized.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Config         : {}", config_path.display());
    println!("  Authority      : {}", config.vault.authority);
    println!("  Governance     : {}", config.vault.governance);
    println!("  Reward source  : {}", config.vault.reward_source);

    Ok(())
}

/// Replays a scenario file and fails if any expectation is not met.
fn replay_scenario(args: cli::ReplayArgs, log_format: LogFormat) -> Result<()> {
    logging::init_logging("pledge_node=warn", log_format);

    let scenario = replay::Scenario::load(&args.script)?;
    let settings = match scenario.vault.clone() {
        Some(settings) => settings,
        None => resolve_config(args.config.as_deref(), None)?.vault,
    };

    let host = VaultHost::new(SavingsVault::new(settings), 0);
    let stdout = std::io::stdout();
    let report = replay::run(&host, &scenario, &mut stdout.lock())?;

    if !report.mismatches.is_empty() {
        anyhow::bail!(
            "{} of {} steps did not match their expectation: {:?}",
            report.mismatches.len(),
            report.steps,
            report.mismatches
        );
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("pledge-node {}", env!("CARGO_PKG_VERSION"));
    println!("rustc       {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
