//! # CLI Interface
//!
//! Defines the command-line argument structure for `pledge-node` using
//! `clap` derive. Supports four subcommands: `run`, `init`, `replay`,
//! and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Pledge savings vault host.
///
/// Hosts a single savings vault behind an HTTP/JSON-RPC API, drives its
/// block clock, and exposes Prometheus metrics. Scenario files can be
/// replayed offline against a fresh vault.
#[derive(Parser, Debug)]
#[command(
    name = "pledge-node",
    about = "Pledge savings vault host",
    version,
    propagate_version = true
)]
pub struct PledgeNodeCli {
    /// Log output format.
    #[arg(long, global = true, value_enum, env = "PLEDGE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the vault host.
    Run(RunArgs),
    /// Initialize a data directory with a default `config.toml`.
    Init(InitArgs),
    /// Execute a JSON scenario against a fresh vault and print the results.
    Replay(ReplayArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the node configuration file (TOML).
    ///
    /// When omitted, the node looks for `config.toml` in the data directory.
    #[arg(long, short = 'c', env = "PLEDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory holding the config and the vault snapshot.
    #[arg(long, short = 'd', env = "PLEDGE_DATA_DIR", default_value = ".pledge")]
    pub data_dir: PathBuf,

    /// Port for the JSON-RPC and REST API. Overrides the config file.
    #[arg(long, env = "PLEDGE_RPC_PORT")]
    pub rpc_port: Option<u16>,

    /// Port for the Prometheus metrics endpoint. Overrides the config file.
    #[arg(long, env = "PLEDGE_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Data directory to initialize.
    #[arg(long, short = 'd', env = "PLEDGE_DATA_DIR", default_value = ".pledge")]
    pub data_dir: PathBuf,

    /// Overwrite an existing `config.toml`.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `replay` subcommand.
#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// Scenario file (JSON).
    pub script: PathBuf,

    /// Configuration file supplying the role identities. Devnet defaults
    /// are used when omitted.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}
