//! CLI arguments and subcommands for hostpulse.
//!
//! This module defines the command-line interface structure using the clap
//! library, including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "hostpulse",
    about = "Resilient host metrics sampler with live SSE streaming",
    long_about = "Resilient host metrics sampler with live SSE streaming.\n\n\
                  Samples CPU, memory, disk, network, process and system inventory\n\
                  metrics from independent collectors with per-collector timeouts and\n\
                  last-known-good fallback, and streams aggregated snapshots to any\n\
                  number of subscribers over Server-Sent Events.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Seconds between collection cycles
    #[arg(short = 'i', long)]
    pub interval_seconds: Option<u64>,

    /// Per-collector deadline in milliseconds
    #[arg(long)]
    pub collect_timeout_ms: Option<u64>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Subscribe to a running server and print snapshots as they arrive
    Watch {
        /// Stream URL of the server to subscribe to
        #[arg(
            short = 'u',
            long,
            default_value = "http://127.0.0.1:9482/api/stream"
        )]
        url: String,

        /// Print full snapshot JSON instead of a one-line summary
        #[arg(long)]
        raw: bool,
    },
}
