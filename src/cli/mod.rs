//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `start` (default) -- start the session gateway
//! - `config show|path|validate` -- inspect configuration
//! - `status` -- query a running instance for health info
//! - `version` -- print build/version info

use clap::{Parser, Subcommand};

/// Pollroom live classroom polling gateway.
#[derive(Parser, Debug)]
#[command(
    name = "pollroom",
    version = env!("CARGO_PKG_VERSION"),
    about = "Pollroom — a live classroom polling gateway"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the session gateway (default when no subcommand is given).
    Start,

    /// Inspect configuration.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Query a running instance for health/status information.
    Status {
        /// Port of the running instance (default: from config or 7270).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host of the running instance.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Print version, build date, and git commit information.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the fully loaded configuration as JSON.
    Show,

    /// Print the resolved configuration file path.
    Path,

    /// Check the configuration file for problems.
    Validate,
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

use crate::config;
use serde_json::Value;

/// Run the `config show` subcommand.
pub fn handle_config_show() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config()?;
    let pretty = serde_json::to_string_pretty(&cfg)?;
    println!("{}", pretty);
    Ok(())
}

/// Run the `config path` subcommand.
pub fn handle_config_path() {
    println!("{}", config::get_config_path().display());
}

/// Run the `config validate` subcommand.
pub fn handle_config_validate() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config()?;
    let issues = config::validate_config(&cfg);
    if issues.is_empty() {
        println!("Configuration OK ({})", config::get_config_path().display());
        return Ok(());
    }
    for issue in &issues {
        eprintln!("  {}: {}", issue.path, issue.message);
    }
    std::process::exit(1);
}

/// Run the `status` subcommand -- connect to a running instance's status endpoint.
pub async fn handle_status(
    host: &str,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let port = resolve_port(port);
    let url = format!("http://{}:{}/status", host, port);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()?;

    let response = match client.get(&url).send().await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Could not connect to pollroom at {}:{}", host, port);
            eprintln!("  Error: {}", e);
            eprintln!();
            eprintln!("Is the server running? Start it with: pollroom start");
            std::process::exit(1);
        }
    };

    if !response.status().is_success() {
        eprintln!(
            "Status endpoint returned HTTP {}: {}",
            response.status(),
            response.text().await.unwrap_or_default()
        );
        std::process::exit(1);
    }

    let body: Value = response.json().await?;

    println!("Pollroom gateway status");
    println!("=======================");
    if let Some(version) = body.get("version").and_then(|v| v.as_str()) {
        println!("  Version:      {}", version);
    }
    println!("  Address:      {}:{}", host, port);
    if let Some(status) = body.get("status").and_then(|v| v.as_str()) {
        println!("  Status:       {}", status);
    }
    if let Some(participants) = body.get("participants").and_then(|v| v.as_u64()) {
        println!("  Participants: {}", participants);
    }

    Ok(())
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("pollroom {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("POLLROOM_BUILD_DATE"));
    println!("  Git commit: {}", env!("POLLROOM_GIT_HASH"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}

/// Resolve the port to probe: explicit flag, then config, then the default.
fn resolve_port(port: Option<u16>) -> u16 {
    if let Some(port) = port {
        return port;
    }
    config::load_config()
        .map(|cfg| cfg.gateway.port)
        .unwrap_or(config::DEFAULT_PORT)
}
