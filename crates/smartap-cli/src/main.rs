//! Smartap CLI - run the replacement cloud server for Smartap shower controllers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use smartap_server::{LoggingHandler, Server, ServerConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Smartap - local replacement for the retired Smartap cloud
#[derive(Parser)]
#[command(name = "smartap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the device-facing server
    Serve {
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,

        /// Port number; the firmware always dials 443
        #[arg(short = 'P', long, default_value = "443")]
        port: u16,

        /// PEM certificate chain (self-signed is fine, the device never checks)
        #[arg(short, long, env = "SMARTAP_CERT")]
        cert: PathBuf,

        /// PEM private key
        #[arg(short, long, env = "SMARTAP_KEY")]
        key: PathBuf,

        /// Write JSONL traffic captures to this directory
        #[arg(long)]
        analysis_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs)?;

    match cli.command {
        Commands::Serve {
            bind,
            port,
            cert,
            key,
            analysis_dir,
        } => {
            let config = ServerConfig {
                bind,
                port,
                cert_path: cert,
                key_path: key,
                analysis_dir,
            };

            info!(addr = %config.addr(), "starting smartap server");
            let server = Server::new(config, LoggingHandler)?;
            server.run().await?;
        }
    }

    Ok(())
}

fn setup_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to parse log level")?;

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).compact())
            .init();
    }

    Ok(())
}
