//! kubelited — the kubelite daemon.
//!
//! Single binary that assembles the kubelite subsystems:
//! - ConfigMap and Secret filesystem stores
//! - Namespace registry
//! - Mutation dispatcher
//! - REST API
//!
//! # Usage
//!
//! ```text
//! kubelited serve --port 6443 --data-dir /var/lib/kubelite
//! kubelited default-config > kubelite.toml
//! ```

mod daemon;

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use kubelite_core::KubeliteConfig;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,kubelited=debug,kubelite=debug";

#[derive(Parser)]
#[command(name = "kubelited", about = "kubelite daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the API until interrupted.
    Serve {
        /// TOML configuration file. Flags below override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Address to listen on.
        #[arg(long)]
        address: Option<IpAddr>,

        /// Port to listen on.
        #[arg(long)]
        port: Option<u16>,

        /// Root directory for persistent state.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Remove data files of keys dropped by an update.
        #[arg(long)]
        prune_stale_keys: bool,

        /// Maximum number of pending mutations.
        #[arg(long)]
        queue_capacity: Option<usize>,

        /// Log output format.
        #[arg(long, value_enum, default_value_t = LogFormat::Text)]
        log_format: LogFormat,
    },
    /// Print the default configuration as TOML.
    DefaultConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            address,
            port,
            data_dir,
            prune_stale_keys,
            queue_capacity,
            log_format,
        } => {
            init_tracing(log_format);

            let mut cfg = match config {
                Some(path) => KubeliteConfig::from_file(&path)
                    .with_context(|| format!("unable to load config {}", path.display()))?,
                None => KubeliteConfig::default(),
            };
            if let Some(address) = address {
                cfg.server.address = address;
            }
            if let Some(port) = port {
                cfg.server.port = port;
            }
            if let Some(data_dir) = data_dir {
                cfg.store.data_dir = data_dir;
            }
            if prune_stale_keys {
                cfg.store.prune_stale_keys = true;
            }
            if let Some(capacity) = queue_capacity {
                cfg.dispatcher.queue_capacity = capacity;
            }

            daemon::run(cfg).await
        }
        Command::DefaultConfig => {
            print!("{}", KubeliteConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}
