use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use contractwatch::{DatabaseConfig, WatchConfig};

#[derive(Parser)]
#[command(name = "contractwatch")]
#[command(about = "Watches contract events and view-method state against a header-synced database")]
struct Cli {
    /// Config file location
    #[arg(long)]
    config: Option<PathBuf>,

    /// File path for logging
    #[arg(long)]
    logfile: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// RPC path to Ethereum JSON-RPC endpoints
    #[arg(long)]
    rpc_path: Option<String>,

    #[arg(long)]
    database_name: Option<String>,

    #[arg(long)]
    database_hostname: Option<String>,

    #[arg(long)]
    database_port: Option<u16>,

    #[arg(long)]
    database_user: Option<String>,

    #[arg(long)]
    database_password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watches events and polls methods at the configured contract addresses
    Watch,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_tracing(&cli);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(error) => {
            tracing::error!("could not load config: {error}");
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Watch => {
            if let Err(error) = contractwatch::watch(&config).await {
                tracing::error!("failed to run watcher: {error}");
                process::exit(1);
            }
        }
    }
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("contractwatch={}", cli.log_level)));

    match &cli.logfile {
        Some(path) => {
            match std::fs::OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(
                            tracing_subscriber::fmt::layer()
                                .with_writer(std::sync::Arc::new(file))
                                .with_ansi(false),
                        )
                        .init();
                }
                Err(_) => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(tracing_subscriber::fmt::layer())
                        .init();
                    tracing::info!("failed to log to file, using default stdout");
                }
            }
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

fn load_config(cli: &Cli) -> Result<WatchConfig, contractwatch::ConfigError> {
    let mut config = match &cli.config {
        Some(path) => WatchConfig::from_toml_file(path)?,
        None => {
            tracing::warn!("no config file passed with --config flag");
            WatchConfig::new("", DatabaseConfig::default())
        }
    };

    if let Some(rpc_path) = &cli.rpc_path {
        config.rpc_path = rpc_path.clone();
    }
    if let Some(name) = &cli.database_name {
        config.database.name = name.clone();
    }
    if let Some(hostname) = &cli.database_hostname {
        config.database.hostname = hostname.clone();
    }
    if let Some(port) = cli.database_port {
        config.database.port = port;
    }
    if let Some(user) = &cli.database_user {
        config.database.user = user.clone();
    }
    if let Some(password) = &cli.database_password {
        config.database.password = password.clone();
    }

    Ok(config)
}
