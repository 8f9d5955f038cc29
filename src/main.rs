use anyhow::{Context, Result};
use clap::Parser;
use rythm_store::config::{AppConfig, CliConfig, FileConfig};
use rythm_store::Store;
use std::path::PathBuf;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the database image file, or a directory to hold `library.db`.
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Seconds between two full snapshots of the database.
    #[clap(long, default_value_t = 10)]
    pub snapshot_interval_secs: u64,

    /// Seconds allowed for the final snapshot at shutdown before giving up.
    #[clap(long, default_value_t = 10)]
    pub shutdown_grace_secs: u64,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        CliConfig {
            db_path: args.db_path.clone(),
            snapshot_interval_secs: args.snapshot_interval_secs,
            shutdown_grace_secs: args.shutdown_grace_secs,
        }
    }
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C, initiating graceful shutdown");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating graceful shutdown");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C, initiating graceful shutdown");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: CliConfig = (&cli_args).into();
    let app_config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration:");
    info!("  db_path: {:?}", app_config.db_path);
    info!("  snapshot_interval_secs: {}", app_config.snapshot_interval_secs);
    info!("  shutdown_grace_secs: {}", app_config.shutdown_grace_secs);

    let store = Store::initialize(&app_config.store_options())
        .with_context(|| format!("Failed to initialize database at {:?}", app_config.db_path))?;

    info!("Ready, database image at {:?}", store.image_path());

    wait_for_shutdown_signal().await?;

    match tokio::time::timeout(app_config.shutdown_grace(), store.shutdown()).await {
        Ok(Ok(())) => {
            info!("Shutdown complete");
            Ok(())
        }
        Ok(Err(e)) => {
            error!("Shutdown failed: {}", e);
            Err(e.into())
        }
        Err(_) => {
            error!(
                "Final snapshot did not complete within {:?}, exiting",
                app_config.shutdown_grace()
            );
            std::process::exit(1);
        }
    }
}
