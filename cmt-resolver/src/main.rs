//! cmt-resolver - command-line access to the Corrections Management Services
//!
//! Resolves corrections for a run, lists global versions, and binds a global
//! version onto a context file. Results are printed as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cmt_common::config::{Config, ConfigOverrides};
use cmt_common::DetectorGeneration;
use cmt_resolver::{ConfigModel, CorrectionsService, StaticContext};
use tracing::info;

/// Command-line arguments for cmt-resolver
#[derive(Parser, Debug)]
#[command(name = "cmt-resolver")]
#[command(about = "Resolve detector corrections from the corrections database")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "CMT_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the SQLite corrections mirror
    #[arg(long)]
    database: Option<PathBuf>,

    /// Directory for cached gain arrays
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Detector generation (xenonnt or xenon1t)
    #[arg(long)]
    detector: Option<DetectorGeneration>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve one correction for one run
    Resolve {
        run_id: String,
        model_type: String,
        version: String,
    },
    /// List known global versions, oldest first
    GlobalVersions,
    /// Show the local versions bound by a global version ("latest" for the newest)
    LocalVersions { global_version: String },
    /// Apply a global version to a context file and print the bound options
    Bind {
        context: PathBuf,
        global_version: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(ConfigOverrides {
        config_file: args.config.clone(),
        database_path: args.database.clone(),
        cache_dir: args.cache_dir.clone(),
        detector: args.detector,
    })
    .context("Failed to load configuration")?;

    // Initialize tracing: RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "Starting cmt-resolver v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let service = CorrectionsService::connect(&config)
        .await
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;
    info!("✓ {}", service);

    let output = match args.command {
        Command::Resolve {
            run_id,
            model_type,
            version,
        } => {
            let model = ConfigModel::new(model_type, version);
            let value = service.get_corrections_config(&run_id, &model).await?;
            serde_json::to_string_pretty(&value)?
        }
        Command::GlobalVersions => serde_json::to_string_pretty(&service.global_versions().await?)?,
        Command::LocalVersions { global_version } => {
            serde_json::to_string_pretty(&service.local_versions(&global_version).await?)?
        }
        Command::Bind {
            context,
            global_version,
        } => {
            let mut ctx = StaticContext::load(&context)?;
            service.apply_cmt_version(&mut ctx, &global_version).await?;
            serde_json::to_string_pretty(&ctx)?
        }
    };

    println!("{}", output);
    Ok(())
}
