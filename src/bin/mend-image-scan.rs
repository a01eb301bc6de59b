//! Mend Image Scan CLI
//!
//! Downloads the Mend CLI and scans the latest local image of each repository

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mend_image_scan::core::{
    ConfigLoadOptions, ConfigLoader, ConsoleLog, DEFAULT_DOWNLOAD_BASE_URL, ScanError, ScanSettings,
};
use mend_image_scan::orchestration;
use mend_image_scan::provisioning::Platform;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Container image scanning with the Mend CLI
#[derive(Parser)]
#[command(name = "mend-image-scan")]
#[command(version)]
#[command(about = "Scan the latest local image of each repository with the Mend CLI", long_about = None)]
struct Cli {
    /// Enable debug diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the scanner and scan every configured repository
    ///
    /// The user key is read from MEND_USER_KEY or the config file only.
    Scan {
        /// Mend account email (overrides MEND_EMAIL)
        #[arg(long)]
        email: Option<String>,

        /// Mend service URL (overrides MEND_URL)
        #[arg(long)]
        url: Option<String>,

        /// Comma-separated repository names (overrides MEND_REPO_NAMES)
        #[arg(long)]
        repo_names: Option<String>,

        /// Config file (defaults to .mend-scan.yaml in the working directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory the scanner is installed into and commands run in
        #[arg(short, long)]
        working_dir: Option<PathBuf>,

        /// Record non-zero exits instead of failing the run
        #[arg(long)]
        allow_scan_failures: bool,

        /// Write a JSON report to this path
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },

    /// Print the scanner download URL for this host
    DownloadUrl {
        /// Download base URL
        #[arg(long, default_value = DEFAULT_DOWNLOAD_BASE_URL)]
        base_url: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env("MEND_SCAN_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("mend_image_scan=debug")
        } else {
            EnvFilter::new("mend_image_scan=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();

    if let Err(e) = run(cli.command).await {
        eprintln!("\n❌ Error");
        eprintln!("{:#}", e);

        if let Some(scan_error) = e.downcast_ref::<ScanError>() {
            eprintln!("\nSuggested actions:");
            for action in scan_error.suggested_actions() {
                eprintln!("  - {}", action);
            }
            eprintln!("\n[{}]", scan_error.code());
        }
        process::exit(1);
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Scan {
            email,
            url,
            repo_names,
            config,
            working_dir,
            allow_scan_failures,
            report,
        } => {
            let working_dir = match working_dir {
                Some(dir) => dir,
                None => std::env::current_dir().context("Failed to read current directory")?,
            };

            let mut options = ConfigLoadOptions::new(&working_dir);
            options.config_file = config;
            options.cli_args = Some(ScanSettings {
                user_email: email,
                mend_url: url,
                repo_names,
                fail_on_non_zero_exit: allow_scan_failures.then_some(false),
                ..Default::default()
            });
            let config = ConfigLoader::load(options).await?;

            let scan = orchestration::perform(&config, &working_dir, Arc::new(ConsoleLog));
            let result = tokio::select! {
                result = scan => result?,
                _ = tokio::signal::ctrl_c() => {
                    return Err(ScanError::Interrupted {
                        program: "mend-image-scan".to_string(),
                    }
                    .into());
                }
            };

            if let Some(path) = report {
                tokio::fs::write(&path, result.to_json()?)
                    .await
                    .with_context(|| format!("Failed to write report to {}", path.display()))?;
                println!("📄 Report written to {}", path.display());
            }
        }

        Commands::DownloadUrl { base_url } => {
            let platform = Platform::detect()?;
            println!("{}", platform.download_url(&base_url));
        }
    }

    Ok(())
}
