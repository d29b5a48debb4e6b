// Command-line front end: compresses the given files and directories with the
// active profile and prints what happened to each.

use std::path::PathBuf;
use anyhow::Context;
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use image_dropper_lib::commands::add_paths;
use image_dropper_lib::core::{AppConfig, AppState, FileStatus, RegistryEvent};
use image_dropper_lib::utils::{to_human_readable_size, to_savings_label};

#[derive(Debug, Parser)]
#[command(name = "image-dropper", version, about = "Compress images with the active profile")]
struct Cli {
    /// Files or directories to compress
    paths: Vec<PathBuf>,

    /// Settings store to use
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Optimizer executable
    #[arg(long, value_name = "PROG")]
    optimizer: Option<PathBuf>,

    /// Parallel compressions, 0 for no limit. Overrides the stored setting.
    #[arg(long, value_name = "N")]
    threads: Option<u32>,
}

impl Cli {
    fn config(&self) -> AppConfig {
        let mut config = AppConfig::default();
        if let Some(settings) = &self.settings {
            config.settings_path = settings.clone();
        }
        if let Some(optimizer) = &self.optimizer {
            config.sidecar.program = optimizer.clone();
        }
        config.threads = self.threads;
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = cli.config();
    debug!("Using settings store {}", config.settings_path.display());

    let state = AppState::from_config(&config)
        .await
        .context("Failed to start")?;
    let profile = state.profiles().active_profile();
    info!("Active profile: {} (id {})", profile.name, profile.id);

    let mut events = state.registry().events();
    let reporter = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(RegistryEvent::Updated(entry)) if entry.status.is_terminal() => match entry.status {
                    FileStatus::Error => warn!("{}: {}", entry.path, entry.error.unwrap_or_default()),
                    _ => info!("{}: {:?}", entry.path, entry.status),
                },
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => debug!("Skipped {} progress events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let added = add_paths(&state, &cli.paths).await;
    if added == 0 {
        warn!("No supported images found");
    }
    state.registry().settled().await;
    reporter.abort();

    for entry in state.registry().snapshot() {
        println!(
            "{:<40} {:>10} -> {:>10} {:>5}  {:?}",
            entry.file,
            to_human_readable_size(entry.original_size),
            to_human_readable_size(entry.size),
            to_savings_label(entry.savings),
            entry.status
        );
    }
    let summary = state.registry().summary();
    println!(
        "{} file(s): {} compressed, {} already smaller, {} failed, {} saved",
        summary.total,
        summary.complete,
        summary.already_smaller,
        summary.error,
        to_human_readable_size(Some(summary.bytes_saved))
    );

    state.shutdown().await;
    Ok(())
}
