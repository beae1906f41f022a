//! Command line front end for the commission engine.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

use commission_engine::config::{ConfigStore, SettingKey};
use commission_engine::processing::{BatchRunner, FileWorkbookStore, write_report};

/// Computes commission payouts from per-employee sales exports.
#[derive(Parser, Debug)]
#[command(name = "commission-engine", version)]
struct Cli {
    /// Settings file
    #[arg(long, global = true, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process every file of the input folder and write the summary
    Run {
        /// Also write the batch report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Set one option and save the settings file
    Set {
        /// Option name (info_path, files_path, files_new_path, password, similarity_ratio)
        key: SettingKey,
        /// New value
        value: String,
    },
    /// Print the effective settings
    Show,
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut store = ConfigStore::load(&cli.config)
        .with_context(|| format!("failed to load settings from {}", cli.config.display()))?;

    match cli.command {
        Command::Run { report } => {
            let settings = store.settings();
            let workbooks = FileWorkbookStore::new(settings.password.clone());
            let mut progress = |completed: usize| debug!(completed, "Progress");

            let batch = BatchRunner::new(&workbooks, settings)
                .run(&mut progress)
                .context("batch run failed")?;

            println!(
                "Processed {} file(s), skipped {}, summary written to {}",
                batch.processed.len(),
                batch.skipped.len(),
                batch.summary_path.display()
            );
            for skipped in &batch.skipped {
                println!("  skipped {}: {:?}", skipped.path.display(), skipped.reason);
            }
            info!(run_id = %batch.run_id, cancelled = batch.cancelled, "Done");

            if let Some(path) = report {
                write_report(&path, &batch)
                    .with_context(|| format!("failed to write report to {}", path.display()))?;
                println!("Report written to {}", path.display());
            }
        }
        Command::Set { key, value } => {
            store
                .update(key, &value)
                .with_context(|| format!("failed to set {key}"))?;
            println!("{key} = {}", store.settings().get(key));
        }
        Command::Show => {
            for key in SettingKey::ALL {
                println!("{key} = {}", store.settings().get(key));
            }
        }
    }

    Ok(())
}
