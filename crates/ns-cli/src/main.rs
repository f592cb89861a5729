use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ns_contract::ContractPipeline;
use ns_manifest::Manifest;
use ns_runner::AuditConfig;

#[derive(Parser)]
#[command(name = "northstar", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config under .northstar/
    Init,

    /// Run the output contract over a saved model response and print the result JSON
    CheckResponse {
        #[arg(long)]
        input: PathBuf,
        /// Overrides pipeline.confidence_threshold
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// List persisted reference manifest entries
    Manifest,

    /// Print the effective configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = std::env::current_dir()?;

    match cli.cmd {
        Command::Init => {
            let path = AuditConfig::config_path(&root);
            if path.exists() {
                println!("Config already present at {}", path.display());
            } else {
                AuditConfig::default().save_to(&path)?;
                println!("Initialized northstar in {}", root.display());
            }
        }
        Command::CheckResponse { input, threshold } => {
            let cfg = AuditConfig::load_or_default(&root)?;
            let threshold = threshold.unwrap_or(cfg.pipeline.confidence_threshold);
            if !(0.0..=1.0).contains(&threshold) {
                bail!("threshold must be within [0, 1], got {threshold}");
            }
            let text = std::fs::read_to_string(&input).with_context(|| format!("read {}", input.display()))?;
            let result = ContractPipeline::new(threshold).check_text_or_unresolved(&text);
            tracing::info!(status = result.status.as_str(), input = %input.display(), "response checked");
            println!("{}", result.to_json_pretty());
        }
        Command::Manifest => {
            let cfg = AuditConfig::load_or_default(&root)?;
            let path = cfg.manifest_path(&root);
            let manifest = Manifest::load(&path)?;
            println!("Manifest: {} ({} entries)", path.display(), manifest.len());
            for (key, e) in &manifest.entries {
                println!("- {} -> {} [{}] uploaded_at={}", key, e.handle, e.local_name, e.uploaded_at);
            }
        }
        Command::Config => {
            let cfg = AuditConfig::load_or_default(&root)?;
            print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
        }
    }

    Ok(())
}
