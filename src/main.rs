//! Renders `inventory.ini` for the Matrix homeserver role.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use matrix_inventory::{
    check_inventory, config::DEFAULT_SETTINGS_FILE, generate_inventory, Settings,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Generate the Ansible inventory from environment variables and a template.
#[derive(Parser)]
#[command(name = "matrix-inventory")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file. Defaults apply when `inventory.toml` does not exist.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate and print the rendered inventory without writing it
    #[arg(long)]
    check: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // `.env` is optional, already set variables win.
    if let Ok(path) = dotenv() {
        debug!(?path, "Loaded .env");
    }

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::from_file_or_default(Path::new(DEFAULT_SETTINGS_FILE)),
    }
    .context("Failed to load settings")?;

    let provider = settings.source.provider()?;

    if cli.check {
        let rendered = check_inventory(&settings, &provider)
            .with_context(|| format!("Inventory check failed for {:?}", settings.template))?;
        print!("{rendered}");
        return Ok(());
    }

    let report = generate_inventory(&settings, &provider)
        .context("Failed to generate inventory")?;

    println!(
        "Inventory file generated successfully! ({:?}, {} bytes)",
        report.output, report.bytes
    );

    Ok(())
}
