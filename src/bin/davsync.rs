use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use davsync::{ConnectionSettings, WebDavClient};

/// Synchronize a local directory with a WebDAV collection.
///
/// Connection settings are read from WEBDAV_* environment variables (or `.env`).
#[derive(Parser)]
#[command(name = "davsync", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload local files that are missing or newer remotely
    Push { remote: String, local: PathBuf },
    /// Download remote files that are missing or newer locally
    Pull { remote: String, local: PathBuf },
    /// Pull, then push
    Sync { remote: String, local: PathBuf },
    /// List a remote collection
    Ls {
        #[arg(default_value = "/")]
        remote: String,
    },
    /// Show the properties of a remote resource
    Info { remote: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = ConnectionSettings::from_env()?;
    let client = WebDavClient::new(settings).context("Invalid WebDAV connection settings")?;

    match cli.command {
        Command::Push { remote, local } => {
            let updated = client
                .push(&remote, &local)
                .await
                .with_context(|| format!("Failed to push {} to {}", local.display(), remote))?;
            report(updated);
        }
        Command::Pull { remote, local } => {
            tokio::fs::create_dir_all(&local)
                .await
                .with_context(|| format!("Failed to create {}", local.display()))?;
            let updated = client
                .pull(&remote, &local)
                .await
                .with_context(|| format!("Failed to pull {} to {}", remote, local.display()))?;
            report(updated);
        }
        Command::Sync { remote, local } => {
            tokio::fs::create_dir_all(&local)
                .await
                .with_context(|| format!("Failed to create {}", local.display()))?;
            let updated = client
                .sync(&remote, &local)
                .await
                .with_context(|| format!("Failed to sync {} with {}", remote, local.display()))?;
            report(updated);
        }
        Command::Ls { remote } => {
            let names = client
                .list(&remote)
                .await
                .with_context(|| format!("Failed to list {}", remote))?;
            for name in names {
                println!("{}", name);
            }
        }
        Command::Info { remote } => {
            let info = client
                .info(&remote)
                .await
                .with_context(|| format!("Failed to read info of {}", remote))?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}

fn report(updated: bool) {
    if updated {
        info!("✅ Synchronization transferred changes");
    } else {
        info!("✅ Everything is up to date");
    }
}
