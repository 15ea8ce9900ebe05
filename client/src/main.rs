//! faultsync - keep an offline copy of the fault code dataset up to date.

use clap::{Parser, Subcommand};
use faultsync_client::{Config, HttpRemote, IndexField, LocalStore, SyncService};
use faultsync_engine::format_version_info;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "faultsync", version, about = "Offline fault code dataset sync")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the applied version and sync state
    Status,
    /// Ask the server whether a newer dataset exists
    Check,
    /// Bring the local dataset up to date
    Sync {
        /// Sync even if the last sync is recent
        #[arg(long)]
        force: bool,
    },
    /// Write every record to a JSON bundle
    Export { path: PathBuf },
    /// Replace the local dataset with a JSON bundle
    Import { path: PathBuf },
    /// Search records by code, brand, model, title or description
    Search {
        query: String,
        /// Match an indexed field exactly instead (brand, model, category, severity, code)
        #[arg(long)]
        field: Option<IndexField>,
    },
    /// List applied dataset versions
    History,
    /// Sync periodically until interrupted
    Watch {
        /// Hours between syncs; defaults to FAULTSYNC_AUTO_SYNC_HOURS or 24
        #[arg(long)]
        every_hours: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "faultsync_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let store = LocalStore::open(&config.db_path).await?;
    let remote = HttpRemote::new(&config.remote_url, config.request_timeout)?;
    let service = Arc::new(SyncService::new(
        store.clone(),
        Arc::new(remote),
        config.max_age_hours,
    ));

    match cli.command {
        Command::Status => {
            let status = service.status().await;
            let records = store.count().await?;
            println!(
                "version:    {}",
                status.current_version.as_deref().unwrap_or("never synced")
            );
            match status.last_sync {
                Some(at) => println!("last sync:  {}", at.to_rfc3339()),
                None => println!("last sync:  never"),
            }
            println!("records:    {}", records);
            println!("outdated:   {}", status.is_outdated);
        }
        Command::Check => {
            let comparison = service.check_for_updates().await?;
            if comparison.has_update {
                println!(
                    "Update available: {} -> {} ({} changes)",
                    comparison.current_version, comparison.latest_version, comparison.change_count
                );
                for line in comparison.changelog.unwrap_or_default() {
                    println!("  - {}", line);
                }
            } else {
                println!("Up to date ({})", comparison.current_version);
            }
        }
        Command::Sync { force } => {
            let mut progress = service.subscribe();
            let printer = tokio::spawn(async move {
                while let Ok(event) = progress.recv().await {
                    eprintln!("[{:>3}%] {}", event.progress, event.message);
                }
            });

            let result = service.sync_fault_database(force).await;
            printer.abort();

            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                std::process::exit(1);
            }
        }
        Command::Export { path } => {
            let bundle = service.export_fault_data().await?;
            tokio::fs::write(&path, bundle.to_json_pretty()?).await?;
            println!("Exported {} records to {}", bundle.fault_count, path.display());
        }
        Command::Import { path } => {
            let data = tokio::fs::read_to_string(&path).await?;
            let result = service.import_fault_data(&data).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                std::process::exit(1);
            }
        }
        Command::Search { query, field } => {
            let records = match field {
                Some(field) => store.find_by(field, &query).await?,
                None => store.search(&query).await?,
            };
            for record in &records {
                println!(
                    "{:<24} {:<10} {}",
                    record.id,
                    record.field("code").unwrap_or("-"),
                    record.field("title").unwrap_or("")
                );
            }
            println!("{} matches", records.len());
        }
        Command::History => {
            for version in store.versions().await? {
                let marker = if version.is_current { "*" } else { " " };
                println!("{} {}", marker, format_version_info(&version));
            }
        }
        Command::Watch { every_hours } => {
            let interval = every_hours
                .map(|h| Duration::from_secs(h.max(1) * 3600))
                .or(config.auto_sync_interval)
                .unwrap_or(Duration::from_secs(24 * 3600));

            let mut progress = service.subscribe();
            tokio::spawn(async move {
                while let Ok(event) = progress.recv().await {
                    tracing::info!(phase = ?event.phase, progress = event.progress, "{}", event.message);
                }
            });

            service.start_auto_sync(interval);
            tokio::signal::ctrl_c().await?;
            service.stop_auto_sync();
        }
    }

    store.close().await;
    Ok(())
}
