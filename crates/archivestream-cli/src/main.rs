// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ArchiveStream — compose a themed, watermarked PDF from a manifest of
// source documents.
//
// Usage:
//   archivestream export <MANIFEST> [OPTIONS]   Compose and write the PDF
//   archivestream history [--limit N]           Show recent exports

mod manifest;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use archivestream_core::human_errors::humanize_error;
use archivestream_core::history::HistoryPersistence;
use archivestream_core::{ArchiveError, ArchiveSession, ColorSlot, ExportConfig, HistoryLedger, WatermarkKind};
use archivestream_document::Composer;
use archivestream_history::SqliteHistoryStore;

use manifest::Manifest;

#[derive(Parser)]
#[command(
    name = "archivestream",
    about = "Merge PDFs, documents, images and chapter pages into one archive PDF",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// History database
    #[arg(long, global = true, default_value = "archivestream-history.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose the items of a manifest into a single PDF
    Export {
        /// Path to the JSON manifest
        manifest: PathBuf,

        /// JSON export configuration (defaults apply to missing fields)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Watermark: none|draft|confidential|approved
        #[arg(short, long)]
        watermark: Option<WatermarkKind>,

        /// Theme preset: corporate|atelier|midnight|brutalist
        #[arg(long)]
        preset: Option<String>,

        /// Primary theme colour (#RRGGBB)
        #[arg(long)]
        primary: Option<String>,

        /// Accent theme colour (#RRGGBB)
        #[arg(long)]
        accent: Option<String>,

        /// Output file name (".pdf" is appended when missing)
        #[arg(long)]
        name: Option<String>,

        /// Use the aggressive shrink transform for images
        #[arg(long)]
        compress: bool,

        /// Do not record the export in the history database
        #[arg(long)]
        no_history: bool,
    },

    /// Show recent exports
    History {
        /// Number of records to show
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Export {
            manifest,
            config,
            output,
            watermark,
            preset,
            primary,
            accent,
            name,
            compress,
            no_history,
        } => {
            let mut base = match config {
                Some(path) => ExportConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => ExportConfig::default(),
            };
            if let Some(name) = name {
                base.theme.custom_file_name = Some(name);
            }

            let mut session = ArchiveSession {
                watermark: watermark.unwrap_or(base.watermark),
                theme: base.theme.clone(),
                compress_enabled: compress || base.image_mode == archivestream_core::ImageMode::Shrink,
                ..ArchiveSession::new()
            };
            if let Some(preset) = preset.as_deref() {
                session.apply_preset(preset);
            }
            for (slot, hex) in [(ColorSlot::PrimaryColor, primary), (ColorSlot::AccentColor, accent)] {
                if let Some(hex) = hex {
                    session.set_color(slot, &hex).map_err(report)?;
                }
            }

            let store = if no_history {
                None
            } else {
                open_history(&cli.db)
            };
            if let Some(store) = &store {
                session.history = HistoryLedger::from_records(store.all().unwrap_or_default());
            }

            let manifest_dir = manifest.parent().map(Path::to_path_buf).unwrap_or_default();
            session.items = Manifest::load(&manifest)
                .and_then(|m| m.into_items(&manifest_dir))
                .map_err(report)?;

            let config = ExportConfig {
                paper_size: base.paper_size,
                max_width: base.max_width,
                quality: base.quality,
                ..session.export_config()
            };
            run_export(&session, config, store, &output).await
        }
        Commands::History { limit } => {
            let store = SqliteHistoryStore::open(&cli.db)
                .with_context(|| format!("opening history {}", cli.db.display()))?;
            for row in store.recent(limit)? {
                println!("{}", serde_json::to_string(&row)?);
            }
            Ok(())
        }
    }
}

async fn run_export(
    session: &ArchiveSession,
    config: ExportConfig,
    store: Option<Arc<SqliteHistoryStore>>,
    output_dir: &Path,
) -> anyhow::Result<()> {
    if session.items.is_empty() {
        bail!("the manifest lists no items");
    }

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    // History is written only once the file exists on disk.
    let composer = Composer::new(config).with_ledger(session.history.clone());

    let mut progress = composer.subscribe();
    let watcher = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let snapshot = *progress.borrow();
            tracing::debug!(stage = ?snapshot.stage, fraction = snapshot.fraction, "progress");
        }
    });

    let outcome = composer.export(&session.items).await.map_err(report);
    drop(composer);
    watcher.await.ok();
    let outcome = outcome?;

    let path = output_dir.join(&outcome.record.name);
    std::fs::write(&path, &outcome.bytes).with_context(|| format!("writing {}", path.display()))?;

    if let Some(store) = store
        && let Err(err) = store.persist(&outcome.record)
    {
        warn!(%err, name = %outcome.record.name, "history record not persisted");
    }

    for warning in &outcome.warnings {
        warn!("{warning}");
    }
    info!(
        path = %path.display(),
        pages = outcome.page_count,
        sha256 = %outcome.sha256,
        history = session.history.len(),
        "archive written"
    );
    println!("{}", path.display());
    Ok(())
}

/// Open the history store. A missing store only disables history.
fn open_history(path: &Path) -> Option<Arc<SqliteHistoryStore>> {
    match SqliteHistoryStore::open(path) {
        Ok(store) => Some(Arc::new(store)),
        Err(err) => {
            warn!(%err, path = %path.display(), "history disabled");
            None
        }
    }
}

/// Print the plain-language form of an error and pass it on.
fn report(err: ArchiveError) -> anyhow::Error {
    let human = humanize_error(&err);
    eprintln!("{}\n{}", human.message, human.suggestion);
    anyhow::Error::new(err)
}
