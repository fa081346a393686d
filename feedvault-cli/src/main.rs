//! feedvault CLI
//!
//! Batch entry points over the feed catalog: probe health, recompute
//! quality scores, validate against the schema, build the lookup index.
//! Each subcommand is idempotent when re-run against unchanged inputs.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use feedvault_core::{
    has_errors, load_catalog_lenient, quality_score, save_record, source_files,
    user_weighted_score, validate_value, CategorySet, LoadedRecord, ScoringConfig, Severity,
    SourceIndex, SourceRecord,
};
use feedvault_net::{apply_health, probe_all, HealthConfig, HealthReport};

#[derive(Parser)]
#[command(name = "feedvault")]
#[command(author, version, about = "Threat-intelligence feed catalog manager", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe feed health and refresh source metadata
    Fetch {
        /// Catalog root directory
        #[arg(long, default_value = "data-sources")]
        sources_dir: PathBuf,

        /// Per-request timeout in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,

        /// Retries per feed for transient failures
        #[arg(long, default_value = "2")]
        retries: u32,

        /// Maximum concurrent probes
        #[arg(long, default_value = "8")]
        concurrency: usize,
    },

    /// Recompute quality scores and write them back
    Score {
        /// Catalog root directory
        #[arg(long, default_value = "data-sources")]
        sources_dir: PathBuf,

        /// Scoring weights document
        #[arg(long, default_value = "config/scoring-config.json")]
        config: PathBuf,
    },

    /// Check every source file against the schema
    Validate {
        /// Catalog root directory
        #[arg(long, default_value = "data-sources")]
        sources_dir: PathBuf,

        /// Category/tag vocabulary document for hygiene warnings
        #[arg(long)]
        categories: Option<PathBuf>,
    },

    /// Retire a source: zero its quality score instead of deleting it
    Retire {
        /// Catalog root directory
        #[arg(long, default_value = "data-sources")]
        sources_dir: PathBuf,

        /// Id of the source to retire
        id: String,
    },

    /// Build the lookup index and persist it as one snapshot
    Index {
        /// Catalog root directory
        #[arg(long, default_value = "data-sources")]
        sources_dir: PathBuf,

        /// Where to write the index snapshot
        #[arg(short, long, default_value = "index.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Commands::Fetch {
            sources_dir,
            timeout,
            retries,
            concurrency,
        } => run_fetch(sources_dir, timeout, retries, concurrency).await,
        Commands::Score {
            sources_dir,
            config,
        } => run_score(sources_dir, config),
        Commands::Validate {
            sources_dir,
            categories,
        } => run_validate(sources_dir, categories),
        Commands::Retire { sources_dir, id } => run_retire(sources_dir, id),
        Commands::Index {
            sources_dir,
            output,
        } => run_index(sources_dir, output),
    }
}

async fn run_fetch(
    sources_dir: PathBuf,
    timeout: u64,
    retries: u32,
    concurrency: usize,
) -> Result<()> {
    let (catalog, failures) = load_catalog_lenient(&sources_dir)?;
    let mut error_count = failures.len();

    let mut skipped = 0usize;
    let mut active: Vec<LoadedRecord> = Vec::new();
    for loaded in catalog.records {
        if loaded.record.is_retired() {
            info!("skipping retired source {}", loaded.record.id);
            skipped += 1;
        } else {
            active.push(loaded);
        }
    }

    let config = HealthConfig {
        timeout_secs: timeout,
        max_retries: retries,
        max_concurrent: concurrency,
        ..HealthConfig::default()
    };
    let records: Vec<SourceRecord> = active.iter().map(|l| l.record.clone()).collect();
    let reports: HashMap<String, HealthReport> =
        probe_all(&records, &config).await?.into_iter().collect();

    let now = Utc::now();
    let mut processed = 0usize;
    for mut loaded in active {
        let Some(report) = reports.get(&loaded.record.id) else {
            continue;
        };
        apply_health(&mut loaded.record, report, now);
        match save_record(&loaded) {
            Ok(()) => processed += 1,
            Err(e) => {
                error!("failed to save {}: {e}", loaded.record.id);
                error_count += 1;
            }
        }
    }

    info!("fetch complete: {processed} processed, {skipped} retired skipped, {error_count} errors");
    if error_count > 0 {
        bail!("fetch completed with {error_count} errors");
    }
    Ok(())
}

fn run_score(sources_dir: PathBuf, config_path: PathBuf) -> Result<()> {
    let weights = ScoringConfig::load_or_default(&config_path).weights;
    let (catalog, failures) = load_catalog_lenient(&sources_dir)?;
    let mut error_count = failures.len();

    let now = Utc::now();
    let mut scored = 0usize;
    let mut skipped = 0usize;
    for mut loaded in catalog.records {
        if loaded.record.is_retired() {
            info!("skipping retired source {}", loaded.record.id);
            skipped += 1;
            continue;
        }

        info!("scoring {}", loaded.record.id);
        loaded.record.quality_score = Some(quality_score(&loaded.record, &weights, now));
        loaded.record.user_weighted_score =
            Some(user_weighted_score(&loaded.record, &weights, now));

        match save_record(&loaded) {
            Ok(()) => scored += 1,
            Err(e) => {
                error!("failed to save {}: {e}", loaded.record.id);
                error_count += 1;
            }
        }
    }

    info!("scoring complete: {scored} scored, {skipped} retired skipped, {error_count} errors");
    if error_count > 0 {
        bail!("scoring completed with {error_count} errors");
    }
    Ok(())
}

fn run_validate(sources_dir: PathBuf, categories: Option<PathBuf>) -> Result<()> {
    let vocabulary = match categories {
        Some(path) => Some(
            CategorySet::load(&path)
                .with_context(|| format!("failed to load vocabulary from {}", path.display()))?,
        ),
        None => None,
    };

    let mut invalid = 0usize;
    for path in source_files(&sources_dir)? {
        let issues = match fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|raw| serde_json::from_str(&raw).map_err(anyhow::Error::from))
        {
            Ok(value) => validate_value(&value, vocabulary.as_ref()),
            Err(e) => {
                println!("{} is INVALID: {e}", path.display());
                invalid += 1;
                continue;
            }
        };

        if has_errors(&issues) {
            invalid += 1;
            println!("{} is INVALID", path.display());
        } else {
            println!("{} is valid", path.display());
        }
        for issue in &issues {
            let label = match issue.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            };
            println!("  {label} {}: {}", issue.field, issue.message);
        }
    }

    println!();
    if invalid > 0 {
        bail!("validation failed: {invalid} source files do not conform to schema");
    }
    println!("Validation succeeded! All source files conform to schema.");
    Ok(())
}

fn run_retire(sources_dir: PathBuf, id: String) -> Result<()> {
    let (catalog, _) = load_catalog_lenient(&sources_dir)?;
    let Some(mut loaded) = catalog.records.into_iter().find(|l| l.record.id == id) else {
        bail!("no source with id `{id}` under {}", sources_dir.display());
    };

    if loaded.record.is_retired() {
        info!("source {id} is already retired");
        return Ok(());
    }

    loaded.record.retire(Utc::now());
    save_record(&loaded)?;
    info!("retired source {id} ({})", loaded.path.display());
    Ok(())
}

fn run_index(sources_dir: PathBuf, output: PathBuf) -> Result<()> {
    let (catalog, failures) = load_catalog_lenient(&sources_dir)?;
    for failure in &failures {
        error!("excluded from index: {}", failure.error);
    }

    let records: Vec<SourceRecord> = catalog.records.iter().map(|l| l.record.clone()).collect();
    let index = SourceIndex::build(&records).context("index construction aborted")?;
    index.save(&output)?;

    info!(
        "indexed {} sources ({} categories, {} tags, {} formats) to {}",
        index.metadata.source_count,
        index.metadata.category_count,
        index.metadata.tag_count,
        index.metadata.format_count,
        output.display()
    );
    Ok(())
}
