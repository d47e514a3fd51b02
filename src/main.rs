//! Caresight: batch risk scoring and care-recommendation pipeline.
//!
//! Main entry point: initializes logging, wires the adapters from
//! environment configuration and drives one batch run.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use caresight::adapters::records::JsonRecordSource;
use caresight::adapters::sqlite::SqliteStorage;
use caresight::application::{PipelineConfig, PipelineService};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Caresight...");

    let db_path =
        std::env::var("CARESIGHT_DB").unwrap_or_else(|_| "caresight.db".to_string());
    let records_path =
        std::env::var("CARESIGHT_RECORDS").unwrap_or_else(|_| "records.json".to_string());

    let mut config = PipelineConfig::default();
    if let Ok(limit) = std::env::var("CARESIGHT_FETCH_LIMIT") {
        if let Ok(limit) = limit.trim().parse() {
            config.fetch_limit = limit;
        }
    }
    if let Ok(key) = std::env::var("CARESIGHT_ARTIFACT_KEY") {
        config.artifact_key = key;
    }

    let storage = Arc::new(SqliteStorage::new(&db_path)?);
    let source = Arc::new(JsonRecordSource::new(&records_path));
    let pipeline = PipelineService::new(source, storage.clone(), storage, config);

    let summary = pipeline.run()?;

    tracing::info!(
        processed = summary.processed,
        low = summary.low,
        medium = summary.medium,
        high = summary.high,
        writeback_ok = summary.writeback_ok,
        writeback_failed = summary.writeback_failed,
        care_gaps = summary.care_gaps_created,
        care_gap_failures = summary.care_gap_failures,
        refit = summary.refit,
        "Caresight run complete"
    );

    Ok(())
}
