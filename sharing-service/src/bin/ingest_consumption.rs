//! Operational backfill tool: ingest a consumption workbook exported as one
//! CSV file per sheet (Gross, Net, Shared) for a sharing operation.

use std::{env, fs::File};

use anyhow::{bail, Context, Result};
use sharing_service::{
    config::AppConfig,
    ingest::{self, SHEETS},
    observability, workbook,
};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 5 {
        bail!("usage: ingest_consumption <operation-uuid> <gross.csv> <net.csv> <shared.csv>");
    }
    let operation_id: Uuid = args[1]
        .parse()
        .with_context(|| format!("invalid operation id '{}'", args[1]))?;

    // Point SHARING_CONFIG at a backfill-specific file if needed.
    let cfg = AppConfig::load()?;
    if let Some(metrics_cfg) = &cfg.metrics {
        observability::init_metrics(&metrics_cfg.bind_addr)?;
    }

    let mut book = workbook::Workbook::new();
    for ((sheet_name, _), path) in SHEETS.iter().zip(&args[2..5]) {
        let file = File::open(path).with_context(|| format!("failed to open '{path}'"))?;
        let sheet = workbook::sheet_from_csv(file)
            .with_context(|| format!("failed to parse '{path}'"))?;
        book.insert_sheet(*sheet_name, sheet);
    }

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    // The whole run commits atomically; any failure rolls everything back.
    let mut tx = pool.begin().await?;
    let summary = ingest::ingest(
        &mut *tx,
        operation_id,
        &book,
        cfg.ingest.meter_chunk_size,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        %operation_id,
        rows = summary.rows,
        operation_records = summary.operation_records,
        meter_records = summary.meter_records,
        skipped_cells = summary.skipped_cells,
        "backfill complete"
    );

    Ok(())
}
