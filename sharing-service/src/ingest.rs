//! Consumption ingestion: parse the three-sheet workbook, aggregate at
//! operation and meter granularity for the meters authorized via the
//! timeline, and upsert the resulting time series.

use std::collections::BTreeMap;

use time::OffsetDateTime;
use timeline_client::domain::{
    ConsumptionVector, Direction, MeterConsumption, OperationConsumption, ValueKind,
};
use timeline_client::store::{ConsumptionStore, PeriodStore, StoreError};
use uuid::Uuid;

use crate::workbook::{parse_timestamp, CellValue, Sheet, TimestampParseError, Workbook};

/// One sheet per value kind; sheets absent from the upload are skipped.
pub const SHEETS: [(&str, ValueKind); 3] = [
    ("Gross", ValueKind::Gross),
    ("Net", ValueKind::Net),
    ("Shared", ValueKind::Shared),
];

/// Rows 0-3 are headers/metadata; measurements start here.
const DATA_START_ROW: usize = 4;

pub const DEFAULT_METER_CHUNK_SIZE: usize = 1000;

#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("no meter has ever been linked to sharing operation {0}")]
    NoAuthorizedMeters(Uuid),
    /// A malformed timestamp cell means the file is structurally wrong, so
    /// the whole call aborts instead of skipping the row.
    #[error("invalid date format: {0}")]
    InvalidDateFormat(#[from] TimestampParseError),
    #[error("failed to persist ingested records: {0}")]
    Persist(#[source] StoreError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub rows: usize,
    pub cells: usize,
    pub skipped_cells: usize,
    pub operation_records: usize,
    pub meter_records: usize,
}

/// A data column resolved from the two header rows.
struct ColumnBinding {
    index: usize,
    ean: String,
    direction: Direction,
}

fn direction_of(header: &CellValue) -> Option<Direction> {
    let text = header.as_text()?;
    if text.contains("Withdrawal") {
        Some(Direction::Consumption)
    } else if text.contains("Injection") {
        Some(Direction::Injection)
    } else {
        None
    }
}

/// Resolve `(ean, direction)` per column from the first two rows. Columns
/// with an unrecognized direction or no EAN are dropped, not an error.
fn bind_columns(sheet: &Sheet) -> Vec<ColumnBinding> {
    let (Some(directions), Some(eans)) = (sheet.row(0), sheet.row(1)) else {
        return Vec::new();
    };

    directions
        .iter()
        .enumerate()
        .skip(1) // column 0 holds the timestamps
        .filter_map(|(index, header)| {
            let direction = direction_of(header)?;
            let ean = match eans.get(index) {
                Some(CellValue::Text(s)) if !s.trim().is_empty() => s.trim().to_string(),
                // Numeric EAN cells happen when the export re-types the code.
                Some(CellValue::Number(n)) => format!("{n:.0}"),
                _ => {
                    metrics::counter!("ingest_unmapped_columns_total").increment(1);
                    return None;
                }
            };
            Some(ColumnBinding {
                index,
                ean,
                direction,
            })
        })
        .collect()
}

#[derive(Default)]
struct Aggregation {
    operation: BTreeMap<OffsetDateTime, ConsumptionVector>,
    meters: BTreeMap<String, BTreeMap<OffsetDateTime, ConsumptionVector>>,
    rows: usize,
    cells: usize,
    skipped_cells: usize,
}

impl Aggregation {
    fn is_empty(&self) -> bool {
        self.operation.is_empty() && self.meters.is_empty()
    }
}

/// Ingest the workbook for one sharing operation.
///
/// Only meters that have ever had a configuration period referencing the
/// operation contribute; columns for any other EAN are ignored. The
/// operation aggregate sums every authorized cell per timestamp, while the
/// per-meter series keeps each meter's own reading (overwritten, not
/// summed). `store` is the caller's transaction scope; the authorization
/// read and every write happen inside it.
pub async fn ingest<S>(
    store: &mut S,
    operation_id: Uuid,
    workbook: &Workbook,
    meter_chunk_size: usize,
) -> Result<IngestSummary, IngestError>
where
    S: PeriodStore + ConsumptionStore,
{
    let authorized = store.eans_linked_to_operation(operation_id).await?;
    if authorized.is_empty() {
        return Err(IngestError::NoAuthorizedMeters(operation_id));
    }

    let mut agg = Aggregation::default();
    for (sheet_name, kind) in SHEETS {
        let Some(sheet) = workbook.sheet(sheet_name) else {
            tracing::warn!(sheet = sheet_name, "workbook sheet missing, skipping");
            continue;
        };
        let bindings = bind_columns(sheet);
        if bindings.is_empty() {
            continue;
        }

        for row in sheet.rows.iter().skip(DATA_START_ROW) {
            if row.iter().all(|c| matches!(c, CellValue::Empty)) {
                continue;
            }
            let ts_cell = row.first().unwrap_or(&CellValue::Empty);
            let ts = parse_timestamp(ts_cell)?;
            agg.rows += 1;

            for binding in &bindings {
                let Some(value) = row.get(binding.index).and_then(CellValue::as_f64) else {
                    agg.skipped_cells += 1;
                    metrics::counter!("ingest_non_numeric_cells_total").increment(1);
                    continue;
                };
                if !authorized.contains(&binding.ean) {
                    agg.skipped_cells += 1;
                    metrics::counter!("ingest_unauthorized_cells_total").increment(1);
                    continue;
                }

                agg.cells += 1;
                agg.operation
                    .entry(ts)
                    .or_default()
                    .add_sample(kind, binding.direction, value);
                agg.meters
                    .entry(binding.ean.clone())
                    .or_default()
                    .entry(ts)
                    .or_default()
                    .set_sample(kind, binding.direction, value);
            }
        }
    }

    // An upload with no valid measurements is a valid no-op.
    if agg.is_empty() {
        tracing::info!(%operation_id, "workbook contained no usable rows, nothing persisted");
        return Ok(IngestSummary::default());
    }

    let summary = persist(store, operation_id, agg, meter_chunk_size).await?;
    tracing::info!(
        %operation_id,
        rows = summary.rows,
        operation_records = summary.operation_records,
        meter_records = summary.meter_records,
        skipped_cells = summary.skipped_cells,
        "consumption ingest complete"
    );
    Ok(summary)
}

async fn persist<C: ConsumptionStore>(
    store: &mut C,
    operation_id: Uuid,
    agg: Aggregation,
    meter_chunk_size: usize,
) -> Result<IngestSummary, IngestError> {
    let operation_records: Vec<OperationConsumption> = agg
        .operation
        .iter()
        .map(|(&ts, &values)| OperationConsumption {
            operation_id,
            ts,
            values,
        })
        .collect();
    store
        .save_operation_batch(&operation_records)
        .await
        .map_err(IngestError::Persist)?;

    let meter_records: Vec<MeterConsumption> = agg
        .meters
        .iter()
        .flat_map(|(ean, series)| {
            series.iter().map(|(&ts, &values)| MeterConsumption {
                ean: ean.clone(),
                ts,
                values,
            })
        })
        .collect();

    let chunk_size = meter_chunk_size.max(1);
    let mut meter_count = 0;
    for chunk in meter_records.chunks(chunk_size) {
        let keys: Vec<(String, OffsetDateTime)> =
            chunk.iter().map(|r| (r.ean.clone(), r.ts)).collect();
        let existing = store
            .find_meter_records(&keys)
            .await
            .map_err(IngestError::Persist)?;
        let existing: BTreeMap<(String, OffsetDateTime), MeterConsumption> = existing
            .into_iter()
            .map(|r| ((r.ean.clone(), r.ts), r))
            .collect();

        let merged: Vec<MeterConsumption> = chunk
            .iter()
            .map(|record| match existing.get(&(record.ean.clone(), record.ts)) {
                Some(stored) => {
                    let mut updated = stored.clone();
                    updated.values.merge_from(&record.values);
                    updated
                }
                None => record.clone(),
            })
            .collect();

        store
            .save_meter_batch(&merged)
            .await
            .map_err(IngestError::Persist)?;
        meter_count += merged.len();
    }

    Ok(IngestSummary {
        rows: agg.rows,
        cells: agg.cells,
        skipped_cells: agg.skipped_cells,
        operation_records: operation_records.len(),
        meter_records: meter_count,
    })
}
