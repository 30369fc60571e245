use async_trait::async_trait;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::domain::{ConsumptionVector, MeterConsumption, OperationConsumption};
use crate::store::{ConsumptionStore, StoreError};

#[derive(sqlx::FromRow)]
struct MeterConsumptionRow {
    ean: String,
    ts: OffsetDateTime,
    gross_consumption: Option<f64>,
    net_consumption: Option<f64>,
    shared_consumption: Option<f64>,
    gross_injection: Option<f64>,
    net_injection: Option<f64>,
    shared_injection: Option<f64>,
}

impl From<MeterConsumptionRow> for MeterConsumption {
    fn from(row: MeterConsumptionRow) -> Self {
        MeterConsumption {
            ean: row.ean,
            ts: row.ts,
            values: ConsumptionVector {
                gross_consumption: row.gross_consumption,
                net_consumption: row.net_consumption,
                shared_consumption: row.shared_consumption,
                gross_injection: row.gross_injection,
                net_injection: row.net_injection,
                shared_injection: row.shared_injection,
            },
        }
    }
}

const UPSERT_CHANNELS: &str = " DO UPDATE SET \
     gross_consumption = EXCLUDED.gross_consumption, \
     net_consumption = EXCLUDED.net_consumption, \
     shared_consumption = EXCLUDED.shared_consumption, \
     gross_injection = EXCLUDED.gross_injection, \
     net_injection = EXCLUDED.net_injection, \
     shared_injection = EXCLUDED.shared_injection";

#[async_trait]
impl ConsumptionStore for PgConnection {
    async fn find_meter_records(
        &mut self,
        keys: &[(String, OffsetDateTime)],
    ) -> Result<Vec<MeterConsumption>, StoreError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT ean, ts, gross_consumption, net_consumption, shared_consumption, \
             gross_injection, net_injection, shared_injection \
             FROM meter_consumption WHERE (ean, ts) IN ",
        );
        builder.push_tuples(keys, |mut b, (ean, ts)| {
            b.push_bind(ean).push_bind(ts);
        });

        let rows = builder
            .build_query_as::<MeterConsumptionRow>()
            .fetch_all(&mut *self)
            .await?;

        Ok(rows.into_iter().map(MeterConsumption::from).collect())
    }

    async fn save_operation_batch(
        &mut self,
        records: &[OperationConsumption],
    ) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO operation_consumption \
             (operation_id, ts, gross_consumption, net_consumption, shared_consumption, \
              gross_injection, net_injection, shared_injection) ",
        );
        builder.push_values(records, |mut b, r| {
            b.push_bind(r.operation_id)
                .push_bind(r.ts)
                .push_bind(r.values.gross_consumption)
                .push_bind(r.values.net_consumption)
                .push_bind(r.values.shared_consumption)
                .push_bind(r.values.gross_injection)
                .push_bind(r.values.net_injection)
                .push_bind(r.values.shared_injection);
        });
        builder.push(" ON CONFLICT (operation_id, ts)");
        builder.push(UPSERT_CHANNELS);

        builder.build().execute(&mut *self).await?;
        Ok(())
    }

    async fn save_meter_batch(&mut self, records: &[MeterConsumption]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO meter_consumption \
             (ean, ts, gross_consumption, net_consumption, shared_consumption, \
              gross_injection, net_injection, shared_injection) ",
        );
        builder.push_values(records, |mut b, r| {
            b.push_bind(&r.ean)
                .push_bind(r.ts)
                .push_bind(r.values.gross_consumption)
                .push_bind(r.values.net_consumption)
                .push_bind(r.values.shared_consumption)
                .push_bind(r.values.gross_injection)
                .push_bind(r.values.net_injection)
                .push_bind(r.values.shared_injection);
        });
        builder.push(" ON CONFLICT (ean, ts)");
        builder.push(UPSERT_CHANNELS);

        builder.build().execute(&mut *self).await?;
        Ok(())
    }
}
