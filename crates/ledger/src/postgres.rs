use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use common::ProductId;

use crate::{
    LedgerEntry, LedgerError, LedgerQuery, MovementId, Result, Sequence, Snapshot,
    store::{AppendOptions, EntryStream, LedgerStore, validate_entries_for_append},
};

/// PostgreSQL-backed ledger store implementation.
#[derive(Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    /// Creates a new PostgreSQL ledger store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_entry(row: PgRow) -> Result<LedgerEntry> {
        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: HashMap<String, serde_json::Value> = serde_json::from_value(metadata_json)?;

        Ok(LedgerEntry {
            movement_id: MovementId::from_uuid(row.try_get::<Uuid, _>("id")?),
            entry_type: row.try_get("entry_type")?,
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            sequence: Sequence::new(row.try_get("sequence")?),
            recorded_at: row.try_get("recorded_at")?,
            payload: row.try_get("payload")?,
            metadata,
        })
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn append(&self, entries: Vec<LedgerEntry>, options: AppendOptions) -> Result<Sequence> {
        validate_entries_for_append(&entries)?;

        let first_entry = &entries[0];
        let product_id = first_entry.product_id;
        let entry_count = entries.len();

        // Start a transaction
        let mut tx = self.pool.begin().await?;

        // Check expected sequence if specified
        if let Some(expected) = options.expected_sequence {
            let current_sequence: Option<i64> = sqlx::query_scalar(
                "SELECT MAX(sequence) FROM stock_movements WHERE product_id = $1",
            )
            .bind(product_id.as_uuid())
            .fetch_one(&mut *tx)
            .await?;

            let actual = Sequence::new(current_sequence.unwrap_or(0));

            if actual != expected {
                metrics::counter!("ledger_sequence_conflicts_total").increment(1);
                return Err(LedgerError::SequenceConflict {
                    product_id,
                    expected,
                    actual,
                });
            }
        }

        // Insert all entries
        let mut last_sequence = Sequence::initial();
        for entry in &entries {
            let metadata_json = serde_json::to_value(&entry.metadata)?;

            sqlx::query(
                r#"
                INSERT INTO stock_movements (id, entry_type, product_id, sequence, recorded_at, payload, metadata)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(entry.movement_id.as_uuid())
            .bind(&entry.entry_type)
            .bind(entry.product_id.as_uuid())
            .bind(entry.sequence.as_i64())
            .bind(entry.recorded_at)
            .bind(&entry.payload)
            .bind(metadata_json)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                // A unique constraint violation here means a concurrent writer won
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_product_sequence")
                {
                    return LedgerError::SequenceConflict {
                        product_id,
                        expected: options.expected_sequence.unwrap_or(Sequence::initial()),
                        actual: entry.sequence,
                    };
                }
                LedgerError::Database(e)
            })?;

            last_sequence = entry.sequence;
        }

        tx.commit().await?;

        metrics::counter!("ledger_entries_appended_total").increment(entry_count as u64);
        tracing::debug!(
            product_id = %product_id,
            entries = entry_count,
            sequence = %last_sequence,
            "appended ledger entries"
        );

        Ok(last_sequence)
    }

    async fn entries_for_product(&self, product_id: ProductId) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, entry_type, product_id, sequence, recorded_at, payload, metadata
            FROM stock_movements
            WHERE product_id = $1
            ORDER BY sequence ASC
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }

    async fn entries_for_product_from(
        &self,
        product_id: ProductId,
        from_sequence: Sequence,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, entry_type, product_id, sequence, recorded_at, payload, metadata
            FROM stock_movements
            WHERE product_id = $1 AND sequence >= $2
            ORDER BY sequence ASC
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(from_sequence.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }

    async fn query_entries(&self, query: LedgerQuery) -> Result<Vec<LedgerEntry>> {
        let mut sql = String::from(
            "SELECT id, entry_type, product_id, sequence, recorded_at, payload, metadata FROM stock_movements WHERE 1=1",
        );
        let mut param_count = 0;

        // Build dynamic query
        if query.product_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND product_id = ${param_count}"));
        }
        if query.entry_types.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND entry_type = ANY(${param_count})"));
        }
        if query.from_sequence.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND sequence >= ${param_count}"));
        }
        if query.to_sequence.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND sequence <= ${param_count}"));
        }
        if query.from_timestamp.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND recorded_at >= ${param_count}"));
        }
        if query.to_timestamp.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND recorded_at <= ${param_count}"));
        }

        if query.newest_first {
            sql.push_str(" ORDER BY recorded_at DESC, sequence DESC");
        } else {
            sql.push_str(" ORDER BY recorded_at ASC, sequence ASC");
        }

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        // Build and execute query with parameters
        let mut sqlx_query = sqlx::query(&sql);

        if let Some(id) = query.product_id {
            sqlx_query = sqlx_query.bind(id.as_uuid());
        }
        if let Some(entry_types) = query.entry_types {
            sqlx_query = sqlx_query.bind(entry_types);
        }
        if let Some(from_sequence) = query.from_sequence {
            sqlx_query = sqlx_query.bind(from_sequence.as_i64());
        }
        if let Some(to_sequence) = query.to_sequence {
            sqlx_query = sqlx_query.bind(to_sequence.as_i64());
        }
        if let Some(from_ts) = query.from_timestamp {
            sqlx_query = sqlx_query.bind(from_ts);
        }
        if let Some(to_ts) = query.to_timestamp {
            sqlx_query = sqlx_query.bind(to_ts);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_entry).collect()
    }

    async fn entries_by_type(&self, entry_type: &str) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, entry_type, product_id, sequence, recorded_at, payload, metadata
            FROM stock_movements
            WHERE entry_type = $1
            ORDER BY recorded_at ASC
            "#,
        )
        .bind(entry_type)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }

    async fn stream_all_entries(&self) -> Result<EntryStream> {
        use futures_util::StreamExt;

        let stream = sqlx::query(
            r#"
            SELECT id, entry_type, product_id, sequence, recorded_at, payload, metadata
            FROM stock_movements
            ORDER BY recorded_at ASC, id ASC
            "#,
        )
        .fetch(&self.pool)
        .map(|result| match result {
            Ok(row) => Self::row_to_entry(row),
            Err(e) => Err(LedgerError::Database(e)),
        });

        Ok(Box::pin(stream))
    }

    async fn product_sequence(&self, product_id: ProductId) -> Result<Option<Sequence>> {
        let sequence: Option<i64> =
            sqlx::query_scalar("SELECT MAX(sequence) FROM stock_movements WHERE product_id = $1")
                .bind(product_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(sequence.map(Sequence::new))
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_snapshots (product_id, sequence, taken_at, state)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (product_id) DO UPDATE SET
                sequence = EXCLUDED.sequence,
                taken_at = EXCLUDED.taken_at,
                state = EXCLUDED.state
            "#,
        )
        .bind(snapshot.product_id.as_uuid())
        .bind(snapshot.sequence.as_i64())
        .bind(snapshot.taken_at)
        .bind(&snapshot.state)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_snapshot(&self, product_id: ProductId) -> Result<Option<Snapshot>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT product_id, sequence, taken_at, state
            FROM stock_snapshots
            WHERE product_id = $1
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Snapshot {
                product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
                sequence: Sequence::new(row.try_get("sequence")?),
                taken_at: row.try_get::<DateTime<Utc>, _>("taken_at")?,
                state: row.try_get("state")?,
            })),
            None => Ok(None),
        }
    }
}
