use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use common::StoreConfig;
use futures_util::{TryStreamExt, stream};
use sqlx::{PgPool, Row, postgres::PgPoolOptions, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, EventEnvelope, EventId, EventStoreError, PendingEvent, Result, Snapshot, Version,
    snapshot::SnapshotStore,
    store::{AppendOptions, EventStore, EventStream, check_expected_version, validate_batch},
};

const DEFAULT_BATCH_SIZE: u32 = 256;

/// PostgreSQL-backed event and snapshot store.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
    batch_size: u32,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Connects a pool as described by the configuration.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let url = config.database_url.as_deref().ok_or_else(|| {
            EventStoreError::Configuration("DATABASE_URL is not set".to_string())
        })?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await?;

        Ok(Self::new(pool).with_batch_size(config.stream_batch_size))
    }

    /// Sets how many rows a stream read fetches per round trip.
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<EventEnvelope> {
        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: HashMap<String, serde_json::Value> = serde_json::from_value(metadata_json)?;

        Ok(EventEnvelope {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            aggregate_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
            aggregate_type: row.try_get("aggregate_type")?,
            version: Version::new(row.try_get("version")?),
            timestamp: row.try_get("timestamp")?,
            payload: row.try_get("payload")?,
            metadata,
        })
    }

    async fn fetch_page(
        pool: &PgPool,
        aggregate_id: AggregateId,
        from_version: Version,
        limit: u32,
    ) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata
            FROM events
            WHERE aggregate_id = $1 AND version >= $2
            ORDER BY version ASC
            LIMIT $3
            "#,
        )
        .bind(aggregate_id.as_uuid())
        .bind(from_version.as_i64())
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn snapshot_version(&self, aggregate_id: AggregateId) -> Result<Version> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM snapshots WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        Ok(version.map(Version::new).unwrap_or(Version::initial()))
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append(
        &self,
        aggregate_id: AggregateId,
        events: Vec<PendingEvent>,
        options: AppendOptions,
    ) -> Result<Vec<EventEnvelope>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }
        validate_batch(&events)?;

        let mut tx = self.pool.begin().await?;

        // Serialize appenders of the same stream for the rest of the transaction.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(aggregate_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        let current: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_one(&mut *tx)
                .await?;
        let current = Version::new(current.unwrap_or(0));

        check_expected_version(aggregate_id, options.expected_version, current)?;

        let now = Utc::now();
        let mut version = current;
        let mut sequenced = Vec::with_capacity(events.len());

        for pending in events {
            version = version.next();
            let event = EventEnvelope::sequence(pending, aggregate_id, version, now);
            let metadata_json = serde_json::to_value(&event.metadata)?;

            sqlx::query(
                r#"
                INSERT INTO events (id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(event.event_id.as_uuid())
            .bind(&event.event_type)
            .bind(event.aggregate_id.as_uuid())
            .bind(&event.aggregate_type)
            .bind(event.version.as_i64())
            .bind(event.timestamp)
            .bind(&event.payload)
            .bind(metadata_json)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_aggregate_version")
                {
                    return EventStoreError::ConcurrencyConflict {
                        aggregate_id,
                        expected: options.expected_version.unwrap_or(current),
                        actual: event.version,
                    };
                }
                EventStoreError::Database(e)
            })?;

            sequenced.push(event);
        }

        tx.commit().await?;

        tracing::debug!(
            %aggregate_id,
            first = %current.next(),
            last = %version,
            "appended events"
        );

        Ok(sequenced)
    }

    async fn read_stream(&self, aggregate_id: AggregateId) -> Result<EventStream> {
        let pool = self.pool.clone();
        let batch_size = self.batch_size;

        let pages = stream::try_unfold(Some(Version::first()), move |from| {
            let pool = pool.clone();
            async move {
                let Some(from) = from else {
                    return Ok(None);
                };

                let page = Self::fetch_page(&pool, aggregate_id, from, batch_size).await?;
                if page.is_empty() {
                    return Ok(None);
                }

                let next = if page.len() < batch_size as usize {
                    None
                } else {
                    page.last().map(|e| e.version.next())
                };
                let page = stream::iter(page.into_iter().map(Ok::<_, EventStoreError>));
                Ok::<_, EventStoreError>(Some((page, next)))
            }
        });

        Ok(Box::pin(pages.try_flatten()))
    }

    async fn current_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(version.map(Version::new))
    }
}

#[async_trait]
impl SnapshotStore for PostgresEventStore {
    async fn load_snapshot(&self, aggregate_id: AggregateId) -> Result<Option<Snapshot>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT aggregate_id, aggregate_type, version, timestamp, state
            FROM snapshots
            WHERE aggregate_id = $1
            "#,
        )
        .bind(aggregate_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Snapshot {
                aggregate_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
                aggregate_type: row.try_get("aggregate_type")?,
                version: Version::new(row.try_get("version")?),
                timestamp: row.try_get("timestamp")?,
                state: row.try_get("state")?,
            })),
            None => Ok(None),
        }
    }

    async fn save_snapshot(&self, snapshot: Snapshot, expected: Version) -> Result<()> {
        let result = if expected == Version::initial() {
            sqlx::query(
                r#"
                INSERT INTO snapshots (aggregate_id, aggregate_type, version, timestamp, state)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (aggregate_id) DO NOTHING
                "#,
            )
            .bind(snapshot.aggregate_id.as_uuid())
            .bind(&snapshot.aggregate_type)
            .bind(snapshot.version.as_i64())
            .bind(snapshot.timestamp)
            .bind(&snapshot.state)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE snapshots
                SET aggregate_type = $2, version = $3, timestamp = $4, state = $5
                WHERE aggregate_id = $1 AND version = $6
                "#,
            )
            .bind(snapshot.aggregate_id.as_uuid())
            .bind(&snapshot.aggregate_type)
            .bind(snapshot.version.as_i64())
            .bind(snapshot.timestamp)
            .bind(&snapshot.state)
            .bind(expected.as_i64())
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() == 0 {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id: snapshot.aggregate_id,
                expected,
                actual: self.snapshot_version(snapshot.aggregate_id).await?,
            });
        }

        Ok(())
    }
}
