//! `PostgreSQL` implementation of the `EventRepository` trait.
//!
//! An append runs in one transaction: the stream row is locked with
//! `SELECT ... FOR UPDATE`, the expected version is checked against it, and
//! the events, the new stream version and the outbox rows are written
//! before commit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use leaderboard_core::error::DomainError;
use leaderboard_core::outbox::OutboxMessage;
use leaderboard_core::repository::{EventRepository, ExpectedVersion, StoredEvent};

use crate::convert::{db_error, from_bigint, to_bigint, to_integer};

/// PostgreSQL-backed event repository.
#[derive(Debug, Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    /// Creates a new `PgEventRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    event_id: Uuid,
    aggregate_id: Uuid,
    event_type: String,
    payload: serde_json::Value,
    sequence_number: i64,
    correlation_id: Uuid,
    causation_id: Uuid,
    occurred_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for StoredEvent {
    type Error = DomainError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            event_id: row.event_id,
            aggregate_id: row.aggregate_id,
            event_type: row.event_type,
            payload: row.payload,
            sequence_number: from_bigint(row.sequence_number, "sequence_number")?,
            correlation_id: row.correlation_id,
            causation_id: row.causation_id,
            occurred_at: row.occurred_at,
        })
    }
}

/// Locks the stream row, creating it at version 0 if needed, and returns the
/// current version.
async fn lock_stream(
    tx: &mut Transaction<'_, Postgres>,
    aggregate_id: Uuid,
) -> Result<u64, DomainError> {
    sqlx::query(
        r"
        INSERT INTO event_streams (aggregate_id, version)
        VALUES ($1, 0)
        ON CONFLICT (aggregate_id) DO NOTHING
        ",
    )
    .bind(aggregate_id)
    .execute(&mut **tx)
    .await
    .map_err(db_error)?;

    let version: i64 = sqlx::query_scalar(
        r"
        SELECT version
        FROM event_streams
        WHERE aggregate_id = $1
        FOR UPDATE
        ",
    )
    .bind(aggregate_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(db_error)?;

    from_bigint(version, "version")
}

async fn insert_events(
    tx: &mut Transaction<'_, Postgres>,
    aggregate_id: Uuid,
    current: u64,
    events: &[StoredEvent],
) -> Result<u64, DomainError> {
    let mut rows = Vec::with_capacity(events.len());
    let mut version = current;
    for event in events {
        version += 1;
        rows.push((event, to_bigint(version, "sequence_number")?));
    }

    let mut qb = QueryBuilder::<Postgres>::new(
        "INSERT INTO domain_events (event_id, aggregate_id, event_type, payload, \
         sequence_number, correlation_id, causation_id, occurred_at) ",
    );
    qb.push_values(rows, |mut b, (event, sequence_number)| {
        b.push_bind(event.event_id)
            .push_bind(aggregate_id)
            .push_bind(&event.event_type)
            .push_bind(&event.payload)
            .push_bind(sequence_number)
            .push_bind(event.correlation_id)
            .push_bind(event.causation_id)
            .push_bind(event.occurred_at);
    });
    qb.build().execute(&mut **tx).await.map_err(db_error)?;

    sqlx::query(
        r"
        UPDATE event_streams
        SET version = $2, updated_at = NOW()
        WHERE aggregate_id = $1
        ",
    )
    .bind(aggregate_id)
    .bind(to_bigint(version, "version")?)
    .execute(&mut **tx)
    .await
    .map_err(db_error)?;

    Ok(version)
}

async fn insert_outbox(
    tx: &mut Transaction<'_, Postgres>,
    messages: &[OutboxMessage],
) -> Result<(), DomainError> {
    if messages.is_empty() {
        return Ok(());
    }

    let mut rows = Vec::with_capacity(messages.len());
    for message in messages {
        rows.push((message, to_integer(message.attempts, "attempts")?));
    }

    let mut qb = QueryBuilder::<Postgres>::new(
        "INSERT INTO outbox_messages (message_id, event_id, aggregate_id, destination, \
         message_type, payload, correlation_id, state, attempts, enqueued_at, \
         next_attempt_at, delivered_at, last_error) ",
    );
    qb.push_values(rows, |mut b, (message, attempts)| {
        b.push_bind(message.message_id)
            .push_bind(message.event_id)
            .push_bind(message.aggregate_id)
            .push_bind(&message.destination)
            .push_bind(&message.message_type)
            .push_bind(&message.payload)
            .push_bind(message.correlation_id)
            .push_bind(message.state.as_str())
            .push_bind(attempts)
            .push_bind(message.enqueued_at)
            .push_bind(message.next_attempt_at)
            .push_bind(message.delivered_at)
            .push_bind(&message.last_error);
    });
    qb.build().execute(&mut **tx).await.map_err(db_error)?;

    Ok(())
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r"
            SELECT event_id, aggregate_id, event_type, payload, sequence_number,
                   correlation_id, causation_id, occurred_at
            FROM domain_events
            WHERE aggregate_id = $1
            ORDER BY sequence_number
            ",
        )
        .bind(aggregate_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(StoredEvent::try_from).collect()
    }

    #[tracing::instrument(
        skip(self, events, outbox, cancel),
        fields(aggregate_id = %aggregate_id, events_len = events.len(), outbox_len = outbox.len())
    )]
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: ExpectedVersion,
        events: &[StoredEvent],
        outbox: &[OutboxMessage],
        cancel: &CancellationToken,
    ) -> Result<u64, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Dropping `tx` without commit rolls back, including the stream row
        // `lock_stream` may have created.
        let current = lock_stream(&mut tx, aggregate_id).await?;
        expected_version.check(aggregate_id, current)?;
        if events.is_empty() {
            return Ok(current);
        }

        let next_version = insert_events(&mut tx, aggregate_id, current, events).await?;
        insert_outbox(&mut tx, outbox).await?;

        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }
        tx.commit().await.map_err(db_error)?;

        tracing::debug!(current, next_version, "events appended");
        Ok(next_version)
    }
}
