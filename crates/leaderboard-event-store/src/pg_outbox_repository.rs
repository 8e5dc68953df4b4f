//! `PostgreSQL` implementation of the `OutboxRepository` trait.
//!
//! `fetch_due` claims the rows it returns: they are locked with
//! `FOR UPDATE SKIP LOCKED` and leased by pushing `next_attempt_at` forward,
//! so relays in several processes never hold the same message. The lease
//! ends when the relay records an outcome, or when it expires after a crash.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgQueryResult;
use uuid::Uuid;

use leaderboard_core::clock;
use leaderboard_core::error::DomainError;
use leaderboard_core::outbox::{DeliveryState, OutboxMessage, OutboxRepository};

use crate::convert::{db_error, from_integer, to_integer, to_limit};

const SELECT_MESSAGES: &str = r"
    SELECT message_id, event_id, aggregate_id, destination, message_type, payload,
           correlation_id, state, attempts, enqueued_at, next_attempt_at,
           delivered_at, last_error
    FROM outbox_messages
";

const CLAIM_DUE_MESSAGES: &str = r"
    WITH claimed AS (
        SELECT position
        FROM outbox_messages
        WHERE state IN ('pending', 'retrying') AND next_attempt_at <= $1
        ORDER BY position
        LIMIT $2
        FOR UPDATE SKIP LOCKED
    )
    UPDATE outbox_messages m
    SET next_attempt_at = $3
    FROM claimed
    WHERE m.position = claimed.position
    RETURNING m.position, m.message_id, m.event_id, m.aggregate_id, m.destination,
              m.message_type, m.payload, m.correlation_id, m.state, m.attempts,
              m.enqueued_at, m.next_attempt_at, m.delivered_at, m.last_error
";

/// Default time a claimed message stays invisible to other relays.
pub const DEFAULT_CLAIM_LEASE: Duration = Duration::from_secs(300);

/// PostgreSQL-backed outbox, sharing the event store's database.
#[derive(Debug, Clone)]
pub struct PgOutboxRepository {
    pool: PgPool,
    claim_lease: Duration,
}

impl PgOutboxRepository {
    /// Creates a new `PgOutboxRepository` with [`DEFAULT_CLAIM_LEASE`].
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            claim_lease: DEFAULT_CLAIM_LEASE,
        }
    }

    /// Sets how long a claimed message stays invisible to other relays. It
    /// must outlast one dispatch pass.
    #[must_use]
    pub fn with_claim_lease(mut self, claim_lease: Duration) -> Self {
        self.claim_lease = claim_lease;
        self
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    message_id: Uuid,
    event_id: Uuid,
    aggregate_id: Uuid,
    destination: String,
    message_type: String,
    payload: serde_json::Value,
    correlation_id: Uuid,
    state: String,
    attempts: i32,
    enqueued_at: DateTime<Utc>,
    next_attempt_at: DateTime<Utc>,
    delivered_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ClaimedRow {
    position: i64,
    #[sqlx(flatten)]
    message: MessageRow,
}

impl TryFrom<MessageRow> for OutboxMessage {
    type Error = DomainError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            message_id: row.message_id,
            event_id: row.event_id,
            aggregate_id: row.aggregate_id,
            destination: row.destination,
            message_type: row.message_type,
            payload: row.payload,
            correlation_id: row.correlation_id,
            state: row.state.parse()?,
            attempts: from_integer(row.attempts, "attempts")?,
            enqueued_at: row.enqueued_at,
            next_attempt_at: row.next_attempt_at,
            delivered_at: row.delivered_at,
            last_error: row.last_error,
        })
    }
}

fn expect_one(result: PgQueryResult, message_id: Uuid) -> Result<(), DomainError> {
    if result.rows_affected() == 0 {
        return Err(DomainError::Infrastructure(format!(
            "outbox message {message_id} not found"
        )));
    }
    Ok(())
}

impl PgOutboxRepository {
    async fn fetch(&self, filter: &str, limit: usize) -> Result<Vec<OutboxMessage>, DomainError> {
        let sql = format!("{SELECT_MESSAGES} {filter}");
        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(to_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.into_iter().map(OutboxMessage::try_from).collect()
    }

    async fn set_state(
        &self,
        message_id: Uuid,
        state: DeliveryState,
        attempts: u32,
        next_attempt_at: Option<DateTime<Utc>>,
        delivered_at: Option<DateTime<Utc>>,
        error: Option<&str>,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r"
            UPDATE outbox_messages
            SET state = $2,
                attempts = $3,
                next_attempt_at = COALESCE($4, next_attempt_at),
                delivered_at = COALESCE($5, delivered_at),
                last_error = COALESCE($6, last_error)
            WHERE message_id = $1
            ",
        )
        .bind(message_id)
        .bind(state.as_str())
        .bind(to_integer(attempts, "attempts")?)
        .bind(next_attempt_at)
        .bind(delivered_at)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        expect_one(result, message_id)
    }
}

#[async_trait]
impl OutboxRepository for PgOutboxRepository {
    async fn fetch_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<OutboxMessage>, DomainError> {
        let mut rows = sqlx::query_as::<_, ClaimedRow>(CLAIM_DUE_MESSAGES)
            .bind(now)
            .bind(to_limit(limit))
            .bind(clock::after(now, self.claim_lease))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        // RETURNING does not keep the claim order.
        rows.sort_by_key(|row| row.position);
        rows.into_iter()
            .map(|row| OutboxMessage::try_from(row.message))
            .collect()
    }

    async fn mark_delivered(
        &self,
        message_id: Uuid,
        attempts: u32,
        delivered_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.set_state(
            message_id,
            DeliveryState::Delivered,
            attempts,
            None,
            Some(delivered_at),
            None,
        )
        .await
    }

    async fn schedule_retry(
        &self,
        message_id: Uuid,
        attempts: u32,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), DomainError> {
        self.set_state(
            message_id,
            DeliveryState::Retrying,
            attempts,
            Some(next_attempt_at),
            None,
            Some(error),
        )
        .await
    }

    async fn mark_failed(
        &self,
        message_id: Uuid,
        attempts: u32,
        error: &str,
    ) -> Result<(), DomainError> {
        self.set_state(
            message_id,
            DeliveryState::FailedPermanently,
            attempts,
            None,
            None,
            Some(error),
        )
        .await
    }

    async fn dead_letters(&self, limit: usize) -> Result<Vec<OutboxMessage>, DomainError> {
        self.fetch(
            "WHERE state = 'failed-permanently' ORDER BY position LIMIT $1",
            limit,
        )
        .await
    }
}
