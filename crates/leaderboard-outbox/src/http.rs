//! HTTP transport: POSTs each message as JSON to `{base_url}/{destination}`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leaderboard_core::outbox::OutboxMessage;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use uuid::Uuid;

use crate::transport::{Transport, TransportError};

/// Header carrying the message id so consumers can deduplicate redeliveries.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Wire format of a delivered message.
#[derive(Debug, Serialize)]
struct MessageEnvelope<'a> {
    message_id: Uuid,
    event_id: Uuid,
    aggregate_id: Uuid,
    message_type: &'a str,
    correlation_id: Uuid,
    enqueued_at: DateTime<Utc>,
    payload: &'a serde_json::Value,
}

impl<'a> From<&'a OutboxMessage> for MessageEnvelope<'a> {
    fn from(message: &'a OutboxMessage) -> Self {
        Self {
            message_id: message.message_id,
            event_id: message.event_id,
            aggregate_id: message.aggregate_id,
            message_type: &message.message_type,
            correlation_id: message.correlation_id,
            enqueued_at: message.enqueued_at,
            payload: &message.payload,
        }
    }
}

/// Webhook-style [`Transport`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport that sends to `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self, destination: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), destination)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, message: &OutboxMessage) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.endpoint(&message.destination))
            .header(IDEMPOTENCY_KEY_HEADER, message.message_id.to_string())
            .json(&MessageEnvelope::from(message))
            .send()
            .await
            .map_err(|e| classify_request_error(&e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }
}

fn classify_request_error(error: &reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_builder() {
        TransportError::Rejected(error.to_string())
    } else {
        TransportError::Unavailable(error.to_string())
    }
}

/// Client errors mean the consumer will never accept the message, except
/// for request timeouts and throttling.
fn classify_status(status: StatusCode, body: &str) -> TransportError {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {body}")
    };
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            TransportError::Unavailable(detail)
        }
        s if s.is_client_error() => TransportError::Rejected(detail),
        _ => TransportError::Unavailable(detail),
    }
}
