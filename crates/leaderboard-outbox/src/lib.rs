//! Leaderboard Outbox: reliable delivery of integration messages.
//!
//! Messages are enqueued by the aggregate store in the same append as the
//! events they come from. The [`relay::OutboxRelay`] delivers them on a timer
//! with bounded exponential backoff and hands undeliverable ones to a
//! [`dead_letter::DeadLetterSink`]. Delivery is at-least-once.

pub mod dead_letter;
pub mod error;
pub mod http;
pub mod relay;
pub mod retry;
pub mod transport;
