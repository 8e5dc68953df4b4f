//! PostgreSQL event store and transactional outbox.

pub mod pg_event_repository;
pub mod pg_outbox_repository;
pub mod schema;

mod convert;
