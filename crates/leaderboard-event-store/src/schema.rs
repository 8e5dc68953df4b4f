//! Event store database schema.
//!
//! The DDL lives in the workspace `migrations/` directory: `event_streams`
//! (one locked row per aggregate), `domain_events` and `outbox_messages`.
//! Applying it is left to deployment tooling; the server never migrates.

use sqlx::migrate::Migrator;

/// The workspace migrations, embedded at compile time.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");
