//! Leaderboard Core: event-sourced aggregate persistence.
//!
//! This crate defines the aggregate contract, the aggregate store and its
//! optimistic-concurrency decorator, request-scoped resource versions and the
//! outbox model. Storage backends live in other crates; this crate contains
//! no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod concurrency;
pub mod error;
pub mod event;
pub mod outbox;
pub mod repository;
pub mod store;
pub mod store_ext;
pub mod version;
