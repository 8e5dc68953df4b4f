//! Leaderboard: Players bounded context.
//!
//! Registers players and records the game events (scores) they produce.
//! Every change is published to the leaderboard through the outbox.

pub mod application;
pub mod domain;
pub mod integration;
