//! Domain layer for the Players context.

pub mod aggregates;
pub mod commands;
pub mod events;
