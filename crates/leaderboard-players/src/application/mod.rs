//! Application layer for the Players context.

pub mod command_handlers;
pub mod query_handlers;
