//! arena-server
//!
//! Multi-client async TCP server for the slot arena.

pub mod config;
pub mod types;
pub mod auth;
pub mod persistence;
pub mod server;

// these are internal modules, not re-exported
mod client;
mod engine_task;
