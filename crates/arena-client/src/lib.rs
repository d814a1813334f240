//! arena-client
//!
//! Line-oriented terminal client for the slot arena: bootstraps a
//! nickname, connects, prints server events and sends commands typed on
//! stdin.

pub mod app;
pub mod commands;
pub mod network;
