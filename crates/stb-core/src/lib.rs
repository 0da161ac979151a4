//! Core domain + application logic for the shipment-tracking bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the carrier
//! HTTP API live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod poller;
pub mod ports;
pub mod snapshot;
pub mod store;
pub mod tracking;

pub use errors::{Error, Result};
