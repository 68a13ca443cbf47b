//! HTTP server for the roulette table.
//!
//! Serves the board catalog, opens rounds, settles client ledgers against the
//! authoritative account balance and exposes bet history and daily stats.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
