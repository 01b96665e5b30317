//! `poultry-editor` library crate.
//!
//! Drives the `poultry-core` edit session, leaderboard, trend chart and
//! partner directory against a backend [`Gateway`](gateway::Gateway). The
//! report binary lives in `main.rs`.

pub mod config;
pub mod directory;
pub mod editor;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod report;
