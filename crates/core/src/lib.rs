//! `poultry-core` -- domain logic of the partner administration app.
//!
//! Pure, synchronous building blocks: shipment rows and their edit session,
//! partner statistics, the ranked leaderboard and the weekly trend chart.
//! Nothing here performs I/O; the `poultry-editor` crate drives these types
//! against a backend.

pub mod calendar;
pub mod edit_session;
pub mod error;
pub mod leaderboard;
pub mod location;
pub mod partner;
pub mod shipment;
pub mod stats;
pub mod trend;
pub mod types;
