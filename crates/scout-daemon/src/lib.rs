//! Background daemon for the boss-scout tracker.
//!
//! Wires the tracking core to its collaborators and provides:
//! - Scout submission handling (validation, transition, effects)
//! - The periodic respawn reconciliation loop
//! - Status board upkeep and tenant administration
//! - Cooperative shutdown

pub mod admin;
pub mod boards;
pub mod daemon;
pub mod platform;
pub mod reconciler;
pub mod shutdown;
pub mod submission;
