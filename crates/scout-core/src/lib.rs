//! World boss tracking core.
//!
//! Holds the per-tenant boss/layer state machine, the respawn clock, the
//! registry that serializes mutations per tenant, the collaborator traits the
//! daemon executes effects against, and a SQLite implementation of the store.

pub mod board;
pub mod config;
pub mod error;
pub mod registry;
pub mod respawn;
pub mod sinks;
pub mod store;
pub mod tenants;
pub mod types;
