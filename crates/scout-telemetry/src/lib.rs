//! Logging setup shared by the boss-scout binaries.
//!
//! Everything goes through `tracing`; this crate only decides how the
//! subscriber formats events (human-readable or JSON lines) and which
//! levels pass the filter.

pub mod logging;
