//! Domain models - core solver types
//!
//! This module contains the canonical data types used throughout the system:
//! - `MobilityState` - per-item recency-of-movement record
//! - `epoch_ms` - wall-clock timestamps in epoch milliseconds

pub mod types;

pub use types::{epoch_ms, MobilityState, NEVER};
