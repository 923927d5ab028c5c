//! Infrastructure - configuration and runtime counters
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults)
//! - `stats` - Lock-free runtime counters

pub mod config;
pub mod stats;

// Re-export commonly used types
pub use config::Config;
pub use stats::SolverStats;
