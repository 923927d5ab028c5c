//! Services - solver logic and state management
//!
//! This module contains the core solver logic:
//! - `engine` - missing-item decision engine (mobility map, door set, alerts)
//! - `solver` - poll/dispatch loop bridging world-model streams to the engine

pub mod engine;
pub mod solver;

// Re-export commonly used types
pub use engine::DecisionEngine;
pub use solver::Solver;
