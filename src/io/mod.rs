//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `world_model` - TCP client for world-model subscribe/publish
//! - `codec` - attribute value encoding/decoding
//! - `alert` - alert sink implementations (world model, console)

pub mod alert;
pub mod codec;
pub mod world_model;

// Re-export commonly used types
pub use alert::{AlertSink, ConsoleAlertSink, WorldModelAlertSink};
pub use world_model::{
    AttributeSample, IdentifierUpdate, StreamHandle, StreamRequest, WorldModelPublisher,
    WorldModelSubscriber,
};
