//! Core functionality for the chart bridge
//!
//! This crate provides the lifecycle state machine, configuration, error
//! taxonomy and event plumbing shared by the data and bridge crates.

pub mod config;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod logging;

// Re-export commonly used types
pub use config::{BootstrapConfig, BridgeConfig, Margins, MARGIN_LEGEND, MARGIN_TITLE};
pub use error::{BridgeError, BridgeResult};
pub use events::{handler_from_fn, Event, EventBus, EventHandler};
pub use lifecycle::{
    Effect, LifecycleController, LifecycleEvent, LifecycleSnapshot, LifecycleState, MountId,
};
pub use logging::init_logging;

/// Identifier of a logical chart instance
pub type ChartId = uuid::Uuid;
