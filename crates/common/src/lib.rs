//! Types and bootstrap helpers shared by every crate in the workspace.

pub mod config;
pub mod telemetry;
pub mod types;

pub use config::{ConfigError, LogFormat, StoreConfig, TelemetryConfig};
pub use types::AggregateId;
