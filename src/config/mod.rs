//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc with the server and the admission pipeline
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart, which also
//!   drops every cached pool options snapshot
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AgentDefaults, AnalyticsConfig, GatewayConfig, ListenerConfig, ObservabilityConfig,
    SingleAppConfig, UpstreamConfig,
};
