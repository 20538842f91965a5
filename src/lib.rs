//! Application gateway: request admission in front of application process
//! pools.
//!
//! A front-end web server forwards requests together with trusted `!~`
//! headers. The gateway reads them, resolves which application group the
//! request belongs to, derives and caches that group's pool options, and
//! hands the request to a backend.

pub mod admission;
pub mod config;
pub mod crypto;
pub mod detect;
pub mod headers;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod options;

pub use admission::{AdmissionPipeline, AdmissionRequest, Dispatch, Handoff};
pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use options::{OptionsCache, PoolOptions, RequestOptions};
