//! HTTP front end.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (header tables, admission under a mutex)
//!     → upstream.rs (app group + sticky id → backend address)
//!     → hyper-util client → backend
//! ```

pub mod server;
pub mod upstream;

pub use server::{GatewayServer, ServerError, X_REQUEST_ID};
pub use upstream::{Selection, UpstreamMap};
