//! Pool options: what a request's application group needs to be spawned
//! and routed.
//!
//! # Data Flow
//! ```text
//! secure headers
//!     → derive.rs (app root, defaults, app type, header overlay)
//!     → cache.rs (Arc snapshot per app group)
//!     → schema.rs RequestOptions (snapshot + per-request fields)
//! ```

pub mod cache;
pub mod derive;
pub mod env_vars;
pub mod parse;
pub mod schema;

pub use cache::{OptionsCache, SharedOptions};
pub use derive::{derive_pool_options, single_app_options};
pub use schema::{PoolOptions, RequestOptions};
