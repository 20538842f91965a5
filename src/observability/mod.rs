//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Admission pipeline, options cache, HTTP server
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
