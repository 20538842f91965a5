//! Request admission subsystem.
//!
//! # Data Flow
//! ```text
//! Parsed request headers (client + secure tables)
//!     → pipeline.rs (flags → options → analytics → sticky session)
//!     → handoff.rs (checkout, buffer body, or terminate)
//! ```
//!
//! # Design Decisions
//! - Admission is synchronous; the connection layer does all I/O
//! - A rejected request never mutates the options cache

pub mod analytics;
pub mod error;
pub mod flags;
pub mod handoff;
pub mod pipeline;
pub mod request;
pub mod sticky;

pub use analytics::{AnalyticsCore, LogAnalyticsCore, NullTransaction, Transaction, TransactionHandle};
pub use error::AdmissionError;
pub use handoff::Handoff;
pub use pipeline::{AdmissionPipeline, Dispatch, Stage, STAGES};
pub use request::{AdmissionRequest, AdmissionState, RequestFlags};
