//! Header access subsystem.
//!
//! # Data Flow
//! ```text
//! Receive buffer (owned by the connection)
//!     → table.rs (name → view, split client / secure)
//!     → view.rs (borrowed segments, arena materialization)
//!     → Admission pipeline reads values
//! ```
//!
//! # Design Decisions
//! - Views borrow from the connection buffer; they cannot outlive the request
//! - Empty and absent are distinct results
//! - Secure headers live in their own table and are never mixed with
//!   client headers

pub mod names;
pub mod table;
pub mod view;

pub use table::{HeaderCell, HeaderTable};
pub use view::HeaderView;
