//! Analytics transactions.
//!
//! # Responsibilities
//! - Define the contract with the analytics backend (open a transaction)
//! - Provide a null transaction for when the backend declines
//! - Provide a backend that records transactions as structured log events
//!
//! # Design Decisions
//! - A null transaction is a normal result, not an error
//! - Transactions are shared handles so per-request options stay cloneable

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use uuid::Uuid;

/// Category used for request transactions.
pub const REQUESTS_CATEGORY: &str = "requests";

/// An open analytics transaction.
pub trait Transaction: fmt::Debug + Send + Sync {
    /// True when the backend declined to record this transaction.
    fn is_null(&self) -> bool;

    /// Append a log line to the transaction.
    fn message(&self, line: &str);

    /// Open a named timing scope.
    fn begin_scope(&self, name: &str);
}

/// Shared transaction handle.
pub type TransactionHandle = Arc<dyn Transaction>;

/// The analytics backend.
pub trait AnalyticsCore: Send + Sync {
    fn new_transaction(
        &self,
        app_group_name: &str,
        category: &str,
        key: &str,
        filters: &str,
    ) -> TransactionHandle;
}

/// A transaction that records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransaction;

impl Transaction for NullTransaction {
    fn is_null(&self) -> bool {
        true
    }

    fn message(&self, _line: &str) {}

    fn begin_scope(&self, _name: &str) {}
}

/// Transaction emitted as `tracing` events under the `analytics` target.
#[derive(Debug)]
pub struct LogTransaction {
    id: Uuid,
    app_group_name: String,
    category: String,
}

impl Transaction for LogTransaction {
    fn is_null(&self) -> bool {
        false
    }

    fn message(&self, line: &str) {
        tracing::info!(
            target: "analytics",
            txn_id = %self.id,
            app_group = %self.app_group_name,
            category = %self.category,
            "{}",
            line
        );
    }

    fn begin_scope(&self, name: &str) {
        tracing::debug!(target: "analytics", txn_id = %self.id, scope = %name, "Scope begin");
    }
}

/// Analytics backend that logs transactions locally.
///
/// Transactions whose filter expression is `"none"` are declined.
#[derive(Debug, Default)]
pub struct LogAnalyticsCore {
    opened: AtomicUsize,
}

impl LogAnalyticsCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-null transactions opened so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }
}

impl AnalyticsCore for LogAnalyticsCore {
    fn new_transaction(
        &self,
        app_group_name: &str,
        category: &str,
        key: &str,
        filters: &str,
    ) -> TransactionHandle {
        if filters.trim() == "none" {
            return Arc::new(NullTransaction);
        }
        self.opened.fetch_add(1, Ordering::Relaxed);
        let txn = LogTransaction {
            id: Uuid::new_v4(),
            app_group_name: app_group_name.to_string(),
            category: category.to_string(),
        };
        tracing::debug!(
            target: "analytics",
            txn_id = %txn.id,
            app_group = %app_group_name,
            key_len = key.len(),
            "Transaction opened"
        );
        Arc::new(txn)
    }
}
