//! Pool options: how to run and route to an application group.
//!
//! [`PoolOptions`] is the cacheable snapshot shared by every request for a
//! group. [`RequestOptions`] wraps the shared snapshot together with the
//! fields that only make sense for one request, so a cached snapshot can
//! never carry request-scoped state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::admission::analytics::TransactionHandle;

/// Fixed username the spawned application uses to reach the logging agent.
pub const LOGGING_AGENT_USERNAME: &str = "logging";

/// Spawn and routing configuration for one application group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolOptions {
    // Identity
    pub app_group_name: String,
    pub app_root: String,
    pub base_uri: String,
    pub app_type: String,
    pub environment: String,

    // Interpreters
    pub ruby: String,
    pub python: String,
    pub nodejs: String,

    // Spawning
    pub user: String,
    pub group: String,
    pub default_user: String,
    pub default_group: String,
    pub spawn_method: String,
    pub start_command: String,
    pub startup_file: String,
    pub restart_dir: String,
    pub environment_variables: String,

    // Pool shape
    pub min_processes: u32,
    /// Zero means no per-group limit.
    pub max_processes: u32,
    pub concurrency_model: String,
    pub thread_count: u32,
    /// Megabytes; zero disables the limit.
    pub memory_limit: u64,
    /// Requests a process serves before it is recycled; zero is unlimited.
    pub max_requests: u64,

    // Lifecycle
    pub start_timeout_msec: u64,
    pub max_preloader_idle_time: u64,
    pub max_request_queue_size: u64,
    pub stat_throttle_rate: u64,

    // Operational flags
    pub load_shell_envvars: bool,
    pub debugger: bool,
    pub raise_internal_error: bool,
    pub rolling_restart: bool,
    pub ignore_spawn_errors: bool,

    // Logging agent
    pub log_level: String,
    pub logging_agent_address: String,
    pub logging_agent_username: String,
    pub logging_agent_password: String,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            app_group_name: String::new(),
            app_root: String::new(),
            base_uri: "/".to_string(),
            app_type: String::new(),
            environment: "production".to_string(),
            ruby: "ruby".to_string(),
            python: "python".to_string(),
            nodejs: "node".to_string(),
            user: String::new(),
            group: String::new(),
            default_user: "nobody".to_string(),
            default_group: String::new(),
            spawn_method: "smart".to_string(),
            start_command: String::new(),
            startup_file: String::new(),
            restart_dir: String::new(),
            environment_variables: String::new(),
            min_processes: 1,
            max_processes: 0,
            concurrency_model: "process".to_string(),
            thread_count: 1,
            memory_limit: 0,
            max_requests: 0,
            start_timeout_msec: 90_000,
            max_preloader_idle_time: 5 * 60,
            max_request_queue_size: 100,
            stat_throttle_rate: 10,
            load_shell_envvars: false,
            debugger: false,
            raise_internal_error: false,
            rolling_restart: false,
            ignore_spawn_errors: false,
            log_level: "info".to_string(),
            logging_agent_address: String::new(),
            logging_agent_username: LOGGING_AGENT_USERNAME.to_string(),
            logging_agent_password: String::new(),
        }
    }
}

/// Options as seen by one request: the shared snapshot plus per-request
/// overrides.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    snapshot: Arc<PoolOptions>,
    /// Override from the max-requests header; never written back.
    pub max_requests: Option<u64>,
    /// Backend instance selected by the sticky-session cookie.
    pub sticky_session_id: Option<u32>,
    /// Active analytics transaction, when tracing is attached.
    pub transaction: Option<TransactionHandle>,
    /// Set once a non-null transaction is attached.
    pub analytics: bool,
    pub analytics_key: Option<String>,
}

impl RequestOptions {
    /// Wrap a shared snapshot with empty per-request state.
    pub fn new(snapshot: Arc<PoolOptions>) -> Self {
        Self {
            snapshot,
            max_requests: None,
            sticky_session_id: None,
            transaction: None,
            analytics: false,
            analytics_key: None,
        }
    }

    /// The shared snapshot this request was resolved to.
    pub fn snapshot(&self) -> &Arc<PoolOptions> {
        &self.snapshot
    }

    pub fn app_group_name(&self) -> &str {
        &self.snapshot.app_group_name
    }

    /// Effective max-requests value for this request.
    pub fn effective_max_requests(&self) -> u64 {
        self.max_requests.unwrap_or(self.snapshot.max_requests)
    }

    /// Materialize a standalone copy with the per-request overrides applied.
    pub fn to_pool_options(&self) -> PoolOptions {
        let mut options = (*self.snapshot).clone();
        options.max_requests = self.effective_max_requests();
        options
    }
}

impl std::ops::Deref for RequestOptions {
    type Target = PoolOptions;

    fn deref(&self) -> &Self::Target {
        &self.snapshot
    }
}
