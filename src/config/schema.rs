//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::options::schema::PoolOptions;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, secure header trust).
    pub listener: ListenerConfig,

    /// Process-wide baseline applied to every new pool options snapshot.
    pub defaults: AgentDefaults,

    /// Analytics (request tracing) settings.
    pub analytics: AnalyticsConfig,

    /// Sticky session settings.
    pub sticky_sessions: StickySessionConfig,

    /// Present when the gateway serves exactly one application.
    pub single_app: Option<SingleAppConfig>,

    /// Backend addresses per application group.
    pub upstreams: Vec<UpstreamConfig>,

    /// Request body buffering limits.
    pub body: BodyConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl GatewayConfig {
    /// True when single-app mode is configured.
    pub fn single_app_mode(&self) -> bool {
        self.single_app.is_some()
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:3000").
    pub bind_address: String,

    /// Accept secure headers from this listener. Off unless set; enable only
    /// when the listener is reachable solely by the trusted front end.
    pub trust_secure_headers: bool,

    /// Prefix identifying secure headers.
    pub secure_header_prefix: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            trust_secure_headers: false,
            secure_header_prefix: crate::headers::names::SECURE_PREFIX.to_string(),
        }
    }
}

/// Process-wide defaults for spawned applications.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentDefaults {
    /// Default Ruby interpreter.
    pub ruby: String,

    /// Default Python interpreter.
    pub python: String,

    /// Default Node.js interpreter.
    pub nodejs: String,

    /// OS user for applications when none is configured.
    pub default_user: String,

    /// OS group for applications when none is configured.
    pub default_group: String,

    /// Minimum processes per group.
    pub min_instances: u32,

    /// Spawn method ("smart" or "direct").
    pub spawn_method: String,

    /// Seconds between filesystem checks for restart triggers.
    pub stat_throttle_rate: u64,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            ruby: "ruby".to_string(),
            python: "python".to_string(),
            nodejs: "node".to_string(),
            default_user: "nobody".to_string(),
            default_group: String::new(),
            min_instances: 1,
            spawn_method: "smart".to_string(),
            stat_throttle_rate: 10,
        }
    }
}

/// Analytics configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Enable analytics transactions globally.
    pub enabled: bool,

    /// Address of the logging agent applications report to.
    pub logging_agent_address: String,

    /// Password for the logging agent.
    pub logging_agent_password: String,
}

/// Sticky session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StickySessionConfig {
    /// Cookie consulted when the request names none.
    pub default_cookie_name: String,
}

impl Default for StickySessionConfig {
    fn default() -> Self {
        Self {
            default_cookie_name: "_app_route".to_string(),
        }
    }
}

/// The one application served in single-app mode.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SingleAppConfig {
    /// Application root directory.
    pub app_root: String,

    /// Group name; defaults to the app root.
    pub app_group_name: Option<String>,

    /// Application type; detected from the app root when absent.
    pub app_type: Option<String>,

    /// Environment name ("production", "staging", ...).
    pub environment: Option<String>,

    /// Base URI the application is mounted on.
    pub base_uri: Option<String>,
}

/// Backend address for an application group.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Application group served by this backend.
    pub app_group: String,

    /// Backend address (e.g., "127.0.0.1:3001").
    pub address: String,
}

/// Request body buffering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Maximum body size buffered before checkout, in bytes.
    pub max_buffered_bytes: usize,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            max_buffered_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Baseline pool options built from the process-wide defaults.
    pub fn baseline_options(&self) -> PoolOptions {
        let mut options = PoolOptions::default();
        self.apply_defaults(&mut options);
        options
    }

    /// Apply the process-wide defaults onto `options`.
    pub fn apply_defaults(&self, options: &mut PoolOptions) {
        let defaults = &self.defaults;
        options.ruby = defaults.ruby.clone();
        options.python = defaults.python.clone();
        options.nodejs = defaults.nodejs.clone();
        options.log_level = self.observability.log_level.clone();
        options.logging_agent_address = self.analytics.logging_agent_address.clone();
        options.logging_agent_username = crate::options::schema::LOGGING_AGENT_USERNAME.to_string();
        options.logging_agent_password = self.analytics.logging_agent_password.clone();
        if !defaults.default_user.is_empty() {
            options.default_user = defaults.default_user.clone();
        }
        if !defaults.default_group.is_empty() {
            options.default_group = defaults.default_group.clone();
        }
        options.min_processes = defaults.min_instances;
        options.spawn_method = defaults.spawn_method.clone();
        options.stat_throttle_rate = defaults.stat_throttle_rate;
    }
}
