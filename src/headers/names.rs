//! Header names consumed during admission.
//!
//! Secure headers carry the `!~` prefix and are injected by the trusted
//! front end; they never come from the raw client socket. All names are
//! stored lowercase so table lookups need no normalization.

/// Prefix that marks a header as secure metadata.
pub const SECURE_PREFIX: &str = "!~";

// Routing and identity
pub const APP_GROUP_NAME: &str = "!~app_group_name";
pub const SCRIPT_NAME: &str = "!~script_name";
pub const APP_ROOT: &str = "!~app_root";
pub const DOCUMENT_ROOT: &str = "!~document_root";
pub const APP_TYPE: &str = "!~app_type";
pub const APP_ENV: &str = "!~app_env";

// Interpreters
pub const RUBY: &str = "!~ruby";
pub const PYTHON: &str = "!~python";
pub const NODEJS: &str = "!~nodejs";

// Spawning and pool shape
pub const USER: &str = "!~user";
pub const GROUP: &str = "!~group";
pub const MIN_PROCESSES: &str = "!~min_processes";
pub const MAX_PROCESSES: &str = "!~max_processes";
pub const SPAWN_METHOD: &str = "!~spawn_method";
pub const START_COMMAND: &str = "!~start_command";
pub const START_TIMEOUT: &str = "!~start_timeout";
pub const MAX_PRELOADER_IDLE_TIME: &str = "!~max_preloader_idle_time";
pub const MAX_REQUEST_QUEUE_SIZE: &str = "!~max_request_queue_size";
pub const RESTART_DIR: &str = "!~restart_dir";
pub const STARTUP_FILE: &str = "!~startup_file";
pub const LOAD_SHELL_ENVVARS: &str = "!~load_shell_envvars";
pub const DEBUGGER: &str = "!~debugger";
pub const ENV_VARS: &str = "!~env_vars";
pub const RAISE_INTERNAL_ERROR: &str = "!~raise_internal_error";
pub const ROLLING_RESTARTS: &str = "!~rolling_restarts";
pub const RESIST_DEPLOYMENT_ERRORS: &str = "!~resist_deployment_errors";
pub const MEMORY_LIMIT: &str = "!~memory_limit";
pub const CONCURRENCY_MODEL: &str = "!~concurrency_model";
pub const THREAD_COUNT: &str = "!~thread_count";

// Per-request
pub const MAX_REQUESTS: &str = "!~max_requests";
pub const MAX_REQUEST_TIME: &str = "!~max_request_time";
pub const FLAGS: &str = "!~flags";
pub const STICKY_SESSIONS: &str = "!~sticky_sessions";
pub const STICKY_SESSIONS_COOKIE_NAME: &str = "!~sticky_sessions_cookie_name";

// Analytics
pub const ANALYTICS_SUPPORT: &str = "!~analytics_support";
pub const ANALYTICS_KEY: &str = "!~analytics_key";
pub const ANALYTICS_FILTERS: &str = "!~analytics_filters";

// Client headers
pub const HOST: &str = "host";
pub const COOKIE: &str = "cookie";
