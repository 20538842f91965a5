//! Pool options derivation.
//!
//! Turns the secure headers of the first request for an application group
//! into a [`PoolOptions`] snapshot:
//!
//! 1. app root, from the app-root header or the document root's parent
//! 2. process-wide defaults
//! 3. app type, from the header or the detector
//! 4. every recognized configuration header
//!
//! Nothing here touches the cache. A failed derivation leaves no trace.

use std::io;
use std::path::{Path, PathBuf};

use bumpalo::Bump;

use crate::admission::error::AdmissionError;
use crate::config::GatewayConfig;
use crate::detect::AppTypeDetector;
use crate::headers::{names, HeaderTable};
use crate::options::env_vars::decode_env_vars;
use crate::options::parse::{fill_option, fill_option_sec_to_msec};
use crate::options::schema::PoolOptions;

/// Derive the options for `app_group_name` from the request's secure headers.
pub fn derive_pool_options<'a>(
    secure: &HeaderTable<'a>,
    arena: &'a Bump,
    app_group_name: &str,
    config: &GatewayConfig,
    detector: &dyn AppTypeDetector,
) -> Result<PoolOptions, AdmissionError> {
    tracing::debug!(app_group = %app_group_name, "Creating new pool options");

    let mut options = PoolOptions::default();
    let app_root = secure
        .lookup_non_empty(names::APP_ROOT)
        .map(|v| v.to_str_lossy(arena).into_owned());

    match secure.lookup_non_empty(names::SCRIPT_NAME) {
        None => {
            options.app_root = match app_root {
                Some(root) => root,
                None => {
                    let doc_root = secure
                        .lookup_non_empty(names::DOCUMENT_ROOT)
                        .ok_or(AdmissionError::MissingAppRoot)?;
                    parent_dir(&doc_root.to_str_lossy(arena))
                }
            };
        }
        Some(script_name) => {
            options.app_root = match app_root {
                Some(root) => root,
                None => {
                    let doc_root = secure
                        .lookup_non_empty(names::DOCUMENT_ROOT)
                        .ok_or(AdmissionError::MissingDocumentRoot)?;
                    let resolved = resolve_symlink(&doc_root.to_str_lossy(arena))?;
                    parent_dir(&resolved)
                }
            };
            options.base_uri = script_name.to_str_lossy(arena).into_owned();
        }
    }

    config.apply_defaults(&mut options);

    options.app_type = match secure.lookup_non_empty(names::APP_TYPE) {
        Some(v) => v.to_str_lossy(arena).into_owned(),
        None => detect_app_type(detector, &options.app_root),
    };
    options.app_group_name = app_group_name.to_string();

    overlay_headers(&mut options, secure, arena);

    tracing::debug!(
        app_group = %options.app_group_name,
        app_root = %options.app_root,
        app_type = %options.app_type,
        "Pool options derived"
    );
    Ok(options)
}

/// Options for the application served in single-app mode.
///
/// Returns `None` when the configuration has no `[single_app]` section.
pub fn single_app_options(
    config: &GatewayConfig,
    detector: &dyn AppTypeDetector,
) -> Option<PoolOptions> {
    let single = config.single_app.as_ref()?;
    let mut options = config.baseline_options();
    options.app_root = single.app_root.clone();
    options.app_group_name = single
        .app_group_name
        .clone()
        .unwrap_or_else(|| single.app_root.clone());
    options.app_type = match &single.app_type {
        Some(app_type) => app_type.clone(),
        None => detect_app_type(detector, &single.app_root),
    };
    if let Some(env) = &single.environment {
        options.environment = env.clone();
    }
    if let Some(base_uri) = &single.base_uri {
        options.base_uri = base_uri.clone();
    }
    Some(options)
}

fn detect_app_type(detector: &dyn AppTypeDetector, app_root: &str) -> String {
    match detector.detect(Path::new(app_root)) {
        Some(app_type) => app_type.name().to_string(),
        None => {
            tracing::debug!(app_root = %app_root, "Application type not detected");
            String::new()
        }
    }
}

fn overlay_headers<'a>(options: &mut PoolOptions, secure: &HeaderTable<'a>, arena: &'a Bump) {
    fill_option(&mut options.environment, secure, names::APP_ENV, arena);
    fill_option(&mut options.ruby, secure, names::RUBY, arena);
    fill_option(&mut options.python, secure, names::PYTHON, arena);
    fill_option(&mut options.nodejs, secure, names::NODEJS, arena);
    fill_option(&mut options.user, secure, names::USER, arena);
    fill_option(&mut options.group, secure, names::GROUP, arena);
    fill_option(&mut options.min_processes, secure, names::MIN_PROCESSES, arena);
    fill_option(&mut options.max_processes, secure, names::MAX_PROCESSES, arena);
    fill_option(&mut options.spawn_method, secure, names::SPAWN_METHOD, arena);
    fill_option(&mut options.start_command, secure, names::START_COMMAND, arena);
    fill_option_sec_to_msec(&mut options.start_timeout_msec, secure, names::START_TIMEOUT, arena);
    fill_option(
        &mut options.max_preloader_idle_time,
        secure,
        names::MAX_PRELOADER_IDLE_TIME,
        arena,
    );
    fill_option(
        &mut options.max_request_queue_size,
        secure,
        names::MAX_REQUEST_QUEUE_SIZE,
        arena,
    );
    fill_option(&mut options.restart_dir, secure, names::RESTART_DIR, arena);
    fill_option(&mut options.startup_file, secure, names::STARTUP_FILE, arena);
    fill_option(&mut options.load_shell_envvars, secure, names::LOAD_SHELL_ENVVARS, arena);
    fill_option(&mut options.debugger, secure, names::DEBUGGER, arena);
    fill_option(&mut options.environment_variables, secure, names::ENV_VARS, arena);
    fill_option(&mut options.raise_internal_error, secure, names::RAISE_INTERNAL_ERROR, arena);
    fill_option(&mut options.rolling_restart, secure, names::ROLLING_RESTARTS, arena);
    fill_option(
        &mut options.ignore_spawn_errors,
        secure,
        names::RESIST_DEPLOYMENT_ERRORS,
        arena,
    );
    fill_option(&mut options.memory_limit, secure, names::MEMORY_LIMIT, arena);
    fill_option(&mut options.concurrency_model, secure, names::CONCURRENCY_MODEL, arena);
    fill_option(&mut options.thread_count, secure, names::THREAD_COUNT, arena);

    if !options.environment_variables.is_empty() {
        if let Err(e) = decode_env_vars(&options.environment_variables) {
            tracing::warn!(
                app_group = %options.app_group_name,
                error = %e,
                "Environment variables blob is malformed; passing it through unchanged"
            );
        }
    }
}

/// Directory part of `path`, like `dirname(1)`.
pub fn parent_dir(path: &str) -> String {
    match Path::new(path).parent() {
        Some(parent) if parent.as_os_str().is_empty() => ".".to_string(),
        Some(parent) => parent.to_string_lossy().into_owned(),
        None if path.starts_with('/') => "/".to_string(),
        None => ".".to_string(),
    }
}

/// Follow one level of symlink at `path`.
///
/// A path that is not a symlink, or that does not exist on this host, is
/// returned unchanged. Any other failure aborts the request.
fn resolve_symlink(path: &str) -> Result<String, AdmissionError> {
    match std::fs::read_link(path) {
        Ok(target) => {
            let resolved: PathBuf = if target.is_absolute() {
                target
            } else {
                Path::new(path)
                    .parent()
                    .unwrap_or_else(|| Path::new("/"))
                    .join(target)
            };
            Ok(resolved.to_string_lossy().into_owned())
        }
        Err(e) if matches!(e.kind(), io::ErrorKind::InvalidInput | io::ErrorKind::NotFound) => {
            Ok(path.to_string())
        }
        Err(source) => Err(AdmissionError::ResolveDocumentRoot {
            path: path.to_string(),
            source,
        }),
    }
}
