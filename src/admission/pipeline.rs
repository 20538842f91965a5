//! Request admission pipeline.
//!
//! # Responsibilities
//! - Run the admission stages in a fixed order
//! - Resolve pool options through the cache, deriving them on a miss
//! - Hand the request to checkout, body buffering, or termination
//!
//! # State machine
//! ```text
//! Begin → FlagsExtracted → ConfigurationResolved → TracingAttached
//!       → SessionAffinityResolved → Dispatched
//! ```
//! `Ended` can be entered from any state and is never left. Every stage
//! checks for it before running.
//!
//! # Design Decisions
//! - Stages are an explicit list of named steps, each returning
//!   `Result<(), AdmissionError>`; the first error ends the request
//! - The terminate hand-off is called exactly once per failed request
//! - The pipeline owns its cache; callers sharing a pipeline across tasks
//!   must lock it

use std::sync::Arc;

use crate::admission::analytics::{AnalyticsCore, REQUESTS_CATEGORY};
use crate::admission::error::AdmissionError;
use crate::admission::flags;
use crate::admission::handoff::Handoff;
use crate::admission::request::{AdmissionRequest, AdmissionState};
use crate::admission::sticky;
use crate::config::GatewayConfig;
use crate::detect::AppTypeDetector;
use crate::headers::{names, HeaderView};
use crate::observability::metrics;
use crate::options::parse::header_value;
use crate::options::{derive_pool_options, single_app_options, OptionsCache, RequestOptions};

/// One named admission step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ExtractFlags,
    ResolveOptions,
    AttachAnalytics,
    ResolveStickySession,
}

/// Stages in execution order.
pub const STAGES: &[Stage] = &[
    Stage::ExtractFlags,
    Stage::ResolveOptions,
    Stage::AttachAnalytics,
    Stage::ResolveStickySession,
];

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::ExtractFlags => "extract_flags",
            Stage::ResolveOptions => "resolve_options",
            Stage::AttachAnalytics => "attach_analytics",
            Stage::ResolveStickySession => "resolve_sticky_session",
        }
    }

    /// State reached once this stage succeeds.
    fn completed_state(&self) -> AdmissionState {
        match self {
            Stage::ExtractFlags => AdmissionState::FlagsExtracted,
            Stage::ResolveOptions => AdmissionState::ConfigurationResolved,
            Stage::AttachAnalytics => AdmissionState::TracingAttached,
            Stage::ResolveStickySession => AdmissionState::SessionAffinityResolved,
        }
    }
}

/// What the pipeline did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Handed to `checkout_session`.
    Checkout,
    /// Handed to `begin_buffering_body`.
    BufferBody,
    /// Ended with an error through `terminate_with_error`.
    Terminated,
    /// The request was already ended; nothing was handed off.
    Aborted,
}

/// Header values read once before any stage runs.
#[derive(Debug, Default)]
struct RequestAnalysis<'a> {
    flags: Option<HeaderView<'a>>,
    app_group_name: Option<HeaderView<'a>>,
    analytics_support: bool,
}

/// Admits requests and resolves their pool options.
pub struct AdmissionPipeline {
    config: Arc<GatewayConfig>,
    cache: OptionsCache,
    detector: Arc<dyn AppTypeDetector>,
    analytics: Option<Arc<dyn AnalyticsCore>>,
}

impl AdmissionPipeline {
    /// Create a pipeline. In single-app mode the one application's options
    /// are derived here and become the only cache entry.
    pub fn new(config: Arc<GatewayConfig>, detector: Arc<dyn AppTypeDetector>) -> Self {
        let cache = match single_app_options(&config, detector.as_ref()) {
            Some(options) => {
                tracing::info!(
                    app_group = %options.app_group_name,
                    app_root = %options.app_root,
                    app_type = %options.app_type,
                    "Single-app mode"
                );
                OptionsCache::single_app(options)
            }
            None => OptionsCache::new(),
        };

        Self {
            config,
            cache,
            detector,
            analytics: None,
        }
    }

    /// Attach an analytics backend.
    pub fn with_analytics(mut self, core: Arc<dyn AnalyticsCore>) -> Self {
        self.analytics = Some(core);
        self
    }

    /// Upgraded connections (e.g. WebSocket) may be admitted.
    pub fn supports_upgrade(&self) -> bool {
        true
    }

    pub fn stages(&self) -> &'static [Stage] {
        STAGES
    }

    pub fn cache(&self) -> &OptionsCache {
        &self.cache
    }

    fn analytics_enabled(&self) -> bool {
        self.config.analytics.enabled && self.analytics.is_some()
    }

    /// Run admission for a request whose headers are fully parsed.
    pub fn on_request_begin<'a, H>(
        &mut self,
        req: &mut AdmissionRequest<'a>,
        handoff: &mut H,
    ) -> Dispatch
    where
        H: Handoff + ?Sized,
    {
        if req.is_ended() {
            metrics::record_admission("aborted");
            return Dispatch::Aborted;
        }

        let analysis = self.analyze(req);

        for &stage in STAGES {
            if req.is_ended() {
                tracing::trace!(stage = stage.name(), "Request ended; skipping remaining stages");
                metrics::record_admission("aborted");
                return Dispatch::Aborted;
            }

            if let Err(err) = self.run_stage(stage, req, &analysis) {
                req.end();
                tracing::warn!(
                    method = %req.method,
                    path = %req.path,
                    stage = stage.name(),
                    error = %err,
                    "Request rejected"
                );
                metrics::record_admission(err.kind());
                handoff.terminate_with_error(req, &err);
                return Dispatch::Terminated;
            }
            req.set_state(stage.completed_state());
        }

        if !req.has_body() || !req.flags.request_body_buffering {
            req.flags.request_body_buffering = false;
            req.set_state(AdmissionState::Dispatched);
            metrics::record_admission("checkout");
            handoff.checkout_session(req);
            Dispatch::Checkout
        } else {
            req.set_state(AdmissionState::Dispatched);
            metrics::record_admission("buffer_body");
            handoff.begin_buffering_body(req);
            Dispatch::BufferBody
        }
    }

    fn analyze<'a>(&self, req: &mut AdmissionRequest<'a>) -> RequestAnalysis<'a> {
        let arena = req.arena();
        let secure = &req.secure_headers;

        let analysis = RequestAnalysis {
            flags: secure.lookup(names::FLAGS).cloned(),
            app_group_name: if self.config.single_app_mode() {
                None
            } else {
                secure
                    .lookup_cell(names::APP_GROUP_NAME)
                    .map(|cell| cell.value().clone())
            },
            analytics_support: self.analytics_enabled()
                && header_value::<bool>(secure, names::ANALYTICS_SUPPORT, arena).unwrap_or(false),
        };
        let sticky_session =
            header_value::<bool>(secure, names::STICKY_SESSIONS, arena).unwrap_or(false);
        let max_request_time = header_value::<u64>(secure, names::MAX_REQUEST_TIME, arena);
        let host = req.headers.lookup(names::HOST).cloned();

        req.sticky_session = sticky_session;
        req.max_request_time = max_request_time;
        req.host = host;
        analysis
    }

    fn run_stage<'a>(
        &mut self,
        stage: Stage,
        req: &mut AdmissionRequest<'a>,
        analysis: &RequestAnalysis<'a>,
    ) -> Result<(), AdmissionError> {
        match stage {
            Stage::ExtractFlags => {
                if let Some(view) = &analysis.flags {
                    flags::apply_flags(view, &mut req.flags);
                }
                Ok(())
            }
            Stage::ResolveOptions => self.resolve_options(req, analysis),
            Stage::AttachAnalytics => self.attach_analytics(req, analysis),
            Stage::ResolveStickySession => {
                self.resolve_sticky_session(req);
                Ok(())
            }
        }
    }

    fn resolve_options<'a>(
        &mut self,
        req: &mut AdmissionRequest<'a>,
        analysis: &RequestAnalysis<'a>,
    ) -> Result<(), AdmissionError> {
        let arena = req.arena();

        let snapshot = if self.config.single_app_mode() {
            self.cache
                .lookup_sole()
                .ok_or(AdmissionError::SingleAppMissing)?
        } else {
            let view = analysis
                .app_group_name
                .as_ref()
                .filter(|v| !v.is_empty())
                .ok_or(AdmissionError::MissingAppGroupName)?;
            let key = view.make_contiguous(arena);

            match self.cache.lookup(key) {
                Some(snapshot) => snapshot,
                None => {
                    let name = String::from_utf8_lossy(key);
                    let derived = derive_pool_options(
                        &req.secure_headers,
                        arena,
                        &name,
                        &self.config,
                        self.detector.as_ref(),
                    )?;
                    let snapshot = Arc::new(derived);
                    self.cache.insert(key.into(), Arc::clone(&snapshot));
                    snapshot
                }
            }
        };

        let mut options = RequestOptions::new(snapshot);
        options.max_requests = header_value::<u64>(&req.secure_headers, names::MAX_REQUESTS, arena);
        req.options = Some(options);
        Ok(())
    }

    fn attach_analytics<'a>(
        &self,
        req: &mut AdmissionRequest<'a>,
        analysis: &RequestAnalysis<'a>,
    ) -> Result<(), AdmissionError> {
        if !analysis.analytics_support {
            return Ok(());
        }
        let Some(core) = self.analytics.as_ref() else {
            return Ok(());
        };

        let arena = req.arena();
        let key = header_value::<String>(&req.secure_headers, names::ANALYTICS_KEY, arena)
            .ok_or(AdmissionError::MissingAnalyticsKey)?;
        let filters = match req.secure_headers.lookup(names::ANALYTICS_FILTERS) {
            Some(view) => std::str::from_utf8(view.make_contiguous(arena))
                .map_err(|_| AdmissionError::InvalidAnalyticsFilters)?,
            None => "",
        };
        let Some(options) = req.options.as_mut() else {
            return Ok(());
        };

        let txn = core.new_transaction(options.app_group_name(), REQUESTS_CATEGORY, &key, filters);
        if txn.is_null() {
            tracing::debug!(app_group = %options.app_group_name(), "Analytics transaction declined");
            return Ok(());
        }

        txn.begin_scope("request processing");
        txn.message(&format!("Request method: {}", req.method));
        txn.message(&format!("URI: {}", req.path));
        tracing::info!(
            method = %req.method,
            path = %req.path,
            app_group = %options.app_group_name(),
            "Request started"
        );

        options.analytics = true;
        options.analytics_key = Some(key);
        options.transaction = Some(txn);
        Ok(())
    }

    fn resolve_sticky_session(&self, req: &mut AdmissionRequest<'_>) {
        if !req.sticky_session {
            return;
        }
        let arena = req.arena();
        let cookie_name: &[u8] = match req
            .secure_headers
            .lookup_non_empty(names::STICKY_SESSIONS_COOKIE_NAME)
        {
            Some(view) => view.make_contiguous(arena),
            None => self.config.sticky_sessions.default_cookie_name.as_bytes(),
        };
        let cookie = req
            .headers
            .lookup(names::COOKIE)
            .map(|view| view.make_contiguous(arena));

        let id = sticky::resolve_sticky_session_id(cookie, cookie_name);
        tracing::trace!(sticky_session_id = ?id, "Sticky session resolved");
        req.sticky_cookie_name = Some(String::from_utf8_lossy(cookie_name).into_owned());
        if let Some(options) = req.options.as_mut() {
            options.sticky_session_id = id;
        }
    }
}

impl std::fmt::Debug for AdmissionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionPipeline")
            .field("single_app_mode", &self.config.single_app_mode())
            .field("cached_groups", &self.cache.len())
            .field("analytics", &self.analytics.is_some())
            .finish()
    }
}
