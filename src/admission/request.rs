//! The admission view of one request.

use std::time::Instant;

use axum::http::Method;
use bumpalo::Bump;

use crate::headers::{HeaderTable, HeaderView};
use crate::options::schema::RequestOptions;

/// Booleans extracted from the flags header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestFlags {
    /// `D`: dechunk the backend response.
    pub dechunk_response: bool,
    /// `B`: buffer the whole request body before checkout.
    pub request_body_buffering: bool,
    /// `S`: the original request arrived over HTTPS.
    pub https: bool,
    /// `C`: strip a `100-continue` expectation before forwarding.
    pub strip_100_continue_header: bool,
}

/// Where a request is in the admission state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionState {
    Begin,
    FlagsExtracted,
    ConfigurationResolved,
    TracingAttached,
    SessionAffinityResolved,
    Dispatched,
    Ended,
}

/// Per-request state read and written by the admission pipeline.
///
/// Header views borrow from the connection's receive buffer and the arena
/// belongs to the request; neither can outlive `'a`.
#[derive(Debug)]
pub struct AdmissionRequest<'a> {
    pub method: Method,
    pub path: &'a str,
    pub headers: HeaderTable<'a>,
    pub secure_headers: HeaderTable<'a>,
    pub flags: RequestFlags,
    pub options: Option<RequestOptions>,
    /// Sticky sessions requested by the front end.
    pub sticky_session: bool,
    /// Cookie carrying the sticky session id, set once affinity is resolved.
    pub sticky_cookie_name: Option<String>,
    pub host: Option<HeaderView<'a>>,
    /// Seconds; zero or `None` means no limit.
    pub max_request_time: Option<u64>,
    pub started_at: Instant,
    arena: &'a Bump,
    has_body: bool,
    state: AdmissionState,
}

impl<'a> AdmissionRequest<'a> {
    pub fn new(
        method: Method,
        path: &'a str,
        headers: HeaderTable<'a>,
        secure_headers: HeaderTable<'a>,
        arena: &'a Bump,
    ) -> Self {
        Self {
            method,
            path,
            headers,
            secure_headers,
            flags: RequestFlags::default(),
            options: None,
            sticky_session: false,
            sticky_cookie_name: None,
            host: None,
            max_request_time: None,
            started_at: Instant::now(),
            arena,
            has_body: false,
            state: AdmissionState::Begin,
        }
    }

    /// Mark whether the request carries a body.
    pub fn with_body(mut self, has_body: bool) -> Self {
        self.has_body = has_body;
        self
    }

    /// Request-scoped allocation arena.
    pub fn arena(&self) -> &'a Bump {
        self.arena
    }

    pub fn has_body(&self) -> bool {
        self.has_body
    }

    pub fn state(&self) -> AdmissionState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: AdmissionState) {
        if self.state != AdmissionState::Ended {
            self.state = state;
        }
    }

    /// True once the request was ended, by the pipeline or by the
    /// connection layer.
    pub fn is_ended(&self) -> bool {
        self.state == AdmissionState::Ended
    }

    /// End the request. No admission stage runs afterwards.
    pub fn end(&mut self) {
        self.state = AdmissionState::Ended;
    }

    /// Resolved sticky session id, if any.
    pub fn sticky_session_id(&self) -> Option<u32> {
        self.options.as_ref().and_then(|o| o.sticky_session_id)
    }

    /// Resolved application group name, if options were resolved.
    pub fn app_group_name(&self) -> Option<&str> {
        self.options.as_ref().map(|o| o.app_group_name())
    }
}
