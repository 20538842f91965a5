//! HTTP front end acting as the connection layer for admission.
//!
//! # Responsibilities
//! - Split incoming headers into client and secure tables
//! - Run the admission pipeline before touching the body
//! - Perform the hand-off: forward, buffer then forward, or reject
//! - Select a backend for the resolved app group
//!
//! # Design Decisions
//! - Admission runs synchronously under a mutex; the request arena never
//!   lives across an `.await`
//! - Secure headers are stripped before forwarding
//! - Rejections close the connection

use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::{
        header::{self, HeaderName, HeaderValue},
        request::Parts,
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use bumpalo::Bump;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::admission::{
    AdmissionError, AdmissionPipeline, AdmissionRequest, Handoff, RequestFlags,
};
use crate::config::GatewayConfig;
use crate::headers::HeaderTable;
use crate::http::upstream::{Selection, UpstreamError, UpstreamMap};
use crate::observability::metrics;
use crate::options::RequestOptions;

pub const X_REQUEST_ID: &str = "x-request-id";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Mutex<AdmissionPipeline>>,
    upstreams: Arc<UpstreamMap>,
    client: Client<HttpConnector, Body>,
    config: Arc<GatewayConfig>,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    pipeline: Arc<Mutex<AdmissionPipeline>>,
}

impl GatewayServer {
    pub fn new(config: Arc<GatewayConfig>, pipeline: AdmissionPipeline) -> Result<Self, ServerError> {
        let upstreams = Arc::new(UpstreamMap::from_config(&config.upstreams)?);
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let pipeline = Arc::new(Mutex::new(pipeline));

        let state = AppState {
            pipeline: Arc::clone(&pipeline),
            upstreams,
            client,
            config: Arc::clone(&config),
        };
        let router = Self::build_router(&config, state);
        Ok(Self { router, pipeline })
    }

    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Result of admission, detached from the request arena.
enum Admitted {
    Forward(Ticket),
    Reject { status: StatusCode, message: String },
    Aborted,
}

struct Ticket {
    options: RequestOptions,
    flags: RequestFlags,
    buffer_body: bool,
    max_request_time: Option<u64>,
    sticky_cookie_name: Option<String>,
}

/// Records which hand-off the pipeline chose.
#[derive(Default)]
struct ServerHandoff {
    outcome: Option<Admitted>,
}

impl ServerHandoff {
    fn ticket(req: &AdmissionRequest<'_>, buffer_body: bool) -> Admitted {
        match req.options.clone() {
            Some(options) => Admitted::Forward(Ticket {
                options,
                flags: req.flags,
                buffer_body,
                max_request_time: req.max_request_time,
                sticky_cookie_name: req.sticky_cookie_name.clone(),
            }),
            None => Admitted::Reject {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "request admitted without pool options".to_string(),
            },
        }
    }
}

impl Handoff for ServerHandoff {
    fn checkout_session(&mut self, req: &AdmissionRequest<'_>) {
        self.outcome = Some(Self::ticket(req, false));
    }

    fn begin_buffering_body(&mut self, req: &AdmissionRequest<'_>) {
        self.outcome = Some(Self::ticket(req, true));
    }

    fn terminate_with_error(&mut self, _req: &AdmissionRequest<'_>, error: &AdmissionError) {
        self.outcome = Some(Admitted::Reject {
            status: error.status_code(),
            message: error.to_string(),
        });
    }
}

async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let started = Instant::now();
    let (parts, body) = request.into_parts();
    let request_id = parts
        .headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let method = parts.method.to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        path = %parts.uri.path(),
        "Admitting request"
    );

    let response = match admit(&state, &parts, request_has_body(&parts, &body)) {
        Admitted::Forward(ticket) => forward(&state, parts, body, ticket, &request_id).await,
        Admitted::Reject { status, message } => error_response(status, &message, true),
        Admitted::Aborted => error_response(StatusCode::BAD_REQUEST, "Request aborted", true),
    };

    metrics::record_request(&method, response.status().as_u16(), started.elapsed());
    response
}

/// Run admission for the request head.
fn admit(state: &AppState, parts: &Parts, has_body: bool) -> Admitted {
    let arena = Bump::new();
    let listener = &state.config.listener;
    let (client, secure) = HeaderTable::split_from_map(
        &parts.headers,
        &listener.secure_header_prefix,
        listener.trust_secure_headers,
    );
    let mut req = AdmissionRequest::new(parts.method.clone(), parts.uri.path(), client, secure, &arena)
        .with_body(has_body);

    let mut handoff = ServerHandoff::default();
    state
        .pipeline
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .on_request_begin(&mut req, &mut handoff);

    handoff.outcome.unwrap_or(Admitted::Aborted)
}

async fn forward(
    state: &AppState,
    mut parts: Parts,
    body: Body,
    ticket: Ticket,
    request_id: &str,
) -> Response {
    let app_group = ticket.options.app_group_name().to_string();
    let Some(selection) = state.upstreams.select(&app_group, ticket.options.sticky_session_id) else {
        tracing::warn!(request_id = %request_id, app_group = %app_group, "No backend for app group");
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "No backend available for this application",
            false,
        );
    };

    let body = if ticket.buffer_body {
        match axum::body::to_bytes(body, state.config.body.max_buffered_bytes).await {
            Ok(bytes) => {
                parts.headers.remove(header::TRANSFER_ENCODING);
                parts.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
                Body::from(bytes)
            }
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Request body buffering failed");
                return error_response(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "Request body could not be buffered",
                    true,
                );
            }
        }
    } else {
        body
    };

    prepare_headers(&mut parts, &state.config.listener.secure_header_prefix, ticket.flags, request_id);

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Authority::from_str(&selection.addr.to_string()).ok();
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Cannot build upstream URI");
            return error_response(StatusCode::BAD_GATEWAY, "Upstream request failed", false);
        }
    };

    tracing::debug!(
        request_id = %request_id,
        app_group = %app_group,
        backend = %selection.addr,
        "Forwarding request"
    );

    let send = state.client.request(Request::from_parts(parts, body));
    let result = match ticket.max_request_time.filter(|&secs| secs > 0) {
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), send).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(request_id = %request_id, max_request_time = secs, "Request exceeded max request time");
                return error_response(StatusCode::GATEWAY_TIMEOUT, "Request took too long", true);
            }
        },
        None => send.await,
    };

    match result {
        Ok(response) => {
            let (mut parts, body) = response.into_parts();
            if ticket.flags.dechunk_response {
                parts.headers.remove(header::TRANSFER_ENCODING);
            }
            if let Some(cookie) = sticky_cookie(&ticket, selection) {
                parts.headers.append(header::SET_COOKIE, cookie);
            }
            if let Some(txn) = &ticket.options.transaction {
                txn.message(&format!("Status: {}", parts.status));
            }
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, backend = %selection.addr, error = %e, "Upstream error");
            error_response(StatusCode::BAD_GATEWAY, "Upstream request failed", false)
        }
    }
}

/// Rewrite request headers for the backend.
fn prepare_headers(parts: &mut Parts, secure_prefix: &str, flags: RequestFlags, request_id: &str) {
    let secure: Vec<HeaderName> = parts
        .headers
        .keys()
        .filter(|name| name.as_str().starts_with(secure_prefix))
        .cloned()
        .collect();
    for name in secure {
        parts.headers.remove(&name);
    }

    if flags.strip_100_continue_header {
        parts.headers.remove(header::EXPECT);
    }
    if flags.https {
        parts
            .headers
            .insert("x-forwarded-proto", HeaderValue::from_static("https"));
    }
    if let Ok(value) = HeaderValue::from_str(request_id) {
        parts.headers.insert(X_REQUEST_ID, value);
    }
}

/// `Set-Cookie` value when the client does not already carry the selected
/// backend's sticky id.
fn sticky_cookie(ticket: &Ticket, selection: Selection) -> Option<HeaderValue> {
    let name = ticket.sticky_cookie_name.as_deref()?;
    if ticket.options.sticky_session_id == Some(selection.index) {
        return None;
    }
    HeaderValue::from_str(&format!("{name}={}; Path=/", selection.index)).ok()
}

/// Framing headers decide when present. Without them (HTTP/2 DATA frames,
/// for one) the body stream itself is asked.
fn request_has_body(parts: &Parts, body: &Body) -> bool {
    if let Some(len) = parts.headers.get(header::CONTENT_LENGTH) {
        return len
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .is_some_and(|len| len > 0);
    }
    if parts.headers.contains_key(header::TRANSFER_ENCODING) {
        return true;
    }
    !body.is_end_stream()
}

fn error_response(status: StatusCode, message: &str, close: bool) -> Response {
    let mut response = (status, format!("{message}\n")).into_response();
    if close {
        response
            .headers_mut()
            .insert(header::CONNECTION, HeaderValue::from_static("close"));
    }
    response
}
