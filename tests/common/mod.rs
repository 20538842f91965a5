//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use app_gateway::admission::{
    AdmissionError, AdmissionPipeline, AdmissionRequest, AnalyticsCore, Handoff, NullTransaction,
    Transaction, TransactionHandle,
};
use app_gateway::config::GatewayConfig;
use app_gateway::detect::{AppType, AppTypeDetector};
use app_gateway::headers::HeaderTable;
use app_gateway::{GatewayServer, Shutdown};
use axum::http::Method;
use bumpalo::Bump;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Build an admission request from header pairs.
pub fn request<'a>(
    arena: &'a Bump,
    secure: &[(&str, &'a str)],
    client: &[(&str, &'a str)],
) -> AdmissionRequest<'a> {
    let mut secure_table = HeaderTable::new();
    for &(name, value) in secure {
        secure_table.insert(name, value.as_bytes());
    }
    let mut client_table = HeaderTable::new();
    for &(name, value) in client {
        client_table.insert(name, value.as_bytes());
    }
    AdmissionRequest::new(Method::GET, "/posts/1", client_table, secure_table, arena)
}

/// Build an admission request from raw secure header values.
pub fn request_bytes<'a>(arena: &'a Bump, secure: &[(&str, &'a [u8])]) -> AdmissionRequest<'a> {
    let mut secure_table = HeaderTable::new();
    for &(name, value) in secure {
        secure_table.insert(name, value);
    }
    AdmissionRequest::new(Method::GET, "/posts/1", HeaderTable::new(), secure_table, arena)
}

/// Hand-off that records every call.
#[derive(Debug, Default)]
pub struct RecordingHandoff {
    pub checkouts: usize,
    pub buffered: usize,
    pub errors: Vec<String>,
}

impl RecordingHandoff {
    pub fn calls(&self) -> usize {
        self.checkouts + self.buffered + self.errors.len()
    }
}

impl Handoff for RecordingHandoff {
    fn checkout_session(&mut self, _req: &AdmissionRequest<'_>) {
        self.checkouts += 1;
    }

    fn begin_buffering_body(&mut self, _req: &AdmissionRequest<'_>) {
        self.buffered += 1;
    }

    fn terminate_with_error(&mut self, req: &AdmissionRequest<'_>, error: &AdmissionError) {
        assert!(req.is_ended(), "terminate called on a live request");
        self.errors.push(error.to_string());
    }
}

/// Detector returning a fixed answer and counting calls.
#[derive(Debug, Default)]
pub struct CountingDetector {
    result: Option<AppType>,
    calls: AtomicUsize,
}

impl CountingDetector {
    pub fn new(result: Option<AppType>) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AppTypeDetector for CountingDetector {
    fn detect(&self, _app_root: &Path) -> Option<AppType> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
    }
}

/// Transaction that keeps its log lines.
#[derive(Debug, Default)]
pub struct RecordingTransaction {
    pub lines: Mutex<Vec<String>>,
    pub scopes: Mutex<Vec<String>>,
}

impl Transaction for RecordingTransaction {
    fn is_null(&self) -> bool {
        false
    }

    fn message(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }

    fn begin_scope(&self, name: &str) {
        self.scopes.lock().unwrap().push(name.to_string());
    }
}

/// Arguments of one `new_transaction` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedTransaction {
    pub app_group_name: String,
    pub category: String,
    pub key: String,
    pub filters: String,
}

/// Analytics backend recording every transaction it opens.
#[derive(Debug, Default)]
pub struct RecordingAnalytics {
    decline: bool,
    pub opened: Mutex<Vec<OpenedTransaction>>,
    pub transactions: Mutex<Vec<Arc<RecordingTransaction>>>,
}

impl RecordingAnalytics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A backend that hands out null transactions.
    pub fn declining() -> Arc<Self> {
        Arc::new(Self {
            decline: true,
            ..Default::default()
        })
    }

    pub fn opened_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }
}

impl AnalyticsCore for RecordingAnalytics {
    fn new_transaction(
        &self,
        app_group_name: &str,
        category: &str,
        key: &str,
        filters: &str,
    ) -> TransactionHandle {
        self.opened.lock().unwrap().push(OpenedTransaction {
            app_group_name: app_group_name.to_string(),
            category: category.to_string(),
            key: key.to_string(),
            filters: filters.to_string(),
        });
        if self.decline {
            return Arc::new(NullTransaction);
        }
        let txn = Arc::new(RecordingTransaction::default());
        self.transactions.lock().unwrap().push(Arc::clone(&txn));
        txn
    }
}

pub fn pipeline(config: GatewayConfig, detector: Arc<CountingDetector>) -> AdmissionPipeline {
    AdmissionPipeline::new(Arc::new(config), detector)
}

/// Start a backend that answers every request with its `name` followed by
/// the raw request head it received.
pub async fn start_echo_backend(name: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                let head_end = loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                        break pos + 4;
                    }
                };

                let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
                let content_length = head
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                while buf.len() < head_end + content_length {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }

                let body = format!("{name}\n{head}");
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start the gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> (SocketAddr, Arc<Shutdown>) {
    let config = Arc::new(config);
    let pipeline = AdmissionPipeline::new(Arc::clone(&config), CountingDetector::new(None));
    let server = GatewayServer::new(config, pipeline).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Arc::new(Shutdown::new());
    let signal = shutdown.signal();
    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });

    (addr, shutdown)
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
