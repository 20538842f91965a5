use std::path::PathBuf;
use std::sync::Arc;

use axum::http::Method;
use bumpalo::Bump;
use clap::{Parser, Subcommand};
use serde_json::json;

use app_gateway::admission::{
    AdmissionError, AdmissionPipeline, AdmissionRequest, Dispatch, Handoff,
};
use app_gateway::config::{load_config, GatewayConfig};
use app_gateway::detect::FsAppTypeDetector;
use app_gateway::headers::HeaderTable;
use app_gateway::options::env_vars::decode_env_vars;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Offline tools for the application gateway", long_about = None)]
struct Cli {
    /// Gateway configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run admission for one request and print the resolved pool options
    Resolve {
        /// Request header as NAME=VALUE; repeatable
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        #[arg(short, long, default_value = "GET")]
        method: String,

        #[arg(short, long, default_value = "/")]
        path: String,

        /// Treat the request as carrying a body
        #[arg(long)]
        with_body: bool,
    },
    /// Decode an environment variables blob
    EnvVars { blob: String },
}

fn parse_header(arg: &str) -> Result<(String, String), String> {
    arg.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got {arg:?}"))
}

#[derive(Default)]
struct PrintHandoff {
    error: Option<String>,
}

impl Handoff for PrintHandoff {
    fn checkout_session(&mut self, _req: &AdmissionRequest<'_>) {}

    fn begin_buffering_body(&mut self, _req: &AdmissionRequest<'_>) {}

    fn terminate_with_error(&mut self, _req: &AdmissionRequest<'_>, error: &AdmissionError) {
        self.error = Some(error.to_string());
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    match cli.command {
        Commands::Resolve {
            headers,
            method,
            path,
            with_body,
        } => resolve(config, &headers, &method, &path, with_body),
        Commands::EnvVars { blob } => {
            let vars = decode_env_vars(&blob)?;
            let map: serde_json::Map<_, _> =
                vars.into_iter().map(|(k, v)| (k, json!(v))).collect();
            println!("{}", serde_json::to_string_pretty(&map)?);
            Ok(())
        }
    }
}

fn resolve(
    config: GatewayConfig,
    headers: &[(String, String)],
    method: &str,
    path: &str,
    with_body: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let method = Method::from_bytes(method.as_bytes())?;
    let prefix = config.listener.secure_header_prefix.clone();
    let mut pipeline = AdmissionPipeline::new(Arc::new(config), Arc::new(FsAppTypeDetector));

    let arena = Bump::new();
    let mut client = HeaderTable::new();
    let mut secure = HeaderTable::new();
    for (name, value) in headers {
        // Arguments come from the operator, so secure headers are accepted
        // regardless of the listener setting.
        if name.starts_with(&prefix) {
            secure.insert(name, value.as_bytes());
        } else {
            client.insert(name, value.as_bytes());
        }
    }

    let mut req = AdmissionRequest::new(method, path, client, secure, &arena).with_body(with_body);
    let mut handoff = PrintHandoff::default();
    let dispatch = pipeline.on_request_begin(&mut req, &mut handoff);

    if let Some(error) = handoff.error {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
    if dispatch == Dispatch::Aborted {
        eprintln!("Error: request aborted");
        std::process::exit(1);
    }

    let Some(options) = &req.options else {
        eprintln!("Error: no pool options resolved");
        std::process::exit(1);
    };
    let output = json!({
        "dispatch": format!("{dispatch:?}"),
        "flags": {
            "dechunk_response": req.flags.dechunk_response,
            "request_body_buffering": req.flags.request_body_buffering,
            "https": req.flags.https,
            "strip_100_continue_header": req.flags.strip_100_continue_header,
        },
        "sticky_session_id": options.sticky_session_id,
        "max_requests": options.effective_max_requests(),
        "max_request_time": req.max_request_time,
        "options": options.to_pool_options(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
