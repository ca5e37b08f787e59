//! SAML STS Agent
//!
//! An AWS STS compatible endpoint implementing `AssumeRoleWithSAML`:
//! SAML responses forwarded by clients are confirmed with the issuing IdP
//! and exchanged for short-lived access key / secret key / session token
//! credentials.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use saml_sts::credentials::{CredentialStore, KeyMinter};
use saml_sts::saml::SamlResponseParser;
use saml_sts::server;
use saml_sts::sts::{IdpClient, StsConfig, StsConfigJson, StsService};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "saml-sts")]
#[command(about = "AWS STS compatible AssumeRoleWithSAML endpoint")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "STS_LISTEN")]
    listen: Option<String>,

    /// JSON configuration file
    #[arg(long, env = "STS_CONFIG")]
    config: Option<PathBuf>,

    /// PEM bundle of root CAs trusted for IdP connections
    #[arg(long, env = "STS_ROOT_CA")]
    root_ca: Option<PathBuf>,

    /// Skip TLS certificate and hostname verification toward the IdP (true/false)
    #[arg(long, env = "STS_IDP_SKIP_TLS_VERIFY")]
    idp_skip_tls_verify: Option<bool>,

    /// Enable verbose logging
    #[arg(short, long, env = "STS_VERBOSE")]
    verbose: bool,
}

/// Build configuration from defaults, the optional JSON file, then flags.
fn load_config(args: &Args) -> Result<StsConfig> {
    let mut config = StsConfig::default();

    if let Some(ref path) = args.config {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let json: StsConfigJson = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        json.apply_to(&mut config);
    }

    if let Some(ref listen) = args.listen {
        config.listen = listen.clone();
    }
    if let Some(ref root_ca) = args.root_ca {
        config.idp.root_ca_path = Some(root_ca.clone());
    }
    if let Some(skip) = args.idp_skip_tls_verify {
        config.idp.insecure_skip_verify = skip;
    }

    config.validate().map_err(|e| anyhow!(e))?;
    Ok(config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl-C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => warn!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("{}={}", env!("CARGO_CRATE_NAME"), log_level))
        .json()
        .init();

    info!("Starting SAML STS Agent");

    let config = load_config(&args)?;

    info!(
        listen = %config.listen,
        root_ca = ?config.idp.root_ca_path,
        idp_skip_tls_verify = config.idp.insecure_skip_verify,
        "Configuration loaded"
    );

    let idp_client = IdpClient::new(&config.idp)?;
    let store = Arc::new(CredentialStore::new());
    let service = StsService::new(
        Box::new(SamlResponseParser),
        idp_client,
        Box::new(KeyMinter),
        Arc::clone(&store),
    );

    let app = server::router(Arc::new(service));

    let addr: SocketAddr = config.listen.parse()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(address = %addr, "STS endpoint listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("STS server failed")?;

    info!("SAML STS Agent stopped");
    Ok(())
}
