//! IdP confirmation client.
//!
//! Replays the original SAML response to the `Destination` it names and
//! treats anything short of a server error as acceptance.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::config::IdpClientConfig;
use super::error::StsError;
use crate::saml::SamlAssertion;

/// HTTP client used to confirm assertions with the issuing IdP.
#[derive(Debug, Clone)]
pub struct IdpClient {
    http_client: reqwest::Client,
}

impl IdpClient {
    /// Build the outbound client from configuration.
    pub fn new(config: &IdpClientConfig) -> Result<Self> {
        // reqwest's connect phase covers both TCP connect and TLS handshake.
        let connect_budget =
            Duration::from_secs(config.connect_timeout_secs + config.tls_handshake_timeout_secs);

        let mut builder = reqwest::Client::builder()
            .connect_timeout(connect_budget)
            .tcp_keepalive(Duration::from_secs(config.tcp_keepalive_secs))
            .pool_max_idle_per_host(config.max_idle_connections)
            .pool_idle_timeout(Duration::from_secs(config.idle_timeout_secs));

        if let Some(ref path) = config.root_ca_path {
            let pem = std::fs::read(path)
                .with_context(|| format!("Failed to read root CA bundle: {:?}", path))?;
            let certs = reqwest::Certificate::from_pem_bundle(&pem)
                .with_context(|| format!("Failed to parse root CA bundle: {:?}", path))?;
            debug!(path = ?path, certificates = certs.len(), "Loaded IdP root CAs");
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }

        if config.insecure_skip_verify {
            warn!("TLS certificate and hostname verification toward the IdP is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http_client = builder.build().context("Failed to create IdP HTTP client")?;

        Ok(Self { http_client })
    }

    /// Confirm an assertion with its IdP.
    ///
    /// Posts `SAMLResponse=<original payload>` to the assertion's destination.
    /// Returns the IdP's status code when it is below 500.
    pub async fn confirm(&self, assertion: &SamlAssertion) -> Result<u16, StsError> {
        let destination = &assertion.destination;
        debug!(destination = %destination, "Confirming SAML assertion with IdP");

        let response = self
            .http_client
            .post(destination)
            .form(&[("SAMLResponse", assertion.original.as_str())])
            .send()
            .await
            .map_err(|source| StsError::IdpUnreachable {
                destination: destination.clone(),
                source,
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(StsError::IdpRejectedClaim {
                destination: destination.clone(),
                status: status.as_u16(),
            });
        }

        info!(
            destination = %destination,
            status = status.as_u16(),
            "IdP accepted SAML assertion"
        );

        Ok(status.as_u16())
    }
}
