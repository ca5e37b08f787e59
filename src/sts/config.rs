//! STS endpoint configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// STS endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StsConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Outbound client used to confirm assertions with the IdP.
    #[serde(default)]
    pub idp: IdpClientConfig,
}

fn default_listen() -> String {
    "0.0.0.0:9000".to_string()
}

impl Default for StsConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            idp: IdpClientConfig::default(),
        }
    }
}

impl StsConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.listen
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid listen address {:?}: {}", self.listen, e))?;
        self.idp.validate()
    }
}

/// Transport settings for the IdP confirmation client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdpClientConfig {
    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// TCP keep-alive interval in seconds.
    #[serde(default = "default_keepalive")]
    pub tcp_keepalive_secs: u64,

    /// Maximum idle pooled connections.
    #[serde(default = "default_max_idle")]
    pub max_idle_connections: usize,

    /// Idle pooled connections are closed after this many seconds.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// TLS handshake budget in seconds, on top of the connect timeout.
    #[serde(default = "default_tls_handshake_timeout")]
    pub tls_handshake_timeout_secs: u64,

    /// PEM bundle of additional root CAs to trust.
    #[serde(default)]
    pub root_ca_path: Option<PathBuf>,

    /// Skip certificate chain and hostname verification toward the IdP.
    ///
    /// Enabled by default. With this on, `root_ca_path` is loaded but any
    /// certificate the IdP presents is accepted.
    #[serde(default = "default_true")]
    pub insecure_skip_verify: bool,
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_keepalive() -> u64 {
    30
}

fn default_max_idle() -> usize {
    100
}

fn default_idle_timeout() -> u64 {
    90
}

fn default_tls_handshake_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for IdpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            tcp_keepalive_secs: default_keepalive(),
            max_idle_connections: default_max_idle(),
            idle_timeout_secs: default_idle_timeout(),
            tls_handshake_timeout_secs: default_tls_handshake_timeout(),
            root_ca_path: None,
            insecure_skip_verify: true,
        }
    }
}

impl IdpClientConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.connect_timeout_secs == 0 {
            return Err("IdP connect timeout must be greater than zero".to_string());
        }
        if self.tls_handshake_timeout_secs == 0 {
            return Err("IdP TLS handshake timeout must be greater than zero".to_string());
        }
        if let Some(ref path) = self.root_ca_path {
            if !path.exists() {
                return Err(format!("Root CA file does not exist: {:?}", path));
            }
        }
        Ok(())
    }
}

/// JSON configuration file overlay.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct StsConfigJson {
    pub listen: Option<String>,
    pub idp_connect_timeout_secs: Option<u64>,
    pub idp_tcp_keepalive_secs: Option<u64>,
    pub idp_max_idle_connections: Option<usize>,
    pub idp_idle_timeout_secs: Option<u64>,
    pub idp_tls_handshake_timeout_secs: Option<u64>,
    pub root_ca_path: Option<String>,
    pub idp_insecure_skip_verify: Option<bool>,
}

impl StsConfigJson {
    /// Apply JSON config to existing config.
    pub fn apply_to(&self, config: &mut StsConfig) {
        if let Some(ref listen) = self.listen {
            config.listen = listen.clone();
        }
        if let Some(secs) = self.idp_connect_timeout_secs {
            config.idp.connect_timeout_secs = secs;
        }
        if let Some(secs) = self.idp_tcp_keepalive_secs {
            config.idp.tcp_keepalive_secs = secs;
        }
        if let Some(max) = self.idp_max_idle_connections {
            config.idp.max_idle_connections = max;
        }
        if let Some(secs) = self.idp_idle_timeout_secs {
            config.idp.idle_timeout_secs = secs;
        }
        if let Some(secs) = self.idp_tls_handshake_timeout_secs {
            config.idp.tls_handshake_timeout_secs = secs;
        }
        if let Some(ref path) = self.root_ca_path {
            config.idp.root_ca_path = Some(PathBuf::from(path));
        }
        if let Some(skip) = self.idp_insecure_skip_verify {
            config.idp.insecure_skip_verify = skip;
        }
    }
}
