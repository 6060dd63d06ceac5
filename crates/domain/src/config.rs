//! MCP-over-HTTP client configuration.
//!
//! Lives in the domain crate so config deserializers can include it
//! without depending on the full client crate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MCP HTTP connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpHttpConfig {
    /// Server URL. A path component, if present, overrides `endpoint`.
    pub url: String,

    /// RPC endpoint path, used when `url` carries no path.
    #[serde(default = "d_endpoint")]
    pub endpoint: String,

    /// Extra request headers. The fixed `Content-Type`, `Accept` and
    /// `User-Agent` headers cannot be overridden here.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Read timeout per HTTP request.
    #[serde(default = "d_30000")]
    pub timeout_ms: u64,

    /// Connect timeout for the underlying HTTP client.
    #[serde(default = "d_10000")]
    pub connect_timeout_ms: u64,

    /// Total attempts (first try included) for retryable RPC failures.
    #[serde(default = "d_3")]
    pub max_attempts: u32,

    /// Base delay for exponential backoff between retry attempts.
    #[serde(default = "d_500")]
    pub retry_backoff_ms: u64,

    /// Client identity sent during `initialize` and as the user agent.
    #[serde(default = "d_client_name")]
    pub client_name: String,
    #[serde(default = "d_client_version")]
    pub client_version: String,

    /// Protocol version advertised during the handshake.
    #[serde(default = "d_protocol_version")]
    pub protocol_version: String,
}

impl McpHttpConfig {
    /// Config pointing at `url`, everything else defaulted.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            endpoint: d_endpoint(),
            headers: HashMap::new(),
            timeout_ms: d_30000(),
            connect_timeout_ms: d_10000(),
            max_attempts: d_3(),
            retry_backoff_ms: d_500(),
            client_name: d_client_name(),
            client_version: d_client_version(),
            protocol_version: d_protocol_version(),
        }
    }

    /// Split the configured URL into `(base_url, endpoint)`.
    ///
    /// A path component in the URL wins over the configured endpoint:
    /// `http://host:8080/api` with endpoint `/rpc` resolves to
    /// (`http://host:8080`, `/api`), while a bare `http://host`
    /// resolves to (`http://host`, configured endpoint).
    pub fn resolve_endpoint(&self) -> (String, String) {
        let url = self.url.trim_end_matches('/');
        let after_scheme = url.find("://").map(|i| i + 3).unwrap_or(0);
        match url[after_scheme..].find('/') {
            Some(rel) => {
                let idx = after_scheme + rel;
                (url[..idx].to_owned(), url[idx..].to_owned())
            }
            None => (url.to_owned(), self.endpoint.clone()),
        }
    }

    /// The full URL RPC envelopes are POSTed to.
    pub fn rpc_url(&self) -> String {
        let (base, endpoint) = self.resolve_endpoint();
        format!("{base}{endpoint}")
    }

    /// Identifying user-agent string.
    pub fn user_agent(&self) -> String {
        format!("{}/{}", self.client_name, self.client_version)
    }
}

impl Default for McpHttpConfig {
    fn default() -> Self {
        Self::for_url("http://localhost:8080")
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_endpoint() -> String {
    "/rpc".into()
}
fn d_30000() -> u64 {
    30_000
}
fn d_10000() -> u64 {
    10_000
}
fn d_3() -> u32 {
    3
}
fn d_500() -> u64 {
    500
}
fn d_client_name() -> String {
    "toolport".into()
}
fn d_client_version() -> String {
    env!("CARGO_PKG_VERSION").into()
}
fn d_protocol_version() -> String {
    "2024-11-05".into()
}
