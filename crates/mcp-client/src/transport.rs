//! HTTP transport adapter.
//!
//! The outside world is reached through the minimal [`HttpCapability`]
//! seam ("POST these bytes, get status + body back"). [`HttpTransport`]
//! layers header management and status-code classification on top;
//! [`ReqwestCapability`] is the production implementation backed by a
//! pooled `reqwest::Client`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use tp_domain::config::McpHttpConfig;
use tp_domain::error::{Error, Result};

/// A raw HTTP response, reduced to what the protocol layer needs.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

/// Minimal outbound-HTTP seam.
#[async_trait]
pub trait HttpCapability: Send + Sync {
    /// POST `body` to `url` with the given headers.
    ///
    /// Implementations classify their own failures: refused or
    /// unreachable connections map to [`Error::Connection`], timeouts
    /// and everything else to [`Error::Transport`].
    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: String,
    ) -> Result<RawResponse>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reqwest capability
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Production capability: a pooled `reqwest::Client` with the
/// configured read/connect timeouts.
pub struct ReqwestCapability {
    http: reqwest::Client,
}

impl ReqwestCapability {
    pub fn new(config: &McpHttpConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(|e| Error::connection(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HttpCapability for ReqwestCapability {
    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: String,
    ) -> Result<RawResponse> {
        let mut rb = self.http.post(url).body(body);
        for (name, value) in headers {
            rb = rb.header(name.as_str(), value.as_str());
        }

        let resp = rb.send().await.map_err(from_reqwest)?;
        let status = resp.status();
        let reason = status.canonical_reason().unwrap_or("").to_owned();
        let body = resp.text().await.map_err(from_reqwest)?;

        Ok(RawResponse {
            status: status.as_u16(),
            reason,
            body,
        })
    }
}

/// Convert a `reqwest::Error` into the domain taxonomy.
fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_connect() {
        Error::connection(format!("connection failed: {e}"))
    } else {
        Error::Transport(e.to_string())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transport adapter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const CONTENT_TYPE: &str = "content-type";
const ACCEPT: &str = "accept";
const USER_AGENT: &str = "user-agent";

/// Sends serialized envelopes to the resolved RPC endpoint and maps
/// HTTP statuses into the error taxonomy.
pub struct HttpTransport {
    capability: Arc<dyn HttpCapability>,
    url: String,
    headers: Vec<(String, String)>,
}

impl HttpTransport {
    /// Merge caller headers with the fixed set. Caller values never
    /// override `Content-Type`, `Accept` or `User-Agent`.
    pub fn new(capability: Arc<dyn HttpCapability>, config: &McpHttpConfig) -> Self {
        let mut headers: Vec<(String, String)> = config
            .headers
            .iter()
            .filter(|(name, _)| {
                let name = name.to_ascii_lowercase();
                name != CONTENT_TYPE && name != ACCEPT && name != USER_AGENT
            })
            .map(|(n, v)| (n.clone(), v.clone()))
            .collect();
        headers.push((CONTENT_TYPE.into(), "application/json".into()));
        headers.push((ACCEPT.into(), "application/json".into()));
        headers.push((USER_AGENT.into(), config.user_agent()));

        Self {
            capability,
            url: config.rpc_url(),
            headers,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST a serialized envelope; returns the response body on 2xx.
    pub async fn send(&self, body: String) -> Result<String> {
        tracing::debug!(url = %self.url, body = %body, "sending JSON-RPC envelope");
        let resp = self.capability.post(&self.url, &self.headers, body).await?;
        tracing::debug!(status = resp.status, body = %resp.body, "received HTTP response");

        match resp.status {
            200..=299 => Ok(resp.body),
            401 | 403 => Err(Error::Connection {
                message: format!("Authorization failed ({}): {}", resp.status, resp.reason),
                status: Some(resp.status),
            }),
            400..=499 => Err(Error::Server {
                status: resp.status,
                message: format!("client error: {}", reason_with_body(&resp)),
            }),
            500..=599 => Err(Error::Server {
                status: resp.status,
                message: format!("server error: {}", reason_with_body(&resp)),
            }),
            _ => Err(Error::Server {
                status: resp.status,
                message: format!("unexpected HTTP status: {}", reason_with_body(&resp)),
            }),
        }
    }
}

fn reason_with_body(resp: &RawResponse) -> String {
    if resp.body.is_empty() {
        resp.reason.clone()
    } else {
        format!("{}: {}", resp.reason, resp.body)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scripted capability for tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━


#[cfg(test)]
mod tests {
    use super::mock::MockHttp;
    use super::*;
    use tp_domain::error::ErrorKind;

    fn transport(mock: Arc<MockHttp>, config: &McpHttpConfig) -> HttpTransport {
        HttpTransport::new(mock, config)
    }

    fn config() -> McpHttpConfig {
        McpHttpConfig::for_url("http://localhost:9000")
    }

    #[tokio::test]
    async fn returns_body_on_success() {
        let mock = MockHttp::new();
        mock.push_status(200, "OK", r#"{"jsonrpc":"2.0","id":1,"result":{}}"#);
        let t = transport(mock.clone(), &config());

        let body = t.send("{}".into()).await.unwrap();
        assert!(body.contains("result"));
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn maps_403_to_authorization_failure() {
        let mock = MockHttp::new();
        mock.push_status(403, "Forbidden", "");
        let t = transport(mock, &config());

        let err = t.send("{}".into()).await.unwrap_err();
        match &err {
            Error::Connection { status, message } => {
                assert_eq!(*status, Some(403));
                assert!(message.contains("Authorization failed"));
                assert!(message.contains("403"));
            }
            other => panic!("expected Connection, got {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[tokio::test]
    async fn maps_401_to_authorization_failure() {
        let mock = MockHttp::new();
        mock.push_status(401, "Unauthorized", "");
        let t = transport(mock, &config());

        let err = t.send("{}".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[tokio::test]
    async fn maps_client_error_statuses_to_server_error() {
        let mock = MockHttp::new();
        mock.push_status(404, "Not Found", "no such endpoint");
        let t = transport(mock, &config());

        let err = t.send("{}".into()).await.unwrap_err();
        match err {
            Error::Server { status, message } => {
                assert_eq!(status, 404);
                assert!(message.contains("client error"));
                assert!(message.contains("Not Found"));
            }
            other => panic!("expected Server, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn maps_server_error_statuses_to_server_error() {
        let mock = MockHttp::new();
        mock.push_status(503, "Service Unavailable", "");
        let t = transport(mock, &config());

        let err = t.send("{}".into()).await.unwrap_err();
        match err {
            Error::Server { status, message } => {
                assert_eq!(status, 503);
                assert!(message.contains("server error"));
            }
            other => panic!("expected Server, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn capability_failures_pass_through() {
        let mock = MockHttp::new();
        mock.push_failure(Error::connection("connection refused"));
        let t = transport(mock, &config());

        let err = t.send("{}".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[tokio::test]
    async fn fixed_headers_cannot_be_overridden() {
        let mut cfg = config();
        cfg.headers.insert("User-Agent".into(), "spoofed".into());
        cfg.headers.insert("Content-Type".into(), "text/plain".into());
        cfg.headers.insert("X-Api-Key".into(), "secret".into());

        let mock = MockHttp::new();
        mock.push_status(200, "OK", "{}");
        let t = transport(mock.clone(), &cfg);
        t.send("{}".into()).await.unwrap();

        let headers = mock.last_headers.lock().clone();
        let get = |name: &str| -> Vec<String> {
            headers
                .iter()
                .filter(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone())
                .collect()
        };
        assert_eq!(get("content-type"), vec!["application/json"]);
        assert_eq!(get("accept"), vec!["application/json"]);
        assert_eq!(get("user-agent"), vec![cfg.user_agent()]);
        assert_eq!(get("x-api-key"), vec!["secret"]);
    }

    #[tokio::test]
    async fn posts_to_the_resolved_endpoint() {
        let cfg = McpHttpConfig::for_url("http://example.com:8080/api");
        let mock = MockHttp::new();
        let t = transport(mock, &cfg);
        assert_eq!(t.url(), "http://example.com:8080/api");
    }
}
