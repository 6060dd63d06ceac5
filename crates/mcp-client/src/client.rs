//! Connection lifecycle and tool facade.
//!
//! [`McpHttpClient`] owns all shared mutable state (connection state,
//! id counter, server metadata, tools cache) behind a single mutex.
//! The lock is only ever taken for in-memory access; HTTP sends and
//! backoff sleeps happen outside it, so two concurrent callers may
//! have requests in flight with consecutive ids and each response is
//! correlated to its own request by id.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use tp_domain::config::McpHttpConfig;
use tp_domain::error::{Error, ErrorKind, Result};
use tp_domain::stream::BoxStream;

use crate::protocol::{self, JsonRpcNotification, JsonRpcRequest, ToolDef};
use crate::retry::{self, RetryPolicy};
use crate::transport::{HttpCapability, HttpTransport, ReqwestCapability};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Connection state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Lifecycle states of a client connection.
///
/// `Initialized` implies an established transport, so readers observe
/// either fully-ready or not-ready, never a half-initialized client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Initialized,
}

/// Everything guarded by the single client lock.
struct Shared {
    state: ConnectionState,
    /// Monotonically increasing correlation id counter. Never reset,
    /// so ids stay unique across reconnects.
    next_id: u64,
    transport: Option<Arc<HttpTransport>>,
    server_info: Option<Value>,
    capabilities: Option<Value>,
    tools_raw: Option<Value>,
    tools: Option<Vec<ToolDef>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            next_id: 0,
            transport: None,
            server_info: None,
            capabilities: None,
            tools_raw: None,
            tools: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// McpHttpClient
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// MCP-over-HTTP client: handshake, tool discovery, tool dispatch.
///
/// Cheap to clone; clones share the connection, id counter and caches.
#[derive(Clone)]
pub struct McpHttpClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: McpHttpConfig,
    retry: RetryPolicy,
    /// Injected capability (tests, custom transports). `None` means a
    /// `ReqwestCapability` is built lazily at connect time.
    capability: Option<Arc<dyn HttpCapability>>,
    shared: Mutex<Shared>,
}

impl McpHttpClient {
    pub fn new(config: McpHttpConfig) -> Self {
        Self::build(config, None)
    }

    /// Build a client over a caller-supplied HTTP capability.
    pub fn with_capability(config: McpHttpConfig, capability: Arc<dyn HttpCapability>) -> Self {
        Self::build(config, Some(capability))
    }

    fn build(config: McpHttpConfig, capability: Option<Arc<dyn HttpCapability>>) -> Self {
        let retry = RetryPolicy::new(
            config.max_attempts,
            Duration::from_millis(config.retry_backoff_ms),
        );
        Self {
            inner: Arc::new(Inner {
                config,
                retry,
                capability,
                shared: Mutex::new(Shared::new()),
            }),
        }
    }

    // ── lifecycle ────────────────────────────────────────────────────

    /// Establish the connection and perform the protocol handshake.
    ///
    /// No-op when already initialized. Any probe or handshake failure
    /// cleans the client up and surfaces as [`Error::Connection`]
    /// (errors that already are connection-class pass unchanged).
    pub async fn connect(&self) -> Result<()> {
        {
            let mut shared = self.inner.shared.lock();
            if shared.state == ConnectionState::Initialized {
                return Ok(());
            }
            shared.state = ConnectionState::Connecting;
            shared.server_info = None;
            shared.capabilities = None;
        }

        match self.handshake().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.cleanup();
                tracing::warn!(error = %e, url = %self.inner.config.rpc_url(), "MCP handshake failed");
                Err(match e.kind() {
                    ErrorKind::Connection | ErrorKind::Auth => e,
                    _ => Error::connection(format!("handshake failed: {e}")),
                })
            }
        }
    }

    /// Probe (build the transport lazily, no handshake traffic), then
    /// `initialize`, then `notifications/initialized`.
    async fn handshake(&self) -> Result<()> {
        let capability: Arc<dyn HttpCapability> = match &self.inner.capability {
            Some(c) => c.clone(),
            None => Arc::new(ReqwestCapability::new(&self.inner.config)?),
        };
        let transport = Arc::new(HttpTransport::new(capability, &self.inner.config));
        self.inner.shared.lock().transport = Some(transport);

        let params = serde_json::to_value(protocol::initialize_params(&self.inner.config))
            .map_err(|e| Error::Transport(format!("failed to serialize initialize params: {e}")))?;
        let result = self.request_raw("initialize", Some(params)).await?;

        self.notify_raw("notifications/initialized", None).await?;

        let mut shared = self.inner.shared.lock();
        shared.server_info = result.get("serverInfo").cloned();
        shared.capabilities = result.get("capabilities").cloned();
        shared.state = ConnectionState::Initialized;
        tracing::info!(url = %self.inner.config.rpc_url(), "MCP connection initialized");
        Ok(())
    }

    /// Readiness barrier invoked at the top of every RPC.
    ///
    /// Returns immediately with no I/O when initialized; otherwise any
    /// partial or stale state is discarded and the full handshake runs
    /// again. Failures always surface as [`Error::Connection`].
    pub async fn ensure_connected(&self) -> Result<()> {
        if self.inner.shared.lock().state == ConnectionState::Initialized {
            return Ok(());
        }
        self.cleanup();
        self.connect().await
    }

    /// Reset to `Disconnected`: drops the transport and clears the
    /// tools cache and server metadata. Idempotent, never fails.
    pub fn cleanup(&self) {
        let mut shared = self.inner.shared.lock();
        shared.state = ConnectionState::Disconnected;
        shared.transport = None;
        shared.server_info = None;
        shared.capabilities = None;
        shared.tools_raw = None;
        shared.tools = None;
    }

    // ── generic RPC entry points ─────────────────────────────────────

    /// Readiness barrier, then a retry-wrapped
    /// {assign id, build, send, parse} cycle. Each attempt gets a
    /// fresh id; only connectivity failures are retried.
    pub async fn rpc_request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        self.ensure_connected().await?;
        retry::with_retry(&self.inner.retry, retry::CONNECTIVITY, || {
            self.request_raw(method, params.clone())
        })
        .await
    }

    /// Fire-and-forget notification: single send, no retry, no
    /// response expected. Any failure during the send is wrapped as a
    /// generic transport error.
    pub async fn rpc_notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        self.ensure_connected().await?;
        self.notify_raw(method, params)
            .await
            .map_err(|e| Error::Transport(format!("notification '{method}' failed: {e}")))
    }

    /// One id-tagged request/response cycle, outside the retry loop.
    /// The id is assigned under the lock; the send happens outside it.
    async fn request_raw(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let (transport, id) = {
            let mut shared = self.inner.shared.lock();
            let transport = shared
                .transport
                .clone()
                .ok_or_else(|| Error::connection("not connected"))?;
            shared.next_id += 1;
            (transport, shared.next_id)
        };

        let request = JsonRpcRequest::new(id, method, params);
        let body = serde_json::to_string(&request)
            .map_err(|e| Error::Transport(format!("failed to serialize request: {e}")))?;

        tracing::debug!(id, method, "sending MCP request");
        let raw = transport.send(body).await?;
        protocol::parse_response(&raw, id)
    }

    async fn notify_raw(&self, method: &str, params: Option<Value>) -> Result<()> {
        let transport = self
            .inner
            .shared
            .lock()
            .transport
            .clone()
            .ok_or_else(|| Error::connection("not connected"))?;

        let notification = JsonRpcNotification::new(method, params);
        let body = serde_json::to_string(&notification)
            .map_err(|e| Error::Transport(format!("failed to serialize notification: {e}")))?;

        tracing::debug!(method, "sending MCP notification");
        transport.send(body).await?;
        Ok(())
    }

    // ── tool facade ──────────────────────────────────────────────────

    /// List the server's tools, fetching and caching on first use.
    ///
    /// A cached list is returned without I/O; [`cleanup`] invalidates
    /// it. Accepts `{"tools": [...]}` or, as a compatibility fallback,
    /// the whole result as a bare tools array.
    ///
    /// [`cleanup`]: McpHttpClient::cleanup
    pub async fn list_tools(&self) -> Result<Vec<ToolDef>> {
        if let Some(tools) = self.inner.shared.lock().tools.clone() {
            return Ok(tools);
        }

        let result = self.rpc_request("tools/list", None).await?;
        let tools = parse_tools_payload(&result)?;
        tracing::debug!(tool_count = tools.len(), "caching tools list");

        let mut shared = self.inner.shared.lock();
        shared.tools_raw = Some(result);
        shared.tools = Some(tools.clone());
        Ok(tools)
    }

    /// Invoke a tool by name.
    ///
    /// Connectivity and transport failures keep their classification;
    /// anything else is wrapped once, naming the tool.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        let params = serde_json::json!({ "name": name, "arguments": arguments });
        self.rpc_request("tools/call", Some(params))
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::Connection | ErrorKind::Auth | ErrorKind::Transport => e,
                _ => Error::ToolCall {
                    operation: name.to_owned(),
                    message: e.to_string(),
                },
            })
    }

    /// Single-item streaming facade over [`call_tool`].
    ///
    /// Yields exactly one element, lazily on first poll: the
    /// synchronous result of the call. Finite and non-restartable; a
    /// placeholder contract for transports without true streaming.
    ///
    /// [`call_tool`]: McpHttpClient::call_tool
    pub fn call_tool_streaming(
        &self,
        name: &str,
        arguments: Value,
    ) -> BoxStream<'static, Result<Value>> {
        let client = self.clone();
        let name = name.to_owned();
        Box::pin(async_stream::stream! {
            yield client.call_tool(&name, arguments).await;
        })
    }

    // ── accessors ────────────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        self.inner.shared.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Initialized
    }

    /// `serverInfo` captured during the handshake, verbatim.
    pub fn server_info(&self) -> Option<Value> {
        self.inner.shared.lock().server_info.clone()
    }

    /// Server `capabilities` captured during the handshake, verbatim.
    pub fn capabilities(&self) -> Option<Value> {
        self.inner.shared.lock().capabilities.clone()
    }

    /// The raw `tools/list` payload as the server sent it, if cached.
    pub fn tools_payload(&self) -> Option<Value> {
        self.inner.shared.lock().tools_raw.clone()
    }
}

/// Accepts `{"tools": [...]}` or a bare array as the tools payload.
fn parse_tools_payload(result: &Value) -> Result<Vec<ToolDef>> {
    let payload = match result.get("tools") {
        Some(tools) => tools,
        None if result.is_array() => result,
        None => {
            return Err(Error::ToolCall {
                operation: "tools/list".into(),
                message: format!("response contains no tools payload: {result}"),
            })
        }
    };
    serde_json::from_value(payload.clone()).map_err(|e| Error::ToolCall {
        operation: "tools/list".into(),
        message: format!("failed to parse tools payload: {e}"),
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
