//! `tp-mcp-client` — MCP (Model Context Protocol) client over HTTP.
//!
//! This crate provides:
//! - JSON-RPC 2.0 envelope types and the response codec.
//! - A retry policy with exponential backoff for transient
//!   connectivity failures.
//! - An HTTP transport adapter over a minimal POST capability, with
//!   uniform status-code classification.
//! - [`McpHttpClient`], which drives the connection lifecycle
//!   (handshake, readiness barrier, cleanup) and exposes the tool
//!   facade (`list_tools`, `call_tool`, streaming placeholder, plus
//!   generic `rpc_request`/`rpc_notify` for advanced callers).
//!
//! # Usage
//!
//! ```rust,ignore
//! use tp_mcp_client::{McpHttpClient, McpHttpConfig};
//!
//! let config = McpHttpConfig::for_url("http://localhost:8080/mcp");
//! let client = McpHttpClient::new(config);
//!
//! client.connect().await?;
//! for tool in client.list_tools().await? {
//!     println!("{}: {}", tool.name, tool.description);
//! }
//!
//! let result = client
//!     .call_tool("read_file", serde_json::json!({ "path": "/tmp/test.txt" }))
//!     .await?;
//! ```

pub mod client;
pub mod protocol;
pub mod retry;
pub mod transport;

// Re-exports for convenience.
pub use client::{ConnectionState, McpHttpClient};
pub use protocol::ToolDef;
pub use retry::RetryPolicy;
pub use transport::{HttpCapability, RawResponse};

pub use tp_domain::config::McpHttpConfig;
pub use tp_domain::error::{Error, ErrorKind, Result};
