//! `tp-domain` — shared types for toolport crates.
//!
//! Holds the closed error taxonomy, the client configuration, and the
//! boxed-stream alias so that consumers (and config deserializers in
//! particular) can depend on these without pulling in the full MCP
//! client crate.

pub mod config;
pub mod error;
pub mod stream;

pub use config::McpHttpConfig;
pub use error::{Error, ErrorKind, Result};
pub use stream::BoxStream;
