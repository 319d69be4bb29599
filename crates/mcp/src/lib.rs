//! Sandboxed file-access JSON-RPC server.
//!
//! Exposes `fs.listDirectory`, `fs.readFile` and `fs.search` over JSON-RPC
//! 2.0, confined to a single root directory.
//!
//! ```rust,ignore
//! use mcpfs::{Dispatcher, http};
//! use mcpfs_filesystem::{FileBrowser, Root};
//!
//! let dispatcher = Dispatcher::new(FileBrowser::new(Root::new("/srv/files")?));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//! axum::serve(listener, http::router(dispatcher)).await?;
//! ```

pub mod compliance;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod protocol;

pub use compliance::{McpCompliance, RequestValidator};
pub use config::Config;
pub use dispatch::Dispatcher;
pub use protocol::{ErrorCode, Method, RpcError, RpcResponse};
