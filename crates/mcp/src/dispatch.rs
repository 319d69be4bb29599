//! Maps JSON-RPC requests onto [`FileBrowser`] operations.
//!
//! Every request ends in exactly one [`RpcResponse`]. The order of checks is
//! fixed: compliance, version, method presence, method name, params, then
//! the operation itself.

use crate::compliance::{McpCompliance, RequestValidator};
use crate::protocol::{
    ErrorCode, JSONRPC_VERSION, Method, RpcError, RpcRequest, RpcResponse, correlation_id,
};
use mcpfs_filesystem::{BrowseError, FileBrowser};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

/// Parameters for `fs.listDirectory`.
#[derive(Debug, Deserialize)]
struct ListDirectoryParams {
    /// Defaults to the root.
    #[serde(default = "current_dir")]
    path: String,
}

/// Parameters for `fs.readFile`.
#[derive(Debug, Deserialize)]
struct ReadFileParams {
    path: String,
}

/// Parameters for `fs.search`.
#[derive(Debug, Deserialize)]
struct SearchParams {
    path: String,
    pattern: String,
}

fn current_dir() -> String {
    ".".to_owned()
}

/// JSON-RPC dispatcher over a [`FileBrowser`].
#[derive(Debug, Clone)]
pub struct Dispatcher<V = McpCompliance> {
    browser: FileBrowser,
    validator: V,
}

impl Dispatcher {
    pub fn new(browser: FileBrowser) -> Self {
        Self::with_validator(browser, McpCompliance)
    }
}

impl<V: RequestValidator> Dispatcher<V> {
    pub fn with_validator(browser: FileBrowser, validator: V) -> Self {
        Self { browser, validator }
    }

    pub fn browser(&self) -> &FileBrowser {
        &self.browser
    }

    /// Dispatch a raw request body.
    pub async fn dispatch_bytes(&self, body: &[u8]) -> RpcResponse {
        match serde_json::from_slice::<Value>(body) {
            Ok(request) => self.dispatch_value(request).await,
            Err(e) => {
                warn!(error = %e, "request body is not valid JSON");
                RpcResponse::failure(Value::Null, RpcError::new(ErrorCode::ParseError, e.to_string()))
            }
        }
    }

    /// Dispatch a parsed request.
    pub async fn dispatch_value(&self, request: Value) -> RpcResponse {
        let id = correlation_id(&request);
        match self.handle(request).await {
            Ok(result) => RpcResponse::success(id, result),
            Err(error) => RpcResponse::failure(id, error),
        }
    }

    async fn handle(&self, raw: Value) -> Result<Value, RpcError> {
        if !self.validator.check_compliance(&raw) {
            warn!(request = %raw, "compliance check failed");
            return Err(RpcError::new(
                ErrorCode::InvalidRequest,
                "Request does not comply with MCP specification",
            ));
        }

        let request: RpcRequest = serde_json::from_value(raw)
            .map_err(|e| RpcError::new(ErrorCode::InvalidRequest, e.to_string()))?;
        if request.jsonrpc != JSONRPC_VERSION {
            warn!(jsonrpc = %request.jsonrpc, "invalid JSON-RPC version");
            return Err(RpcError::new(ErrorCode::InvalidRequest, "Invalid JSON-RPC version"));
        }

        let method = match request.method {
            None | Some(Value::Null) => {
                warn!("request has no method");
                return Err(RpcError::new(
                    ErrorCode::MethodNotFound,
                    "'method' field is missing",
                ));
            }
            Some(method) => parse_method(&method)?,
        };

        let params = match request.params {
            None | Some(Value::Null) => Value::Object(Default::default()),
            Some(params) => params,
        };

        match method {
            Method::ListDirectory => {
                let params: ListDirectoryParams = parse_params(method, params)?;
                let listing = self
                    .browser
                    .list_directory(&params.path)
                    .await
                    .map_err(|e| domain_error(method, &params.path, e))?;
                info!(
                    %method,
                    path = %params.path,
                    files = listing.files.len(),
                    directories = listing.directories.len(),
                    "request succeeded"
                );
                to_result(&listing)
            }
            Method::ReadFile => {
                let params: ReadFileParams = parse_params(method, params)?;
                let content = self
                    .browser
                    .read_file(&params.path)
                    .await
                    .map_err(|e| domain_error(method, &params.path, e))?;
                info!(
                    %method,
                    path = %params.path,
                    binary = content.is_binary(),
                    "request succeeded"
                );
                to_result(&content)
            }
            Method::Search => {
                let params: SearchParams = parse_params(method, params)?;
                let matches = self
                    .browser
                    .search(&params.path, &params.pattern)
                    .await
                    .map_err(|e| domain_error(method, &params.path, e))?;
                info!(
                    %method,
                    path = %params.path,
                    pattern = %params.pattern,
                    matches = matches.len(),
                    "request succeeded"
                );
                to_result(&matches)
            }
        }
    }
}

fn parse_method(method: &Value) -> Result<Method, RpcError> {
    let parsed = method.as_str().and_then(|name| name.parse().ok());
    parsed.ok_or_else(|| {
        let name = method
            .as_str()
            .map(str::to_owned)
            .unwrap_or_else(|| method.to_string());
        warn!(method = %name, "method not found");
        RpcError::new(ErrorCode::MethodNotFound, format!("Method not found: {name}"))
    })
}

fn parse_params<T: DeserializeOwned>(method: Method, params: Value) -> Result<T, RpcError> {
    serde_json::from_value(params).map_err(|e| {
        warn!(%method, error = %e, "invalid params");
        RpcError::new(
            ErrorCode::InvalidParams,
            format!("Invalid parameters for {method}: {e}"),
        )
    })
}

/// Map a filesystem failure to its RPC error.
fn domain_error(method: Method, path: &str, err: BrowseError) -> RpcError {
    match &err {
        BrowseError::Sandbox(_) => warn!(%method, path, error = %err, "sandbox violation"),
        BrowseError::NotFound { .. } => warn!(%method, path, error = %err, "not found"),
        BrowseError::PermissionDenied { .. } => warn!(%method, path, error = %err, "permission denied"),
        BrowseError::SizeLimitExceeded { size, .. } => {
            warn!(%method, path, size, error = %err, "size limit exceeded")
        }
        BrowseError::Io { .. } => error!(%method, path, error = %err, "filesystem error"),
    }
    RpcError::new(ErrorCode::ServerError, err.to_string())
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| {
        error!(error = %e, "failed to serialize result");
        RpcError::new(ErrorCode::InternalError, e.to_string())
    })
}
