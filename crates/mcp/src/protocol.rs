//! JSON-RPC 2.0 envelope types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC error codes used by this server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    /// Shared by every filesystem failure; the `data` text tells them apart.
    ServerError,
}

impl ErrorCode {
    pub fn code(self) -> i64 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::ServerError => -32000,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::ParseError => "Parse error",
            ErrorCode::InvalidRequest => "Invalid Request",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid params",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::ServerError => "Server error",
        }
    }
}

/// The `error` member of a failure response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// An error with the standard message for `code` and a human-readable
    /// detail in `data`.
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: code.message().to_owned(),
            data: Some(Value::String(detail.into())),
        }
    }
}

/// A response envelope: exactly one of `result` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RpcResponse {
    Success {
        jsonrpc: &'static str,
        result: Value,
        id: Value,
    },
    Failure {
        jsonrpc: &'static str,
        error: RpcError,
        id: Value,
    },
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        RpcResponse::Success {
            jsonrpc: JSONRPC_VERSION,
            result,
            id,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        RpcResponse::Failure {
            jsonrpc: JSONRPC_VERSION,
            error,
            id,
        }
    }

    pub fn id(&self) -> &Value {
        match self {
            RpcResponse::Success { id, .. } | RpcResponse::Failure { id, .. } => id,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            RpcResponse::Success { result, .. } => Some(result),
            RpcResponse::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&RpcError> {
        match self {
            RpcResponse::Success { .. } => None,
            RpcResponse::Failure { error, .. } => Some(error),
        }
    }
}

/// A request envelope, read after the compliance check has passed.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub method: Option<Value>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub id: Value,
}

/// The methods this server answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    ListDirectory,
    ReadFile,
    Search,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::ListDirectory => "fs.listDirectory",
            Method::ReadFile => "fs.readFile",
            Method::Search => "fs.search",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized method name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod;

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fs.listDirectory" => Ok(Method::ListDirectory),
            "fs.readFile" => Ok(Method::ReadFile),
            "fs.search" => Ok(Method::Search),
            _ => Err(UnknownMethod),
        }
    }
}

/// The id to echo back: the request's id when it is a scalar or null,
/// otherwise null.
pub fn correlation_id(request: &Value) -> Value {
    match request.get("id") {
        Some(id) if is_scalar_or_null(id) => id.clone(),
        _ => Value::Null,
    }
}

pub(crate) fn is_scalar_or_null(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}
