//! Envelope compliance check, run before dispatch.

use crate::protocol::{JSONRPC_VERSION, is_scalar_or_null};
use serde_json::Value;

/// Decides whether a raw request is well-formed enough to dispatch.
pub trait RequestValidator: Clone + Send + Sync + 'static {
    fn check_compliance(&self, request: &Value) -> bool;
}

/// The minimum shape this server accepts.
///
/// Requires `jsonrpc: "2.0"` and an `id` (scalar or null). Notifications
/// without an id are rejected since every request gets a response.
/// `method` is left to the dispatcher so it can report "method not found".
#[derive(Debug, Clone, Copy, Default)]
pub struct McpCompliance;

impl RequestValidator for McpCompliance {
    fn check_compliance(&self, request: &Value) -> bool {
        let Some(object) = request.as_object() else {
            return false;
        };
        object.get("jsonrpc").and_then(Value::as_str) == Some(JSONRPC_VERSION)
            && object.get("id").is_some_and(is_scalar_or_null)
    }
}
