// SPDX-License-Identifier: MIT OR Apache-2.0
//! JSON-RPC 2.0 wire types, mirroring the MCP message shapes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC request or notification (no `id` ⇒ notification, no response expected).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A JSON-RPC response: success or error.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    #[must_use]
    pub fn ok(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0".into(), id, result: Some(result), error: None }
    }

    #[must_use]
    pub fn err(id: Value, error: JsonRpcError) -> Self {
        Self { jsonrpc: "2.0".into(), id, result: None, error: Some(error) }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<&ocan_error::OcanError> for JsonRpcError {
    fn from(err: &ocan_error::OcanError) -> Self {
        let dto = ocan_error::OcanErrorDto::from(err);
        Self {
            code: err.code.json_rpc_code(),
            message: err.message.clone(),
            data: serde_json::to_value(dto).ok(),
        }
    }
}

/// The `{type: "mcp", payload: ...}` wrapper, or a bare JSON-RPC message.
///
/// Accepting both forms simplifies transports that frame every socket
/// message uniformly vs. ones that speak raw JSON-RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransportEnvelope {
    Wrapped { #[serde(rename = "type")] kind: McpEnvelopeKind, payload: JsonRpcRequest },
    Bare(JsonRpcRequest),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum McpEnvelopeKind {
    Mcp,
}

impl TransportEnvelope {
    #[must_use]
    pub fn into_request(self) -> JsonRpcRequest {
        match self {
            Self::Wrapped { payload, .. } => payload,
            Self::Bare(request) => request,
        }
    }
}
