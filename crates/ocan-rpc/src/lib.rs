// SPDX-License-Identifier: MIT OR Apache-2.0
//! MCP-style JSON-RPC dispatcher: transport-agnostic request routing
//! over the tool registry, entity-type registry, temporal store, and
//! subscription engine.

mod connection;
mod dispatcher;
mod message;

pub use connection::ConnectionState;
pub use dispatcher::{Dispatcher, SUPPORTED_PROTOCOL_VERSION};
pub use message::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpEnvelopeKind, TransportEnvelope};
