// SPDX-License-Identifier: MIT OR Apache-2.0
//! MCP-style JSON-RPC dispatcher: routes the seven supported
//! methods against the registries, store, and subscription engine, and
//! gates everything but `initialize` on a completed handshake.

use crate::connection::ConnectionState;
use crate::message::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use chrono::{DateTime, Utc};
use ocan_error::{ErrorCode, OcanError, OcanResult};
use ocan_registry::{EntityTypeRegistry, ToolRegistry};
use ocan_store::TemporalStore;
use ocan_subscriptions::{current_payload, patch_payload, read_resource_result, SubscriptionEngine};
use ocan_uri::{parse_entity_uri, ParsedUri};
use serde_json::{json, Value};
use std::sync::Arc;

/// The protocol version this server negotiates during `initialize`.
pub const SUPPORTED_PROTOCOL_VERSION: &str = "2024-11-05";

/// Wires together the components C10 routes against.
pub struct Dispatcher {
    pub tools: Arc<ToolRegistry>,
    pub entity_types: Arc<EntityTypeRegistry>,
    pub store: Arc<TemporalStore>,
    pub subscriptions: Arc<SubscriptionEngine>,
    pub server_name: String,
    pub server_version: String,
}

impl Dispatcher {
    /// Handle one JSON-RPC message against `conn`. Returns `None` for
    /// notifications (no response expected).
    pub fn handle(&self, conn: &mut ConnectionState, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let is_notification = request.is_notification();

        if request.method == "notifications/initialized" {
            conn.mark_initialized();
            return None;
        }

        if request.method != "initialize" && !conn.is_initialized() {
            return respond(request.id.clone(), is_notification, Err(OcanError::new(
                ErrorCode::InitializationRequired,
                "method called before the MCP handshake completed",
            )));
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(conn, request.params),
            "tools/list" => Ok(self.handle_tools_list()),
            "tools/call" => self.handle_tools_call(request.params),
            "resources/templates/list" => Ok(self.handle_templates_list()),
            "resources/read" => self.handle_resources_read(request.params),
            "resources/subscribe" => self.handle_resources_subscribe(&conn.subscriber_id, request.params),
            "resources/unsubscribe" => self.handle_resources_unsubscribe(&conn.subscriber_id, request.params),
            _ => Err(OcanError::new(ErrorCode::ToolNotFound, "unknown JSON-RPC method")
                .with_context("method", request.method.clone())),
        };

        respond(request.id, is_notification, result)
    }

    fn handle_initialize(&self, conn: &mut ConnectionState, params: Option<Value>) -> OcanResult<Value> {
        conn.mark_initialize_received();
        let requested_version = params
            .as_ref()
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
            .ok_or_else(|| OcanError::new(ErrorCode::ParameterValidation, "initialize params must include protocolVersion"))?;

        if requested_version != SUPPORTED_PROTOCOL_VERSION {
            return Err(OcanError::new(ErrorCode::EnvelopeVersionMismatch, "unsupported MCP protocolVersion")
                .with_context("requested", requested_version)
                .with_context("supported", SUPPORTED_PROTOCOL_VERSION));
        }

        Ok(json!({
            "protocolVersion": SUPPORTED_PROTOCOL_VERSION,
            "capabilities": {"tools": {"listChanged": false}, "resources": {"subscribe": true}},
            "serverInfo": {"name": self.server_name, "version": self.server_version},
        }))
    }

    fn handle_tools_list(&self) -> Value {
        let tools: Vec<Value> = self
            .tools
            .list()
            .into_iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema,
                    "outputSchema": t.output_schema,
                    "annotations": t.annotations,
                })
            })
            .collect();
        json!({"tools": tools})
    }

    fn handle_tools_call(&self, params: Option<Value>) -> OcanResult<Value> {
        let params = params.ok_or_else(|| OcanError::new(ErrorCode::ParameterValidation, "tools/call requires params"))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| OcanError::new(ErrorCode::ParameterValidation, "tools/call requires params.name"))?;
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
        self.tools.call(name, arguments)
    }

    fn handle_templates_list(&self) -> Value {
        json!({"resourceTemplates": [
            {"uriTemplate": "https://{domain}/universe/{universe}/galaxy/{galaxy}/star/{star}/entity/{id}", "name": "current"},
            {"uriTemplate": "https://{domain}/universe/{universe}/galaxy/{galaxy}/star/{star}/entity/{id}/patch", "name": "patch_subscription"},
            {"uriTemplate": "https://{domain}/universe/{universe}/galaxy/{galaxy}/star/{star}/entity/{id}/patch/{baseline}", "name": "patch_read"},
            {"uriTemplate": "https://{domain}/universe/{universe}/galaxy/{galaxy}/star/{star}/entity/{id}/at/{timestamp}", "name": "historical"},
            {"uriTemplate": "https://{domain}/universe/{universe}/galaxy/{galaxy}/star/{star}/entity-types", "name": "registry"},
        ]})
    }

    fn handle_resources_read(&self, params: Option<Value>) -> OcanResult<Value> {
        let uri = extract_uri(params.as_ref())?;
        let parsed = parse_entity_uri(&uri)?;
        let data = match parsed {
            ParsedUri::Current(p) => current_payload(&self.store.read_current(&p.id)?),
            ParsedUri::Historical { params, timestamp } => {
                let at: DateTime<Utc> = timestamp
                    .parse()
                    .map_err(|_| OcanError::new(ErrorCode::InvalidUri, "timestamp is not a valid instant"))?;
                current_payload(&self.store.read_historical(&params.id, at)?)
            }
            ParsedUri::PatchRead { params, baseline } => {
                let baseline: DateTime<Utc> = baseline
                    .parse()
                    .map_err(|_| OcanError::new(ErrorCode::InvalidUri, "baseline is not a valid instant"))?;
                let (patch, baseline) = self.store.read_patch(&params.id, baseline)?;
                let current = self.store.read_current(&params.id)?;
                patch_payload(&current, patch, Some(baseline))
            }
            ParsedUri::PatchSubscription(p) => current_payload(&self.store.read_current(&p.id)?),
            ParsedUri::Registry(_) => json!({
                "entityTypes": self.entity_types.list().into_iter().map(|d| json!({
                    "name": d.name, "version": d.version, "jsonSchema": d.json_schema, "description": d.description,
                })).collect::<Vec<_>>(),
            }),
        };
        Ok(read_resource_result(&uri, data))
    }

    fn handle_resources_subscribe(&self, subscriber_id: &str, params: Option<Value>) -> OcanResult<Value> {
        let uri = extract_uri(params.as_ref())?;
        let baseline = params
            .as_ref()
            .and_then(|p| p.get("initialBaseline"))
            .and_then(Value::as_str)
            .map(|s| {
                s.parse::<DateTime<Utc>>()
                    .map_err(|_| OcanError::new(ErrorCode::InvalidUri, "initialBaseline is not a valid instant"))
            })
            .transpose()?;
        self.subscriptions.subscribe(&self.store, subscriber_id, &uri, baseline)
    }

    fn handle_resources_unsubscribe(&self, subscriber_id: &str, params: Option<Value>) -> OcanResult<Value> {
        let uri = extract_uri(params.as_ref())?;
        Ok(self.subscriptions.unsubscribe(subscriber_id, &uri))
    }
}

fn extract_uri(params: Option<&Value>) -> OcanResult<String> {
    params
        .and_then(|p| p.get("uri"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| OcanError::new(ErrorCode::ParameterValidation, "params.uri is required"))
}

fn respond(id: Option<Value>, is_notification: bool, result: OcanResult<Value>) -> Option<JsonRpcResponse> {
    if is_notification {
        if let Err(err) = &result {
            tracing::warn!(error = %err, "notification handler returned an error; dropping (no response channel)");
        }
        return None;
    }
    let id = id.unwrap_or(Value::Null);
    Some(match result {
        Ok(value) => JsonRpcResponse::ok(id, value),
        Err(err) => JsonRpcResponse::err(id, JsonRpcError::from(&err)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocan_registry::ToolHandler;
    use ocan_store::{Mutation, PermissiveValidator, UpsertRequest};
    use ocan_subscriptions::RecordingSink;
    use serde_json::json;

    fn dispatcher() -> Dispatcher {
        let store = Arc::new(TemporalStore::new(Arc::new(PermissiveValidator)));
        store
            .upsert(UpsertRequest {
                entity_id: "u1".into(),
                entity_type_name: "user".into(),
                entity_type_version: 1,
                mutation: Mutation::Value(json!({"name": "alice"})),
                changed_by: json!({"userId": "t"}),
                parent_id: Some("root".into()),
                valid_from: None,
                valid_to: None,
            })
            .unwrap();

        let tools = Arc::new(ToolRegistry::new());
        let echo: ToolHandler = Arc::new(|args| Ok(args));
        tools
            .register("echo", None, json!({"type": "object"}), None, None, echo)
            .unwrap();

        Dispatcher {
            tools,
            entity_types: Arc::new(EntityTypeRegistry::new()),
            store,
            subscriptions: Arc::new(SubscriptionEngine::new(Arc::new(RecordingSink::default()))),
            server_name: "ocan-daemon".into(),
            server_version: "0.1.0".into(),
        }
    }

    fn request(id: i64, method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest { jsonrpc: "2.0".into(), id: Some(json!(id)), method: method.into(), params }
    }

    #[test]
    fn non_initialize_method_before_handshake_is_rejected() {
        let dispatcher = dispatcher();
        let mut conn = ConnectionState::new("sub1", None);
        let response = dispatcher.handle(&mut conn, request(1, "tools/list", None)).unwrap();
        assert_eq!(response.error.unwrap().code, ErrorCode::InitializationRequired.json_rpc_code());
    }

    #[test]
    fn full_handshake_then_tools_list() {
        let dispatcher = dispatcher();
        let mut conn = ConnectionState::new("sub1", None);
        let init = dispatcher
            .handle(&mut conn, request(1, "initialize", Some(json!({"protocolVersion": SUPPORTED_PROTOCOL_VERSION}))))
            .unwrap();
        assert!(init.error.is_none());
        assert!(!conn.is_initialized());

        let notify = JsonRpcRequest { jsonrpc: "2.0".into(), id: None, method: "notifications/initialized".into(), params: None };
        assert!(dispatcher.handle(&mut conn, notify).is_none());
        assert!(conn.is_initialized());

        let response = dispatcher.handle(&mut conn, request(2, "tools/list", None)).unwrap();
        assert_eq!(response.result.unwrap()["tools"][0]["name"], "echo");
    }

    #[test]
    fn mismatched_protocol_version_is_rejected() {
        let dispatcher = dispatcher();
        let mut conn = ConnectionState::new("sub1", None);
        let response = dispatcher
            .handle(&mut conn, request(1, "initialize", Some(json!({"protocolVersion": "0.0.1"}))))
            .unwrap();
        assert_eq!(response.error.unwrap().code, ErrorCode::EnvelopeVersionMismatch.json_rpc_code());
    }

    fn initialized_conn(dispatcher: &Dispatcher) -> ConnectionState {
        let mut conn = ConnectionState::new("sub1", None);
        dispatcher
            .handle(&mut conn, request(1, "initialize", Some(json!({"protocolVersion": SUPPORTED_PROTOCOL_VERSION}))))
            .unwrap();
        let notify = JsonRpcRequest { jsonrpc: "2.0".into(), id: None, method: "notifications/initialized".into(), params: None };
        assert!(dispatcher.handle(&mut conn, notify).is_none());
        conn
    }

    #[test]
    fn resources_read_current_returns_value() {
        let dispatcher = dispatcher();
        let mut conn = initialized_conn(&dispatcher);
        let uri = "https://example.com/universe/u/galaxy/g/star/s/entity/u1";
        let response = dispatcher
            .handle(&mut conn, request(3, "resources/read", Some(json!({"uri": uri}))))
            .unwrap();
        assert_eq!(response.result.unwrap()["data"]["value"]["name"], "alice");
    }

    #[test]
    fn resources_subscribe_then_unsubscribe() {
        let dispatcher = dispatcher();
        let mut conn = initialized_conn(&dispatcher);
        let uri = "https://example.com/universe/u/galaxy/g/star/s/entity/u1";
        let sub = dispatcher
            .handle(&mut conn, request(4, "resources/subscribe", Some(json!({"uri": uri}))))
            .unwrap();
        assert!(sub.error.is_none());
        assert_eq!(dispatcher.subscriptions.subscription_count(), 1);

        let unsub = dispatcher
            .handle(&mut conn, request(5, "resources/unsubscribe", Some(json!({"uri": uri}))))
            .unwrap();
        assert_eq!(unsub.result.unwrap()["unsubscribed"], json!(true));
    }

    #[test]
    fn unknown_method_is_method_not_found() {
        let dispatcher = dispatcher();
        let mut conn = initialized_conn(&dispatcher);
        let response = dispatcher.handle(&mut conn, request(6, "bogus/method", None)).unwrap();
        assert_eq!(response.error.unwrap().code, -32601);
    }
}
