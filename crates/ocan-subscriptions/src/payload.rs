// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared JSON shaping for `current`/`patch` notification and read payloads.

use chrono::{DateTime, Utc};
use ocan_store::EntitySnapshot;
use serde_json::{json, Map, Value};

fn base_fields(snapshot: &EntitySnapshot) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("entityId".into(), json!(snapshot.entity_id));
    map.insert("validFrom".into(), json!(snapshot.valid_from.to_rfc3339()));
    map.insert("validTo".into(), json!(snapshot.valid_to.to_rfc3339()));
    map.insert("changedBy".into(), snapshot.changed_by.clone());
    map.insert("deleted".into(), json!(snapshot.deleted));
    map.insert("parentId".into(), json!(snapshot.parent_id));
    map.insert("entityTypeName".into(), json!(snapshot.entity_type_name));
    map.insert("entityTypeVersion".into(), json!(snapshot.entity_type_version));
    map
}

/// Payload for a `current` subscription: the full value.
pub fn current_payload(snapshot: &EntitySnapshot) -> Value {
    let mut map = base_fields(snapshot);
    map.insert("value".into(), snapshot.value.clone());
    Value::Object(map)
}

/// Payload for a `patch` subscription: `value` is replaced by `{patch, baseline}`.
pub fn patch_payload(snapshot: &EntitySnapshot, patch: Value, baseline: Option<DateTime<Utc>>) -> Value {
    let mut map = base_fields(snapshot);
    map.insert("patch".into(), patch);
    map.insert("baseline".into(), baseline.map_or(Value::Null, |b| json!(b.to_rfc3339())));
    Value::Object(map)
}

/// The `ReadResourceResult` shape: identical whether it comes from
/// `resources/read` or the immediate response to `resources/subscribe`.
pub fn read_resource_result(uri: &str, data: Value) -> Value {
    json!({"uri": uri, "data": data})
}

/// Wraps a `ReadResourceResult` as an MCP `notifications/resources/updated` message.
pub fn update_notification(result: Value) -> Value {
    json!({"method": "notifications/resources/updated", "params": result})
}
