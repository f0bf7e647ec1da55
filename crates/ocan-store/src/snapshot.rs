// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bitemporal snapshot shape: primary key `(entityId, validFrom)`.

use chrono::{DateTime, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Marks the snapshot that is currently live for an entity.
///
/// At most one snapshot per entity carries this `validTo`.
#[must_use]
pub fn sentinel_valid_to() -> DateTime<Utc> {
    static CELL: OnceLock<DateTime<Utc>> = OnceLock::new();
    *CELL.get_or_init(|| {
        Utc.with_ymd_and_hms(9999, 1, 1, 0, 0, 0)
            .single()
            .expect("9999-01-01T00:00:00Z is a valid instant")
    })
}

/// One bitemporal version of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EntitySnapshot {
    /// The entity this snapshot belongs to.
    pub entity_id: String,
    /// Start of this version's valid-time interval.
    #[schemars(with = "String")]
    pub valid_from: DateTime<Utc>,
    /// End of this version's valid-time interval; [`sentinel_valid_to`] while current.
    #[schemars(with = "String")]
    pub valid_to: DateTime<Utc>,
    /// Opaque caller-supplied attribution for this change.
    pub changed_by: Value,
    /// Reverse merge-patch from this snapshot's value back to the prior one.
    pub previous_values: Value,
    /// The entity's value as of this version.
    pub value: Value,
    /// True if this version is a tombstone.
    pub deleted: bool,
    /// Parent entity id, inherited from the prior snapshot when omitted on update.
    pub parent_id: Option<String>,
    /// Registered entity-type name this snapshot conforms to.
    pub entity_type_name: String,
    /// Registered entity-type version this snapshot conforms to.
    pub entity_type_version: u32,
}

impl EntitySnapshot {
    /// True if this is the live snapshot (carries the sentinel `validTo`).
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.valid_to == sentinel_valid_to()
    }
}

pub(crate) fn empty_object() -> Value {
    Value::Object(Map::new())
}

pub(crate) fn is_empty_object(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty())
}
