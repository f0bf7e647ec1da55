// SPDX-License-Identifier: MIT OR Apache-2.0
//! Request/observer seams: the pieces of the store that other components
//! plug into without the store depending on them directly.

use crate::snapshot::EntitySnapshot;
use chrono::{DateTime, Utc};
use ocan_error::OcanResult;
use serde_json::Value;

/// Either a full replacement value or a patch against a known baseline.
///
/// Modeling this as an enum (rather than two `Option` fields) makes the
/// "both given, or neither" rejection from the upsert contract
/// unrepresentable instead of a runtime check.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Replace the entity's value outright.
    Value(Value),
    /// Apply an RFC 7396 patch against the snapshot whose `validFrom`
    /// equals `baseline`.
    Patch { patch: Value, baseline: DateTime<Utc> },
}

/// An upsert request against the store.
#[derive(Debug, Clone)]
pub struct UpsertRequest {
    pub entity_id: String,
    pub entity_type_name: String,
    pub entity_type_version: u32,
    pub mutation: Mutation,
    pub changed_by: Value,
    /// Required on creation; inherited from the current snapshot on update
    /// when omitted.
    pub parent_id: Option<String>,
    /// Must be set together with `valid_to`, or both left `None`.
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
}

/// Validates that `(name, version)` is the latest registered entity type and
/// that a candidate value conforms to its schema.
///
/// Implemented by the entity-type registry; kept as a trait here so the
/// store never depends on the registry crate.
pub trait EntityTypeValidator: Send + Sync {
    /// The highest registered version for `name`, if any.
    fn latest_version(&self, name: &str) -> Option<u32>;
    /// Validate `value` against the registered schema for `(name, version)`.
    fn validate(&self, name: &str, version: u32, value: &Value) -> OcanResult<()>;
}

/// Accepts any value and never rejects a version; useful where no
/// entity-type registry is wired up yet (tests, early bring-up).
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissiveValidator;

impl EntityTypeValidator for PermissiveValidator {
    fn latest_version(&self, _name: &str) -> Option<u32> {
        None
    }

    fn validate(&self, _name: &str, _version: u32, _value: &Value) -> OcanResult<()> {
        Ok(())
    }
}

/// A committed change to an entity, handed to every registered observer.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub new_snapshot: EntitySnapshot,
    pub old_value: Option<Value>,
    pub old_valid_from: Option<DateTime<Utc>>,
}

/// Notified synchronously after a successful upsert/delete/undelete commits.
///
/// The subscription engine implements this; the store never depends on it
/// directly, so notification fanout stays outside the store's boundary.
pub trait ChangeObserver: Send + Sync {
    fn on_change(&self, event: &ChangeEvent);
}

#[cfg(test)]
pub(crate) fn utc(timestamp: &str) -> DateTime<Utc> {
    timestamp.parse().expect("test timestamp is valid RFC 3339")
}
