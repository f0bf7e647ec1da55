// SPDX-License-Identifier: MIT OR Apache-2.0
//! The temporal entity store itself: upsert, delete/undelete, and the
//! three read shapes (CURRENT / HISTORICAL / PATCH_READ).

use crate::merge_patch;
use crate::snapshot::{empty_object, is_empty_object, sentinel_valid_to, EntitySnapshot};
use crate::types::{ChangeEvent, ChangeObserver, EntityTypeValidator, Mutation, UpsertRequest};
use chrono::{DateTime, Duration, Utc};
use ocan_error::{ErrorCode, OcanError, OcanResult};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory bitemporal store, keyed by entity id.
///
/// Each entity's snapshots are kept in a `Vec` in strictly-increasing
/// `validFrom` order; the last element is always the current (sentinel)
/// snapshot, tombstoned or not.
pub struct TemporalStore {
    entities: RwLock<HashMap<String, Vec<EntitySnapshot>>>,
    validator: Arc<dyn EntityTypeValidator>,
    observers: RwLock<Vec<Arc<dyn ChangeObserver>>>,
}

impl TemporalStore {
    #[must_use]
    pub fn new(validator: Arc<dyn EntityTypeValidator>) -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            validator,
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn register_observer(&self, observer: Arc<dyn ChangeObserver>) {
        self.observers.write().expect("observer lock poisoned").push(observer);
    }

    fn notify(&self, event: ChangeEvent) {
        let observers = self.observers.read().expect("observer lock poisoned");
        for observer in observers.iter() {
            observer.on_change(&event);
        }
    }

    /// Create or update an entity. See module docs on [`UpsertRequest`] for
    /// field semantics.
    pub fn upsert(&self, req: UpsertRequest) -> OcanResult<EntitySnapshot> {
        self.require_latest_version(&req.entity_type_name, req.entity_type_version)?;

        let mut guard = self.entities.write().expect("store lock poisoned");
        let history = guard.entry(req.entity_id.clone()).or_default();

        match history.last().cloned() {
            None => {
                let Mutation::Value(value) = req.mutation else {
                    return Err(OcanError::new(
                        ErrorCode::EntityNotFound,
                        "cannot apply a patch to an entity that does not exist yet",
                    ));
                };
                let parent_id = req.parent_id.clone().ok_or_else(|| {
                    OcanError::new(ErrorCode::ParameterValidation, "parentId is required on creation")
                })?;
                self.validator.validate(&req.entity_type_name, req.entity_type_version, &value)?;
                let (valid_from, valid_to) = resolve_times(req.valid_from, req.valid_to, None)?;

                let snapshot = EntitySnapshot {
                    entity_id: req.entity_id.clone(),
                    valid_from,
                    valid_to,
                    changed_by: req.changed_by,
                    previous_values: empty_object(),
                    value,
                    deleted: false,
                    parent_id: Some(parent_id),
                    entity_type_name: req.entity_type_name,
                    entity_type_version: req.entity_type_version,
                };
                history.push(snapshot.clone());
                drop(guard);
                self.notify(ChangeEvent { new_snapshot: snapshot.clone(), old_value: None, old_valid_from: None });
                Ok(snapshot)
            }
            Some(current) => {
                let final_value = match &req.mutation {
                    Mutation::Value(value) => value.clone(),
                    Mutation::Patch { patch, baseline } => {
                        if *baseline != current.valid_from {
                            return Err(OcanError::new(ErrorCode::BaselineStale, "patch baseline does not match the current snapshot")
                                .with_context("expected", current.valid_from.to_rfc3339())
                                .with_context("got", baseline.to_rfc3339()));
                        }
                        merge_patch::apply(&current.value, patch)
                    }
                };

                let previous_values = merge_patch::generate(&final_value, &current.value);
                if is_empty_object(&previous_values) {
                    return Ok(current);
                }

                self.validator.validate(&req.entity_type_name, req.entity_type_version, &final_value)?;
                let (valid_from, valid_to) = resolve_times(req.valid_from, req.valid_to, Some(current.valid_from))?;
                let parent_id = req.parent_id.clone().or_else(|| current.parent_id.clone());

                let last = history.len() - 1;
                history[last].valid_to = valid_from;

                let snapshot = EntitySnapshot {
                    entity_id: req.entity_id,
                    valid_from,
                    valid_to,
                    changed_by: req.changed_by,
                    previous_values,
                    value: final_value,
                    deleted: false,
                    parent_id,
                    entity_type_name: req.entity_type_name,
                    entity_type_version: req.entity_type_version,
                };
                history.push(snapshot.clone());
                drop(guard);
                self.notify(ChangeEvent {
                    new_snapshot: snapshot.clone(),
                    old_value: Some(current.value),
                    old_valid_from: Some(current.valid_from),
                });
                Ok(snapshot)
            }
        }
    }

    fn set_deleted(
        &self,
        entity_id: &str,
        deleted: bool,
        changed_by: serde_json::Value,
        valid_from: Option<DateTime<Utc>>,
        valid_to: Option<DateTime<Utc>>,
    ) -> OcanResult<EntitySnapshot> {
        let mut guard = self.entities.write().expect("store lock poisoned");
        let history = guard
            .get_mut(entity_id)
            .ok_or_else(|| entity_not_found(entity_id))?;
        let current = history.last().cloned().ok_or_else(|| entity_not_found(entity_id))?;

        let (new_valid_from, new_valid_to) = resolve_times(valid_from, valid_to, Some(current.valid_from))?;
        let last = history.len() - 1;
        history[last].valid_to = new_valid_from;

        let snapshot = EntitySnapshot {
            entity_id: entity_id.to_string(),
            valid_from: new_valid_from,
            valid_to: new_valid_to,
            changed_by,
            previous_values: empty_object(),
            value: current.value.clone(),
            deleted,
            parent_id: current.parent_id.clone(),
            entity_type_name: current.entity_type_name.clone(),
            entity_type_version: current.entity_type_version,
        };
        history.push(snapshot.clone());
        drop(guard);
        self.notify(ChangeEvent {
            new_snapshot: snapshot.clone(),
            old_value: Some(current.value),
            old_valid_from: Some(current.valid_from),
        });
        Ok(snapshot)
    }

    pub fn delete(&self, entity_id: &str, changed_by: serde_json::Value) -> OcanResult<EntitySnapshot> {
        self.set_deleted(entity_id, true, changed_by, None, None)
    }

    pub fn undelete(&self, entity_id: &str, changed_by: serde_json::Value) -> OcanResult<EntitySnapshot> {
        self.set_deleted(entity_id, false, changed_by, None, None)
    }

    /// CURRENT read: the live snapshot. Fails if the entity doesn't exist or
    /// is tombstoned.
    pub fn read_current(&self, entity_id: &str) -> OcanResult<EntitySnapshot> {
        let guard = self.entities.read().expect("store lock poisoned");
        let current = guard
            .get(entity_id)
            .and_then(|history| history.last())
            .ok_or_else(|| entity_not_found(entity_id))?;
        reject_if_deleted(current)?;
        Ok(current.clone())
    }

    /// HISTORICAL read: the snapshot whose valid-time interval covers `at`.
    pub fn read_historical(&self, entity_id: &str, at: DateTime<Utc>) -> OcanResult<EntitySnapshot> {
        let guard = self.entities.read().expect("store lock poisoned");
        let history = guard.get(entity_id).ok_or_else(|| entity_not_found(entity_id))?;
        let snapshot = history
            .iter()
            .find(|s| s.valid_from <= at && at <= s.valid_to)
            .ok_or_else(|| {
                OcanError::new(ErrorCode::SnapshotNotFound, "no snapshot covers the requested instant")
                    .with_context("entity_id", entity_id)
                    .with_context("at", at.to_rfc3339())
            })?;
        reject_if_deleted(snapshot)?;
        Ok(snapshot.clone())
    }

    /// PATCH_READ: the RFC 7396 patch from the snapshot at `baseline` to the
    /// current value, plus the baseline it was computed against.
    pub fn read_patch(&self, entity_id: &str, baseline: DateTime<Utc>) -> OcanResult<(serde_json::Value, DateTime<Utc>)> {
        let guard = self.entities.read().expect("store lock poisoned");
        let history = guard.get(entity_id).ok_or_else(|| entity_not_found(entity_id))?;
        let from = history
            .iter()
            .find(|s| s.valid_from == baseline)
            .ok_or_else(|| {
                OcanError::new(ErrorCode::SnapshotNotFound, "no snapshot exists at the given baseline")
                    .with_context("entity_id", entity_id)
                    .with_context("baseline", baseline.to_rfc3339())
            })?;
        let current = history.last().expect("non-empty history has a last element");
        let patch = merge_patch::generate(&from.value, &current.value);
        Ok((patch, baseline))
    }

    /// All snapshots for an entity in `validFrom` order. Supplements the
    /// three shapes above; snapshots never disappear, so this is a
    /// straightforward full-history listing.
    pub fn history(&self, entity_id: &str) -> OcanResult<Vec<EntitySnapshot>> {
        let guard = self.entities.read().expect("store lock poisoned");
        guard
            .get(entity_id)
            .cloned()
            .ok_or_else(|| entity_not_found(entity_id))
    }

    fn require_latest_version(&self, name: &str, version: u32) -> OcanResult<()> {
        match self.validator.latest_version(name) {
            None => Ok(()),
            Some(latest) if latest == version => Ok(()),
            Some(latest) => Err(OcanError::new(
                ErrorCode::EntityTypeNotFound,
                "only the latest registered entity-type version is accepted for upserts",
            )
            .with_context("entity_type_name", name)
            .with_context("requested_version", version)
            .with_context("latest_version", latest)),
        }
    }
}

fn entity_not_found(entity_id: &str) -> OcanError {
    OcanError::new(ErrorCode::EntityNotFound, "entity does not exist").with_context("entity_id", entity_id)
}

fn reject_if_deleted(snapshot: &EntitySnapshot) -> OcanResult<()> {
    if snapshot.deleted {
        Err(OcanError::new(ErrorCode::EntityDeleted, "entity is deleted")
            .with_context("entity_id", snapshot.entity_id.clone()))
    } else {
        Ok(())
    }
}

fn resolve_times(
    valid_from: Option<DateTime<Utc>>,
    valid_to: Option<DateTime<Utc>>,
    current_valid_from: Option<DateTime<Utc>>,
) -> OcanResult<(DateTime<Utc>, DateTime<Utc>)> {
    let (mut valid_from, valid_to) = match (valid_from, valid_to) {
        (None, None) => (Utc::now(), sentinel_valid_to()),
        (Some(from), Some(to)) => (from, to),
        _ => {
            return Err(OcanError::new(
                ErrorCode::ParameterValidation,
                "validFrom and validTo must both be set or both be omitted",
            ))
        }
    };

    if let Some(predecessor) = current_valid_from {
        while valid_from <= predecessor {
            valid_from += Duration::milliseconds(1);
        }
    }

    if valid_from >= valid_to {
        return Err(OcanError::new(ErrorCode::ParameterValidation, "validFrom must be strictly before validTo")
            .with_context("valid_from", valid_from.to_rfc3339())
            .with_context("valid_to", valid_to.to_rfc3339()));
    }

    Ok((valid_from, valid_to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{utc, PermissiveValidator};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store() -> TemporalStore {
        TemporalStore::new(Arc::new(PermissiveValidator))
    }

    fn create_req(entity_id: &str, value: serde_json::Value) -> UpsertRequest {
        UpsertRequest {
            entity_id: entity_id.to_string(),
            entity_type_name: "user".to_string(),
            entity_type_version: 1,
            mutation: Mutation::Value(value),
            changed_by: json!([{"userId": "t"}]),
            parent_id: Some("root".to_string()),
            valid_from: Some(utc("1970-01-01T00:00:00.000Z")),
            valid_to: None,
        }
    }

    #[test]
    fn bare_create_then_current_read() {
        let store = store();
        let req = UpsertRequest { valid_from: None, ..create_req("u1", json!({"name": "alice"})) };
        store.upsert(req).unwrap();

        let current = store.read_current("u1").unwrap();
        assert_eq!(current.value["name"], "alice");
        assert!(!current.deleted);
        assert!(current.is_current());
    }

    #[test]
    fn patch_with_stale_baseline_is_rejected() {
        let store = store();
        store.upsert(UpsertRequest { valid_from: None, ..create_req("u1", json!({"name": "alice"})) }).unwrap();

        let req = UpsertRequest {
            mutation: Mutation::Patch { patch: json!({"name": "bob"}), baseline: utc("1970-01-01T00:00:00.000Z") },
            valid_from: None,
            ..create_req("u1", json!(null))
        };
        let err = store.upsert(req).unwrap_err();
        assert_eq!(err.code, ErrorCode::BaselineStale);
        assert_eq!(store.read_current("u1").unwrap().value["name"], "alice");
    }

    #[test]
    fn correct_patch_then_patch_read() {
        let store = store();
        let created = store.upsert(create_req("u1", json!({"name": "alice"}))).unwrap();

        let patch_req = UpsertRequest {
            mutation: Mutation::Patch { patch: json!({"name": "bob"}), baseline: created.valid_from },
            valid_from: None,
            ..create_req("u1", json!(null))
        };
        store.upsert(patch_req).unwrap();

        let (patch, baseline) = store.read_patch("u1", created.valid_from).unwrap();
        assert_eq!(patch, json!({"name": "bob"}));
        assert_eq!(baseline, created.valid_from);
    }

    #[test]
    fn idempotent_upsert_is_a_no_op_on_identical_value() {
        let store = store();
        let first = store.upsert(create_req("u1", json!({"name": "alice"}))).unwrap();
        let second = store.upsert(UpsertRequest { valid_from: None, ..create_req("u1", json!({"name": "alice"})) }).unwrap();
        assert_eq!(first.valid_from, second.valid_from);
        assert_eq!(store.history("u1").unwrap().len(), 1);
    }

    #[test]
    fn valid_from_collision_advances_by_at_least_one_ms() {
        let store = store();
        let first = store.upsert(create_req("u1", json!({"name": "alice"}))).unwrap();
        let req = UpsertRequest {
            mutation: Mutation::Value(json!({"name": "bob"})),
            valid_from: Some(first.valid_from),
            ..create_req("u1", json!(null))
        };
        let second = store.upsert(req).unwrap();
        assert!(second.valid_from > first.valid_from);
    }

    #[test]
    fn delete_then_read_current_fails() {
        let store = store();
        store.upsert(create_req("u1", json!({"name": "alice"}))).unwrap();
        store.delete("u1", json!({"userId": "t"})).unwrap();
        let err = store.read_current("u1").unwrap_err();
        assert_eq!(err.code, ErrorCode::EntityDeleted);
    }

    #[test]
    fn undelete_restores_readability() {
        let store = store();
        store.upsert(create_req("u1", json!({"name": "alice"}))).unwrap();
        store.delete("u1", json!({"userId": "t"})).unwrap();
        store.undelete("u1", json!({"userId": "t"})).unwrap();
        assert!(store.read_current("u1").is_ok());
    }

    #[test]
    fn historical_read_covers_a_prior_interval() {
        let store = store();
        let first = store.upsert(create_req("u1", json!({"name": "alice"}))).unwrap();
        store
            .upsert(UpsertRequest {
                mutation: Mutation::Value(json!({"name": "bob"})),
                valid_from: None,
                ..create_req("u1", json!(null))
            })
            .unwrap();

        let historical = store.read_historical("u1", first.valid_from).unwrap();
        assert_eq!(historical.value["name"], "alice");
    }

    #[test]
    fn snapshots_never_disappear() {
        let store = store();
        store.upsert(create_req("u1", json!({"name": "alice"}))).unwrap();
        store
            .upsert(UpsertRequest {
                mutation: Mutation::Value(json!({"name": "bob"})),
                valid_from: None,
                ..create_req("u1", json!(null))
            })
            .unwrap();
        assert_eq!(store.history("u1").unwrap().len(), 2);
    }

    #[test]
    fn exactly_one_sentinel_snapshot_at_any_time() {
        let store = store();
        store.upsert(create_req("u1", json!({"name": "alice"}))).unwrap();
        store
            .upsert(UpsertRequest {
                mutation: Mutation::Value(json!({"name": "bob"})),
                valid_from: None,
                ..create_req("u1", json!(null))
            })
            .unwrap();
        let history = store.history("u1").unwrap();
        assert_eq!(history.iter().filter(|s| s.is_current()).count(), 1);
    }

    #[test]
    fn observers_are_notified_on_upsert() {
        let store = store();
        struct Counter(AtomicUsize);
        impl ChangeObserver for Counter {
            fn on_change(&self, _event: &ChangeEvent) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        store.register_observer(counter.clone());
        store.upsert(create_req("u1", json!({"name": "alice"}))).unwrap();
        store
            .upsert(UpsertRequest {
                mutation: Mutation::Value(json!({"name": "bob"})),
                valid_from: None,
                ..create_req("u1", json!(null))
            })
            .unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn creation_without_parent_id_is_rejected() {
        let store = store();
        let req = UpsertRequest { parent_id: None, ..create_req("u1", json!({"name": "alice"})) };
        let err = store.upsert(req).unwrap_err();
        assert_eq!(err.code, ErrorCode::ParameterValidation);
    }

    #[test]
    fn update_inherits_parent_id_when_omitted() {
        let store = store();
        store.upsert(create_req("u1", json!({"name": "alice"}))).unwrap();
        let req = UpsertRequest {
            mutation: Mutation::Value(json!({"name": "bob"})),
            parent_id: None,
            valid_from: None,
            ..create_req("u1", json!(null))
        };
        let snapshot = store.upsert(req).unwrap();
        assert_eq!(snapshot.parent_id.as_deref(), Some("root"));
    }
}
