// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pending-continuation mailbox (`__receiveResult`): at-most-once handler
//! execution for async call results.

use crate::actor::ActorBase;
use ocan_chain::{execute_operation_chain, replace_nested_operation_markers, ChainTarget, OperationChain};
use ocan_error::{ErrorCode, OcanError, OcanResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The stored record at `<workType>_pending:<workId>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PendingContinuationRecord {
    continuation: OperationChain,
}

fn pending_key(work_type: &str, work_id: &str) -> String {
    format!("{work_type}_pending:{work_id}")
}

fn processed_key(work_type: &str, work_id: &str) -> String {
    format!("result_processed:{work_type}:{work_id}")
}

/// Stash a handler continuation to be resumed when the async result for
/// `(work_type, work_id)` arrives.
pub fn store_pending_continuation(
    actor: &ActorBase,
    work_type: &str,
    work_id: &str,
    continuation: OperationChain,
) -> OcanResult<()> {
    let record = PendingContinuationRecord { continuation };
    let value = serde_json::to_value(record)
        .map_err(|e| OcanError::new(ErrorCode::ToolExecution, format!("failed to serialize pending continuation: {e}")))?;
    actor.storage().put(&pending_key(work_type, work_id), value)
}

/// `__receiveResult(workType, workId, preprocessedResult)`.
///
/// If the processed marker already exists, this is a duplicate delivery
/// and is dropped. Otherwise the marker is written *before* executing the
/// continuation (so a racing duplicate delivery sees it and drops),
/// `$result` is substituted into the stored continuation, the continuation
/// runs against `target`, and the pending entry is removed. Returns
/// without error in the "no pending continuation" and "duplicate" cases —
/// both are routine, logged outcomes, not failures.
pub fn receive_result(
    actor: &ActorBase,
    work_type: &str,
    work_id: &str,
    preprocessed_result: &serde_json::Value,
    target: &mut dyn ChainTarget,
    processed_marker_ttl: Duration,
) -> OcanResult<()> {
    let processed = processed_key(work_type, work_id);

    if actor.storage().get(&processed)?.is_some() {
        tracing::debug!(work_type, work_id, "duplicate result delivery, dropping");
        return Ok(());
    }

    // Marker-before-execute: guarantees at-most-once even if a retry races
    // a timeout-fired fallback.
    actor
        .storage()
        .put(&processed, serde_json::json!(chrono::Utc::now().to_rfc3339()))?;

    let pending = pending_key(work_type, work_id);
    let Some(stored) = actor.storage().get(&pending)? else {
        tracing::warn!(work_type, work_id, "no pending continuation for result, dropping");
        return Ok(());
    };
    let record: PendingContinuationRecord = serde_json::from_value(stored)
        .map_err(|e| OcanError::new(ErrorCode::ToolExecution, format!("failed to deserialize pending continuation: {e}")))?;

    let substituted = replace_nested_operation_markers(&record.continuation, preprocessed_result);
    execute_operation_chain(&substituted, target)?;

    actor.storage().delete(&pending)?;
    schedule_processed_marker_cleanup(actor, work_type, work_id, processed_marker_ttl);
    Ok(())
}

/// Schedule removal of the processed marker after `ttl` (default 5
/// minutes, configurable). Spawned as a detached task against a cloned,
/// `'static` actor handle.
fn schedule_processed_marker_cleanup(actor: &ActorBase, work_type: &str, work_id: &str, ttl: Duration) {
    let storage = actor.storage_handle();
    let key = processed_key(work_type, work_id);
    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        if let Err(err) = storage.delete(&key) {
            tracing::warn!(error = %err, key, "failed to clean up processed marker");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ActorIdentity;
    use crate::queue::WorkHandlerRegistry;
    use crate::storage::InMemoryStorage;
    use ocan_chain::{new_continuation, ChainArg};
    use ocan_error::{ErrorCode, OcanError};
    use std::sync::Arc;

    struct RecordingTarget {
        calls: Vec<(String, Vec<serde_json::Value>)>,
    }

    impl ChainTarget for RecordingTarget {
        fn get_property(&self, _path: &[String], _key: &str) -> OcanResult<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }
        fn call_method(
            &mut self,
            _path: &[String],
            key: &str,
            args: Vec<serde_json::Value>,
        ) -> OcanResult<serde_json::Value> {
            self.calls.push((key.to_string(), args));
            Ok(serde_json::Value::Null)
        }
    }

    fn actor() -> ActorBase {
        ActorBase::new(
            Arc::new(ActorIdentity::new("id1")),
            Arc::new(InMemoryStorage::new()),
            Arc::new(WorkHandlerRegistry::new()),
        )
    }

    #[tokio::test]
    async fn executes_pending_continuation_exactly_once() {
        let actor = actor();
        let continuation = new_continuation()
            .call("onResult", vec![ChainArg::ResultPlaceholder])
            .build();
        store_pending_continuation(&actor, "x", "id1", continuation).unwrap();

        let mut target = RecordingTarget { calls: vec![] };
        receive_result(&actor, "x", "id1", &serde_json::json!("payload"), &mut target, Duration::from_secs(300))
            .unwrap();
        assert_eq!(target.calls, vec![("onResult".to_string(), vec![serde_json::json!("payload")])]);

        // Second delivery: no further side effects.
        receive_result(&actor, "x", "id1", &serde_json::json!("payload"), &mut target, Duration::from_secs(300))
            .unwrap();
        assert_eq!(target.calls.len(), 1);
    }

    #[tokio::test]
    async fn missing_pending_continuation_is_a_no_op() {
        let actor = actor();
        let mut target = RecordingTarget { calls: vec![] };
        receive_result(&actor, "x", "missing", &serde_json::json!(1), &mut target, Duration::from_secs(300))
            .unwrap();
        assert!(target.calls.is_empty());
        // Still sets the processed marker so a later duplicate is dropped too.
        assert!(actor.storage().get(&processed_key("x", "missing")).unwrap().is_some());
    }

    #[tokio::test]
    async fn handler_execution_error_propagates() {
        struct FailingTarget;
        impl ChainTarget for FailingTarget {
            fn get_property(&self, _path: &[String], _key: &str) -> OcanResult<serde_json::Value> {
                Ok(serde_json::Value::Null)
            }
            fn call_method(
                &mut self,
                _path: &[String],
                _key: &str,
                _args: Vec<serde_json::Value>,
            ) -> OcanResult<serde_json::Value> {
                Err(OcanError::new(ErrorCode::ToolExecution, "boom"))
            }
        }
        let actor = actor();
        let continuation = new_continuation().call("onResult", vec![]).build();
        store_pending_continuation(&actor, "x", "id1", continuation).unwrap();
        let mut target = FailingTarget;
        let err = receive_result(&actor, "x", "id1", &serde_json::json!(1), &mut target, Duration::from_secs(300))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ToolExecution);
    }
}
