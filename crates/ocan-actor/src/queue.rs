// SPDX-License-Identifier: MIT OR Apache-2.0
//! Durable work queue (`__enqueueWork`) and the process-wide, write-once
//! work-handler registry.

use crate::actor::ActorBase;
use crate::storage::ActorStorage;
use ocan_error::OcanResult;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A handler invoked once per queued work item. Returning `Err` leaves the
/// item in the queue for later inspection — there is no automatic retry.
pub trait WorkHandler: Send + Sync {
    /// Handle one item of `work_type`.
    fn handle(&self, actor: &ActorBase, work_id: &str, data: &serde_json::Value) -> OcanResult<()>;
}

/// Process-wide registry of work-type handlers.
///
/// Write-once at module load, matching the design's inversion-of-control
/// container: registrations happen once at startup, lookups are lock-free
/// in spirit (a read-biased `RwLock` here, since Rust has no process-wide
/// "frozen after load" enforcement without `OnceLock`-per-entry
/// bookkeeping this registry doesn't need).
#[derive(Default)]
pub struct WorkHandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn WorkHandler>>>,
}

impl WorkHandlerRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for `work_type`. Call once per
    /// work type at startup.
    pub fn register(&self, work_type: impl Into<String>, handler: Arc<dyn WorkHandler>) {
        self.handlers.write().unwrap().insert(work_type.into(), handler);
    }

    /// Look up the handler for `work_type`, if registered.
    #[must_use]
    pub fn lookup(&self, work_type: &str) -> Option<Arc<dyn WorkHandler>> {
        self.handlers.read().unwrap().get(work_type).cloned()
    }
}

/// Key an item of `(work_type, work_id)` is persisted under.
#[must_use]
pub fn queue_key(work_type: &str, work_id: &str) -> String {
    format!("queue:{work_type}:{work_id}")
}

/// `__enqueueWork`: persist `data` at `queue:<work_type>:<work_id>`, then
/// drain all queued items for `work_type`.
pub fn enqueue_work(
    storage: &dyn ActorStorage,
    registry: &WorkHandlerRegistry,
    actor: &ActorBase,
    work_type: &str,
    work_id: &str,
    data: serde_json::Value,
) -> OcanResult<()> {
    storage.put(&queue_key(work_type, work_id), data)?;
    drain_work(storage, registry, actor, work_type)
}

/// Drain every item currently queued for `work_type`: look up the
/// registered handler, invoke it with `(actor, work_id, data)`, delete the
/// key on success. A throwing handler leaves its item in place and is
/// logged, not retried automatically.
pub fn drain_work(
    storage: &dyn ActorStorage,
    registry: &WorkHandlerRegistry,
    actor: &ActorBase,
    work_type: &str,
) -> OcanResult<()> {
    let prefix = format!("queue:{work_type}:");
    let items = storage.list_prefix(&prefix)?;

    let Some(handler) = registry.lookup(work_type) else {
        if !items.is_empty() {
            tracing::warn!(work_type, "no handler registered; leaving items queued");
        }
        return Ok(());
    };

    for (key, data) in items {
        let work_id = key.strip_prefix(&prefix).unwrap_or(&key);
        match handler.handle(actor, work_id, &data) {
            Ok(()) => {
                storage.delete(&key)?;
            }
            Err(err) => {
                tracing::warn!(work_type, work_id, error = %err, "work handler failed; leaving item queued");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ActorIdentity;
    use crate::storage::InMemoryStorage;
    use ocan_error::{ErrorCode, OcanError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
        fail_until: usize,
    }

    impl WorkHandler for CountingHandler {
        fn handle(&self, _actor: &ActorBase, _work_id: &str, _data: &serde_json::Value) -> OcanResult<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_until {
                Err(OcanError::new(ErrorCode::ToolExecution, "simulated failure"))
            } else {
                Ok(())
            }
        }
    }

    fn actor() -> ActorBase {
        ActorBase::new(
            Arc::new(ActorIdentity::new("id1")),
            Arc::new(InMemoryStorage::new()),
            Arc::new(WorkHandlerRegistry::new()),
        )
    }

    #[test]
    fn successful_handler_removes_item() {
        let storage = InMemoryStorage::new();
        let registry = WorkHandlerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        registry.register("t", Arc::new(CountingHandler { calls: calls.clone(), fail_until: 0 }));
        let actor = actor();

        enqueue_work(&storage, &registry, &actor, "t", "w1", serde_json::json!({"k": 1})).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(storage.get("queue:t:w1").unwrap(), None);
    }

    #[test]
    fn failing_handler_leaves_item_queued() {
        let storage = InMemoryStorage::new();
        let registry = WorkHandlerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        registry.register("t", Arc::new(CountingHandler { calls, fail_until: 10 }));
        let actor = actor();

        enqueue_work(&storage, &registry, &actor, "t", "w1", serde_json::json!(1)).unwrap();

        assert!(storage.get("queue:t:w1").unwrap().is_some());
    }

    #[test]
    fn missing_handler_leaves_items_queued() {
        let storage = InMemoryStorage::new();
        let registry = WorkHandlerRegistry::new();
        let actor = actor();
        enqueue_work(&storage, &registry, &actor, "unregistered", "w1", serde_json::json!(1)).unwrap();
        assert!(storage.get("queue:unregistered:w1").unwrap().is_some());
    }
}
