// SPDX-License-Identifier: MIT OR Apache-2.0
//! Actor base: ties identity, storage, and the work-handler registry
//! together into the object a binding's business logic wraps.

use crate::identity::ActorIdentity;
use crate::queue::WorkHandlerRegistry;
use crate::storage::ActorStorage;
use std::sync::Arc;

/// The runtime scaffolding every durable actor instance embeds: its
/// identity, its storage handle, and the process-wide work-handler
/// registry shared across all instances of the same binding.
///
/// Cheaply `Clone`: every field is an `Arc`, so a clone can be captured by
/// a spawned task (needed for the `__receiveResult` processed-marker TTL
/// sweep) without borrowing the original.
#[derive(Clone)]
pub struct ActorBase {
    identity: Arc<ActorIdentity>,
    storage: Arc<dyn ActorStorage>,
    work_handlers: Arc<WorkHandlerRegistry>,
}

impl ActorBase {
    /// Construct a new actor base.
    #[must_use]
    pub fn new(
        identity: Arc<ActorIdentity>,
        storage: Arc<dyn ActorStorage>,
        work_handlers: Arc<WorkHandlerRegistry>,
    ) -> Self {
        Self {
            identity,
            storage,
            work_handlers,
        }
    }

    /// This instance's identity.
    #[must_use]
    pub fn identity(&self) -> &ActorIdentity {
        &self.identity
    }

    /// This instance's storage handle.
    #[must_use]
    pub fn storage(&self) -> &dyn ActorStorage {
        self.storage.as_ref()
    }

    /// A clone of the storage `Arc`, for callers (like the mailbox TTL
    /// sweep) that need a `'static` handle.
    #[must_use]
    pub fn storage_handle(&self) -> Arc<dyn ActorStorage> {
        self.storage.clone()
    }

    /// The shared work-handler registry.
    #[must_use]
    pub fn work_handlers(&self) -> &WorkHandlerRegistry {
        &self.work_handlers
    }
}
