// SPDX-License-Identifier: MIT OR Apache-2.0
//! Actor identity: write-once `bindingName`/`instanceName`, read-only `id`,
//! and derived `instanceNameOrId`.

use ocan_error::{ErrorCode, OcanError, OcanResult};
use ocan_protocol::CalleeIdentity;
use std::sync::RwLock;

/// Per-instance identity. `id` is fixed at construction (assigned by the
/// host platform); `binding_name` and `instance_name` are write-once:
/// committing a value and later attempting to commit a different one is a
/// permanent [`ErrorCode::IdentityConflict`].
#[derive(Debug)]
pub struct ActorIdentity {
    id: String,
    binding_name: RwLock<Option<String>>,
    instance_name: RwLock<Option<String>>,
}

impl ActorIdentity {
    /// Create an identity with only the platform-assigned `id` known.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            binding_name: RwLock::new(None),
            instance_name: RwLock::new(None),
        }
    }

    /// The platform-assigned id. Never changes.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The committed binding name, if any.
    #[must_use]
    pub fn binding_name(&self) -> Option<String> {
        self.binding_name.read().unwrap().clone()
    }

    /// The committed instance name, if any.
    #[must_use]
    pub fn instance_name(&self) -> Option<String> {
        self.instance_name.read().unwrap().clone()
    }

    /// Prefers the committed instance name, falling back to `id`.
    #[must_use]
    pub fn instance_name_or_id(&self) -> String {
        self.instance_name().unwrap_or_else(|| self.id.clone())
    }

    /// Commit `binding_name`. Idempotent if the same value is committed
    /// again; fails with [`ErrorCode::IdentityConflict`] on a conflicting
    /// later write.
    pub fn set_binding_name(&self, binding_name: &str) -> OcanResult<()> {
        commit_once(&self.binding_name, binding_name, "bindingName")
    }

    /// Commit `instance_name`. Same write-once discipline as
    /// [`Self::set_binding_name`].
    pub fn set_instance_name(&self, instance_name: &str) -> OcanResult<()> {
        commit_once(&self.instance_name, instance_name, "instanceName")
    }

    /// Auto-initialize from an incoming envelope's callee metadata
    /// (highest precedence: first writer on the first `__executeOperation`
    /// wins).
    pub fn auto_init_from_envelope(&self, callee: &CalleeIdentity) -> OcanResult<()> {
        self.set_binding_name(&callee.binding_name)?;
        if let Some(ref instance) = callee.instance_name_or_id {
            self.set_instance_name(instance)?;
        }
        Ok(())
    }

    /// Auto-initialize from fetch headers (second precedence).
    pub fn auto_init_from_headers(&self, binding_name: &str, instance_name_or_id: &str) -> OcanResult<()> {
        self.set_binding_name(binding_name)?;
        self.set_instance_name(instance_name_or_id)?;
        Ok(())
    }

    /// Explicit `init()` call (lowest precedence; only wins if nothing else
    /// has committed yet).
    pub fn init(&self, binding_name: &str, instance_name_or_id: &str) -> OcanResult<()> {
        self.set_binding_name(binding_name)?;
        self.set_instance_name(instance_name_or_id)?;
        Ok(())
    }
}

fn commit_once(slot: &RwLock<Option<String>>, value: &str, field: &str) -> OcanResult<()> {
    let mut guard = slot.write().unwrap();
    match guard.as_deref() {
        Some(existing) if existing == value => Ok(()),
        Some(existing) => Err(OcanError::new(
            ErrorCode::IdentityConflict,
            format!("{field} is already committed to \"{existing}\"; cannot change to \"{value}\""),
        )
        .with_context("field", field)
        .with_context("existing", existing)
        .with_context("attempted", value)),
        None => {
            *guard = Some(value.to_string());
            Ok(())
        }
    }
}
