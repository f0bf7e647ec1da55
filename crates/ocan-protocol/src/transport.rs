// SPDX-License-Identifier: MIT OR Apache-2.0
//! `callRaw`: wraps a chain in a [`CallEnvelope`] and hands it to a
//! platform stub for local or remote delivery.

use async_trait::async_trait;
use ocan_chain::{IntoOperationChain, OperationChain};
use ocan_error::OcanResult;

use crate::envelope::{ActorKind, CalleeIdentity, CallEnvelope, CallerIdentity};

/// The platform's delivery primitive (`__executeOperation` in the
/// original design). Implementations route to a local actor instance or
/// serialize across the network to a remote one.
#[async_trait]
pub trait CallStub: Send + Sync {
    /// Deliver `envelope` to its callee and return the postprocessed
    /// result. Any value thrown during remote execution propagates with
    /// its original message.
    async fn execute_operation(&self, envelope: CallEnvelope) -> OcanResult<serde_json::Value>;
}

/// Something that can report the caller's own identity for attaching to
/// an outgoing envelope as advisory metadata.
pub trait CallerIdentitySource {
    /// Current caller identity (possibly not yet fully initialized).
    fn caller_identity(&self) -> CallerIdentity;
}

impl CallerIdentitySource for CallerIdentity {
    fn caller_identity(&self) -> CallerIdentity {
        self.clone()
    }
}

/// Structured-clone-safe encoding pass over a chain before it crosses the
/// wire. JSON values are already structured-clone-safe, so this is
/// presently the identity function; it exists as the single point where a
/// future non-JSON-safe value type would need encoding.
#[must_use]
pub fn preprocess_chain(chain: OperationChain) -> OperationChain {
    chain
}

/// `callRaw(calleeBinding, calleeInstanceNameOrId, chainOrContinuation)`.
///
/// 1. Extracts the chain (accepting either a raw chain or a builder).
/// 2. Gathers caller metadata from `caller`.
/// 3. Determines callee kind from whether an instance name/id was given:
///    present ⇒ durable actor, absent ⇒ stateless worker entry point.
/// 4. Preprocesses the chain.
/// 5. Builds the envelope and hands it to `stub`.
/// 6. Returns the postprocessed result.
///
/// # Errors
///
/// Propagates whatever `stub.execute_operation` returns, including an
/// `EnvelopeVersionMismatch` if the callee rejects the envelope version.
pub async fn call_raw(
    stub: &dyn CallStub,
    caller: &dyn CallerIdentitySource,
    callee_binding: impl Into<String>,
    callee_instance_name_or_id: Option<String>,
    chain_or_continuation: impl IntoOperationChain,
) -> OcanResult<serde_json::Value> {
    let chain = chain_or_continuation.into_operation_chain();
    let caller_identity = caller.caller_identity();

    let callee_kind = if callee_instance_name_or_id.is_some() {
        ActorKind::DurableActor
    } else {
        ActorKind::StatelessWorker
    };

    let callee = CalleeIdentity {
        kind: callee_kind,
        binding_name: callee_binding.into(),
        instance_name_or_id: callee_instance_name_or_id,
    };

    let envelope = CallEnvelope::new(preprocess_chain(chain), caller_identity, callee);
    stub.execute_operation(envelope).await
}
