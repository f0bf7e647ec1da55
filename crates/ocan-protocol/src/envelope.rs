// SPDX-License-Identifier: MIT OR Apache-2.0
//! `CallEnvelope` — the versioned wire form carrying a chain and
//! caller/callee identity between actors.

use ocan_chain::OperationChain;
use ocan_error::{ErrorCode, OcanError, OcanResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The only envelope version this build understands. A mismatch at the
/// callee is a permanent, non-retried error.
pub const PROTOCOL_VERSION: u32 = 1;

/// Whether an identity refers to a durable, stateful actor or a stateless
/// worker entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// A named, persistent actor instance.
    DurableActor,
    /// An ephemeral, unserialized entry point with no identity of its own.
    StatelessWorker,
}

/// Caller identity attached to an envelope. Advisory only — the callee
/// never trusts it for authorization, only for logging/routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CallerIdentity {
    /// Caller kind.
    pub kind: ActorKind,
    /// Caller's binding name, if it has committed one yet.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub binding_name: Option<String>,
    /// Caller's instance name or platform id, if known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub instance_name_or_id: Option<String>,
}

/// Callee identity attached to an envelope. The callee auto-initializes
/// its own identity from this on the first envelope it receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalleeIdentity {
    /// Callee kind.
    pub kind: ActorKind,
    /// Binding name to resolve or auto-initialize.
    pub binding_name: String,
    /// Instance name or id; absent only when addressing a stateless
    /// worker entry point.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub instance_name_or_id: Option<String>,
}

/// Caller/callee identity pair carried alongside a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EnvelopeMetadata {
    /// Advisory caller identity.
    pub caller: CallerIdentity,
    /// Callee identity, authoritative for auto-initialization.
    pub callee: CalleeIdentity,
}

/// Versioned RPC envelope wrapping a chain and its caller/callee metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CallEnvelope {
    /// Envelope format version. Must equal [`PROTOCOL_VERSION`].
    pub version: u32,
    /// The chain to execute against the callee.
    pub chain: OperationChain,
    /// Caller/callee identity.
    pub metadata: EnvelopeMetadata,
}

impl CallEnvelope {
    /// Build an envelope at the current protocol version.
    #[must_use]
    pub fn new(chain: OperationChain, caller: CallerIdentity, callee: CalleeIdentity) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            chain,
            metadata: EnvelopeMetadata { caller, callee },
        }
    }

    /// True if this envelope's version matches what this build understands.
    #[must_use]
    pub fn is_supported_version(&self) -> bool {
        self.version == PROTOCOL_VERSION
    }

    /// Reject any version other than [`PROTOCOL_VERSION`]. Fatal: surfaced
    /// to the caller unchanged, never retried.
    pub fn require_supported_version(&self) -> OcanResult<()> {
        if self.is_supported_version() {
            Ok(())
        } else {
            Err(OcanError::new(
                ErrorCode::EnvelopeVersionMismatch,
                format!(
                    "envelope version {} is not supported (expected {})",
                    self.version, PROTOCOL_VERSION
                ),
            )
            .with_context("received_version", self.version)
            .with_context("supported_version", PROTOCOL_VERSION))
        }
    }
}
