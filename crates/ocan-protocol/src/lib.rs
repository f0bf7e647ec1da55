// SPDX-License-Identifier: MIT OR Apache-2.0
//! Envelope & transport: the versioned RPC envelope and `callRaw`,
//! the wrapper that hands a chain to a platform stub for local or remote
//! delivery.

#![warn(missing_docs)]

pub mod envelope;
pub mod transport;

pub use envelope::{ActorKind, CalleeIdentity, CallEnvelope, CallerIdentity, EnvelopeMetadata, PROTOCOL_VERSION};
pub use transport::{call_raw, preprocess_chain, CallStub, CallerIdentitySource};
