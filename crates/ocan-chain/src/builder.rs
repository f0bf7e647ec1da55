// SPDX-License-Identifier: MIT OR Apache-2.0
//! Explicit builder form of the continuation proxy.
//!
//! Rust has no member-access/call interception, so this crate exposes the
//! builder API directly rather than attempting to fake a transparent proxy:
//! `chain().get("x").call("m", args...)` is the one true form, and callers
//! write against it.

use crate::step::{ChainArg, OperationChain, OperationStep};

/// Starts a new, empty chain recording.
///
/// Equivalent to `newContinuation<T>()`: the returned builder transparently
/// records `get`/`call` steps as they're appended.
#[must_use]
pub fn new_continuation() -> ChainBuilder {
    ChainBuilder::new()
}

/// Fluent recorder for an [`OperationChain`].
///
/// Each method consumes `self` and returns a new builder, mirroring the
/// immutable-lineage invariant: calling `.get()` or `.call()` on a chain
/// produces a new chain rather than mutating the one it was called on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainBuilder {
    chain: OperationChain,
}

impl ChainBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chain: OperationChain::new(),
        }
    }

    /// Wrap an already-built chain for further recording (used when a
    /// stored continuation needs more steps appended, e.g. substitution
    /// call sites).
    #[must_use]
    pub fn from_chain(chain: OperationChain) -> Self {
        Self { chain }
    }

    /// Record a property read.
    #[must_use]
    pub fn get(self, key: impl Into<String>) -> Self {
        let chain = self.chain.with_step(OperationStep::Get { key: key.into() });
        Self { chain }
    }

    /// Record a method call with the given arguments.
    #[must_use]
    pub fn call(self, key: impl Into<String>, args: Vec<ChainArg>) -> Self {
        let chain = self.chain.with_step(OperationStep::Call {
            key: key.into(),
            args,
        });
        Self { chain }
    }

    /// Finish recording and return the backing chain.
    #[must_use]
    pub fn build(self) -> OperationChain {
        self.chain
    }
}

impl From<ChainBuilder> for OperationChain {
    fn from(b: ChainBuilder) -> Self {
        b.build()
    }
}

/// Accepts either a raw chain or a builder, mirroring the RPC boundary's
/// tolerance for "a proxy or a raw chain" (`getOperationChain` acting as a
/// type guard). Non-chain inputs have no analogue in Rust's static type
/// system, so this is a conversion rather than a runtime guard.
pub trait IntoOperationChain {
    /// Consume `self`, producing the backing chain.
    fn into_operation_chain(self) -> OperationChain;
}

impl IntoOperationChain for OperationChain {
    fn into_operation_chain(self) -> OperationChain {
        self
    }
}

impl IntoOperationChain for ChainBuilder {
    fn into_operation_chain(self) -> OperationChain {
        self.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::ChainArg;

    #[test]
    fn builder_records_get_then_call() {
        let chain = new_continuation().get("data").call("getData", vec![ChainArg::Value(serde_json::json!("k"))]).build();
        assert_eq!(chain.steps().len(), 2);
    }

    #[test]
    fn builder_is_immutable_lineage() {
        let base = new_continuation().get("a");
        let extended = base.clone().call("m", vec![]);
        assert_eq!(base.build().steps().len(), 1);
        assert_eq!(extended.build().steps().len(), 2);
    }

    #[test]
    fn into_operation_chain_accepts_both_forms() {
        let from_builder = new_continuation().get("a").into_operation_chain();
        let from_chain = from_builder.clone().into_operation_chain();
        assert_eq!(from_builder, from_chain);
    }
}
