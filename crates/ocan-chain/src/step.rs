// SPDX-License-Identifier: MIT OR Apache-2.0
//! `OperationChain` and its steps — the wire-safe recording of a
//! continuation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Distinguished placeholder substituted with an injected value before a
/// chain executes. Appears in argument position inside a [`ChainArg`].
pub const RESULT_PLACEHOLDER: &str = "$result";

/// A single argument to a `call` step.
///
/// Plain JSON values pass through unchanged. A [`ChainArg::Nested`] carries
/// another chain by value (never executed until the outer chain runs, per
/// the nesting invariant); a [`ChainArg::ResultPlaceholder`] marks the spot
/// where [`crate::exec::replace_nested_operation_markers`] injects a result
/// or error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainArg {
    /// An ordinary structured-clone-safe value.
    Value(serde_json::Value),
    /// A nested chain, substituted by executing it against the same target
    /// before the outer call runs.
    Nested(OperationChain),
    /// The `$result` marker: replaced with an injected value at
    /// substitution time.
    ResultPlaceholder,
}

impl ChainArg {
    /// True if this argument is the `$result` marker.
    #[must_use]
    pub fn is_result_placeholder(&self) -> bool {
        matches!(self, Self::ResultPlaceholder)
    }

    /// True if this argument embeds a nested chain.
    #[must_use]
    pub fn as_nested(&self) -> Option<&OperationChain> {
        match self {
            Self::Nested(c) => Some(c),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for ChainArg {
    fn from(v: serde_json::Value) -> Self {
        Self::Value(v)
    }
}

impl From<OperationChain> for ChainArg {
    fn from(c: OperationChain) -> Self {
        Self::Nested(c)
    }
}

/// One recorded step of an [`OperationChain`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationStep {
    /// A property read.
    Get {
        /// Property name.
        key: String,
    },
    /// A method invocation, bound to the receiver produced by the
    /// preceding steps.
    Call {
        /// Method name.
        key: String,
        /// Call arguments, in order.
        args: Vec<ChainArg>,
    },
}

/// An ordered, immutable sequence of [`OperationStep`]s.
///
/// `OperationChain` has a stable, structured-clone-safe serialized form:
/// it round-trips through JSON with no loss, which is what lets it cross
/// the actor-to-actor wire inside a [`crate::exec::ChainTarget`]-agnostic
/// envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OperationChain {
    steps: Vec<OperationStep>,
}

impl OperationChain {
    /// An empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Chain steps, in recorded order.
    #[must_use]
    pub fn steps(&self) -> &[OperationStep] {
        &self.steps
    }

    /// True if the chain has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns a new chain with `step` appended. Chains are immutable
    /// lineages: this never mutates `self`, matching the requirement that
    /// calling a property on a chain produces a new chain.
    #[must_use]
    pub fn with_step(&self, step: OperationStep) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    /// Construct a chain directly from steps (used when deserializing a
    /// preprocessed chain off the wire).
    #[must_use]
    pub fn from_steps(steps: Vec<OperationStep>) -> Self {
        Self { steps }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chain_has_no_steps() {
        let c = OperationChain::new();
        assert!(c.is_empty());
        assert_eq!(c.steps().len(), 0);
    }

    #[test]
    fn with_step_does_not_mutate_original() {
        let base = OperationChain::new();
        let extended = base.with_step(OperationStep::Get { key: "a".into() });
        assert!(base.is_empty());
        assert_eq!(extended.steps().len(), 1);
    }

    #[test]
    fn chain_arg_round_trips_through_json() {
        let arg = ChainArg::Nested(OperationChain::new().with_step(OperationStep::Call {
            key: "getData".into(),
            args: vec![ChainArg::Value(serde_json::json!("k"))],
        }));
        let json = serde_json::to_string(&arg).unwrap();
        let back: ChainArg = serde_json::from_str(&json).unwrap();
        assert_eq!(arg, back);
    }

    #[test]
    fn result_placeholder_detected() {
        assert!(ChainArg::ResultPlaceholder.is_result_placeholder());
        assert!(!ChainArg::Value(serde_json::json!(1)).is_result_placeholder());
    }
}
