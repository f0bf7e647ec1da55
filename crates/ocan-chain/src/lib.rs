// SPDX-License-Identifier: MIT OR Apache-2.0
//! Continuation proxy and chain execution.
//!
//! An [`step::OperationChain`] records a sequence of property reads and
//! method calls deferred for later execution against a target, possibly on
//! a different actor after crossing the wire. This crate provides the
//! explicit builder form of the continuation proxy ([`builder`]) and the
//! walker that applies a chain to a target ([`exec`]).

pub mod builder;
pub mod exec;
pub mod step;

pub use builder::{new_continuation, ChainBuilder, IntoOperationChain};
pub use exec::{execute_operation_chain, replace_nested_operation_markers, ChainTarget};
pub use step::{ChainArg, OperationChain, OperationStep, RESULT_PLACEHOLDER};
