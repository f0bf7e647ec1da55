// SPDX-License-Identifier: MIT OR Apache-2.0
//! Actor base and async call protocol: per-instance identity,
//! durable work queue, result mailbox with at-most-once delivery, and the
//! `call`/`proxyFetchSimple` continuation-injection protocol.

#![warn(missing_docs)]

pub mod actor;
pub mod call;
pub mod identity;
pub mod mailbox;
pub mod queue;
pub mod storage;

pub use actor::ActorBase;
pub use call::{call, call_from_worker, handle_proxy_fetch_simple_result, ProxyFetchCompleter};
pub use identity::ActorIdentity;
pub use mailbox::{receive_result, store_pending_continuation};
pub use queue::{drain_work, enqueue_work, queue_key, WorkHandler, WorkHandlerRegistry};
pub use storage::{ActorStorage, InMemoryStorage};
