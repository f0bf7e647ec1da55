// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bitemporal temporal entity store with RFC 7396 merge-patch support.

mod merge_patch;
mod snapshot;
mod store;
mod types;

pub use merge_patch::{apply, generate};
pub use snapshot::{sentinel_valid_to, EntitySnapshot};
pub use store::TemporalStore;
pub use types::{ChangeEvent, ChangeObserver, EntityTypeValidator, Mutation, PermissiveValidator, UpsertRequest};
