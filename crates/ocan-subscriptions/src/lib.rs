// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-subscriber subscription engine and notification fanout.

mod engine;
mod payload;
mod types;

pub use engine::SubscriptionEngine;
pub use payload::{current_payload, patch_payload, read_resource_result, update_notification};
pub use types::{ConnectionSink, RecordingSink, Subscription, SubscriptionType};
