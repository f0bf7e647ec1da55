// SPDX-License-Identifier: MIT OR Apache-2.0
//! Subscription records and the connection seam.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `current` tracks the live value; `patch` tracks deltas from a baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionType {
    Current,
    Patch,
}

/// A single `(subscriberId, uri)` subscription.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Subscription {
    pub subscriber_id: String,
    pub uri: String,
    pub subscription_type: SubscriptionType,
    pub entity_id: String,
    pub original_uri: String,
    #[schemars(with = "String")]
    pub subscribed_at: DateTime<Utc>,
    #[schemars(with = "String")]
    pub baseline: Option<DateTime<Utc>>,
}

/// Delivers a notification to every live connection tagged with
/// `subscriber_id`.
///
/// Implemented by the daemon's websocket connection index; delivery is
/// fire-and-forget, so a failure here is logged and never propagated back
/// to the producing transaction.
pub trait ConnectionSink: Send + Sync {
    fn send_notification(&self, subscriber_id: &str, uri: &str, payload: serde_json::Value);
}

/// A [`ConnectionSink`] that records every delivery instead of sending it
/// anywhere; used by tests and as a safe default before a real transport is
/// wired up.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub deliveries: std::sync::Mutex<Vec<(String, String, serde_json::Value)>>,
}

impl ConnectionSink for RecordingSink {
    fn send_notification(&self, subscriber_id: &str, uri: &str, payload: serde_json::Value) {
        self.deliveries
            .lock()
            .expect("recording sink lock poisoned")
            .push((subscriber_id.to_string(), uri.to_string(), payload));
    }
}
