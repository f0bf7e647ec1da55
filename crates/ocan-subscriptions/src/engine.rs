// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-subscriber subscription table and notification fanout.

use crate::payload::{current_payload, patch_payload, read_resource_result, update_notification};
use crate::types::{ConnectionSink, Subscription, SubscriptionType};
use chrono::{DateTime, Utc};
use ocan_error::{ErrorCode, OcanError, OcanResult};
use ocan_store::{ChangeEvent, ChangeObserver, TemporalStore};
use ocan_uri::{parse_entity_uri, ParsedUri};
use serde_json::{json, Value};
use std::sync::{Arc, RwLock};

/// Tracks every live `(subscriberId, uri)` subscription and fans entity
/// changes out to the connections holding them.
pub struct SubscriptionEngine {
    subscriptions: RwLock<Vec<Subscription>>,
    connections: Arc<dyn ConnectionSink>,
}

impl SubscriptionEngine {
    #[must_use]
    pub fn new(connections: Arc<dyn ConnectionSink>) -> Self {
        Self { subscriptions: RwLock::new(Vec::new()), connections }
    }

    /// Number of live subscriptions, across all subscribers and URIs.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().expect("subscription lock poisoned").len()
    }

    /// Subscribe `subscriber_id` to `uri`. Returns the same
    /// `ReadResourceResult` shape a `resources/read` on `uri` would, and
    /// also fires an immediate catch-up notification through `connections`.
    pub fn subscribe(
        &self,
        store: &TemporalStore,
        subscriber_id: &str,
        uri: &str,
        initial_baseline: Option<DateTime<Utc>>,
    ) -> OcanResult<Value> {
        let parsed = parse_entity_uri(uri)?;
        if !parsed.is_subscribable() {
            return Err(OcanError::new(
                ErrorCode::ParameterValidation,
                "uri is read-only and cannot be subscribed to",
            )
            .with_context("uri", uri));
        }

        let (entity_id, subscription_type, baseline, data) = match parsed {
            ParsedUri::PatchSubscription(params) => {
                let requested_baseline = initial_baseline.ok_or_else(|| {
                    OcanError::new(ErrorCode::ParameterValidation, "initialBaseline is required for patch subscriptions")
                })?;
                let (patch, baseline) = store.read_patch(&params.id, requested_baseline)?;
                let current = store.read_current(&params.id)?;
                let data = patch_payload(&current, patch, Some(baseline));
                (params.id, SubscriptionType::Patch, Some(baseline), data)
            }
            ParsedUri::Current(params) => {
                let current = store.read_current(&params.id)?;
                let data = current_payload(&current);
                (params.id, SubscriptionType::Current, None, data)
            }
            _ => unreachable!("is_subscribable() only allows Current and PatchSubscription"),
        };

        let record = Subscription {
            subscriber_id: subscriber_id.to_string(),
            uri: uri.to_string(),
            subscription_type,
            entity_id,
            original_uri: uri.to_string(),
            subscribed_at: Utc::now(),
            baseline,
        };

        {
            let mut table = self.subscriptions.write().expect("subscription lock poisoned");
            table.retain(|s| !(s.subscriber_id == record.subscriber_id && s.uri == record.uri));
            table.push(record);
        }

        let result = read_resource_result(uri, data);
        self.connections.send_notification(subscriber_id, uri, update_notification(result.clone()));
        Ok(result)
    }

    /// Remove the `(subscriber_id, uri)` subscription, if present.
    pub fn unsubscribe(&self, subscriber_id: &str, uri: &str) -> Value {
        let mut table = self.subscriptions.write().expect("subscription lock poisoned");
        let before = table.len();
        table.retain(|s| !(s.subscriber_id == subscriber_id && s.uri == uri));
        json!({"unsubscribed": table.len() < before, "uri": uri})
    }

    /// Drop every subscription for `subscriber_id`, e.g. on socket close.
    pub fn remove_all_subscriptions_for_subscriber(&self, subscriber_id: &str) -> usize {
        let mut table = self.subscriptions.write().expect("subscription lock poisoned");
        let before = table.len();
        table.retain(|s| s.subscriber_id != subscriber_id);
        before - table.len()
    }
}

impl ChangeObserver for SubscriptionEngine {
    fn on_change(&self, event: &ChangeEvent) {
        let matching: Vec<Subscription> = {
            let table = self.subscriptions.read().expect("subscription lock poisoned");
            table.iter().filter(|s| s.entity_id == event.new_snapshot.entity_id).cloned().collect()
        };

        for sub in matching {
            let data = match sub.subscription_type {
                SubscriptionType::Current => current_payload(&event.new_snapshot),
                SubscriptionType::Patch => {
                    let patch = match &event.old_value {
                        Some(old_value) => ocan_store::generate(old_value, &event.new_snapshot.value),
                        None => event.new_snapshot.value.clone(),
                    };
                    patch_payload(&event.new_snapshot, patch, event.old_valid_from)
                }
            };
            let result = read_resource_result(&sub.uri, data);
            self.connections.send_notification(&sub.subscriber_id, &sub.uri, update_notification(result));
        }
    }
}
