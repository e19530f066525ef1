//! Wire shapes of the management API, shared by the routes and [`crate::client`].

use chrono::{DateTime, Utc};
use hookwire_core::{Subscription, SubscriptionId, SubscriptionState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookIdResponse {
    pub id: SubscriptionId,
}

/// A subscription as exposed over the API; the secret is never echoed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookItem {
    pub id: SubscriptionId,
    pub url: String,
    pub content_type: String,
    pub trigger_event_types: Vec<String>,
    pub state: SubscriptionState,
    pub success_count: u64,
    pub failure_count: u64,
    pub last_success_time: Option<DateTime<Utc>>,
    pub last_failure_time: Option<DateTime<Utc>>,
}

impl From<Subscription> for WebhookItem {
    fn from(sub: Subscription) -> Self {
        Self {
            id: sub.id,
            url: sub.url,
            content_type: sub.content_type,
            trigger_event_types: sub.trigger_event_types,
            state: sub.state,
            success_count: sub.success_count,
            failure_count: sub.failure_count,
            last_success_time: sub.last_success_time,
            last_failure_time: sub.last_failure_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookListResponse {
    pub items: Vec<WebhookItem>,
    pub total: usize,
}
