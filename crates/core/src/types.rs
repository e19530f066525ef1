use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DeliveryError;

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Store-assigned identifier of a subscription. Immutable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubscriptionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(SubscriptionId)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionState {
    #[default]
    Normal,
    Abnormal,
    Forbidden,
}

impl SubscriptionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionState::Normal => "normal",
            SubscriptionState::Abnormal => "abnormal",
            SubscriptionState::Forbidden => "forbidden",
        }
    }
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(SubscriptionState::Normal),
            "abnormal" => Ok(SubscriptionState::Abnormal),
            "forbidden" => Ok(SubscriptionState::Forbidden),
            other => Err(format!("unknown subscription state: {other}")),
        }
    }
}

/// A registered webhook receiver.
///
/// Values handed out by a store are snapshots; delivery bookkeeping is only
/// ever changed through the store itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub url: String,
    pub secret: String,
    pub content_type: String,
    pub trigger_event_types: Vec<String>,
    pub state: SubscriptionState,
    pub success_count: u64,
    pub failure_count: u64,
    pub last_success_time: Option<DateTime<Utc>>,
    pub last_failure_time: Option<DateTime<Utc>>,
}

/// Registration or partial-update request.
///
/// On update, empty strings and `None` leave the stored field untouched;
/// `trigger_event_types` always replaces the stored list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionInput {
    pub url: String,
    pub secret: String,
    pub content_type: String,
    pub trigger_event_types: Vec<String>,
    pub state: Option<SubscriptionState>,
}

impl SubscriptionInput {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_event_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trigger_event_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_state(mut self, state: SubscriptionState) -> Self {
        self.state = Some(state);
        self
    }

    /// Event types with duplicates and blanks removed, first occurrence wins.
    pub fn normalized_event_types(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.trigger_event_types.len());
        for t in &self.trigger_event_types {
            if !t.is_empty() && !out.contains(t) {
                out.push(t.clone());
            }
        }
        out
    }
}

/// Lookup filter for [`Subscription`]s.
///
/// Precedence: `id`, then `url`, then `event_type` (with optional `state`),
/// then the whole population. Paging applies to the last two paths only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryCondition {
    pub id: Option<SubscriptionId>,
    pub url: Option<String>,
    pub event_type: Option<String>,
    pub state: Option<SubscriptionState>,
    /// Page index, starting at 0.
    pub offset: usize,
    /// Page size; 0 means [`DEFAULT_PAGE_SIZE`].
    pub page_size: usize,
}

impl QueryCondition {
    pub fn by_id(id: SubscriptionId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn by_event_type(event_type: impl Into<String>) -> Self {
        Self {
            event_type: Some(event_type.into()),
            ..Self::default()
        }
    }

    pub fn with_state(mut self, state: SubscriptionState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn page(mut self, offset: usize, page_size: usize) -> Self {
        self.offset = offset;
        self.page_size = page_size;
        self
    }

    pub fn effective_page_size(&self) -> usize {
        if self.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        }
    }
}

/// One page of query results plus the size of the whole population.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<Subscription>,
    pub total: usize,
}

/// Something that happened on the producer side.
///
/// The type is matched verbatim against subscriptions' trigger lists; the
/// payload is opaque to the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Event {
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }
}

/// Outcome of delivering one event to one subscriber.
#[derive(Debug, Clone)]
pub struct DeliveryResponse {
    pub url: String,
    pub payload: Option<serde_json::Value>,
    pub error: Option<DeliveryError>,
}

impl DeliveryResponse {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
