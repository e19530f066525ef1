use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hookwire_core::types::DEFAULT_CONTENT_TYPE;
use hookwire_core::{
    Page, QueryCondition, Subscription, SubscriptionId, SubscriptionInput, SubscriptionState,
};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{StoreError, StoreResult, SubscriptionStore};

/// The three views over the registered subscriptions. Always mutated
/// together under the store's write lock.
#[derive(Default)]
struct Indexes {
    by_id: BTreeMap<SubscriptionId, Subscription>,
    by_event: HashMap<String, BTreeSet<SubscriptionId>>,
    by_url: HashMap<String, SubscriptionId>,
}

impl Indexes {
    fn index_events(&mut self, id: SubscriptionId, event_types: &[String]) {
        for event_type in event_types {
            self.by_event
                .entry(event_type.clone())
                .or_default()
                .insert(id);
        }
    }

    fn unindex_events(&mut self, id: SubscriptionId, event_types: &[String]) {
        for event_type in event_types {
            if let Some(bucket) = self.by_event.get_mut(event_type) {
                bucket.remove(&id);
                if bucket.is_empty() {
                    self.by_event.remove(event_type);
                }
            }
        }
    }
}

/// Memory-resident [`SubscriptionStore`].
///
/// Ids come from a monotonically increasing counter, so every index iterates
/// in creation order.
pub struct MemoryStore {
    next_id: AtomicU64,
    inner: RwLock<Indexes>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            inner: RwLock::new(Indexes::default()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Skips `offset * page_size` positions, takes `page_size`, then applies the
/// state filter inside that window.
fn window<'a, I>(
    items: I,
    offset: usize,
    page_size: usize,
    state: Option<SubscriptionState>,
) -> Vec<Subscription>
where
    I: Iterator<Item = Option<&'a Subscription>>,
{
    items
        .skip(offset.saturating_mul(page_size))
        .take(page_size)
        .flatten()
        .filter(|s| state.map_or(true, |wanted| s.state == wanted))
        .cloned()
        .collect()
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn create(&self, input: SubscriptionInput) -> StoreResult<SubscriptionId> {
        if input.url.trim().is_empty() {
            return Err(StoreError::Validation("url cannot be empty".to_string()));
        }

        let mut inner = self.inner.write().await;
        if inner.by_url.contains_key(&input.url) {
            return Err(StoreError::DuplicateUrl(input.url));
        }

        let id = self.next_id();
        let trigger_event_types = input.normalized_event_types();
        let content_type = if input.content_type.is_empty() {
            DEFAULT_CONTENT_TYPE.to_string()
        } else {
            input.content_type
        };

        inner.index_events(id, &trigger_event_types);
        inner.by_url.insert(input.url.clone(), id);
        inner.by_id.insert(
            id,
            Subscription {
                id,
                url: input.url,
                secret: input.secret,
                content_type,
                trigger_event_types,
                state: SubscriptionState::Normal,
                success_count: 0,
                failure_count: 0,
                last_success_time: None,
                last_failure_time: None,
            },
        );

        debug!(%id, "subscription created");
        Ok(id)
    }

    async fn update(&self, id: SubscriptionId, input: SubscriptionInput) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let existing = inner.by_id.get(&id).ok_or(StoreError::NotFound(id))?;
        let old_url = existing.url.clone();
        let old_types = existing.trigger_event_types.clone();

        let url_changed = !input.url.is_empty() && input.url != old_url;
        if url_changed && inner.by_url.contains_key(&input.url) {
            return Err(StoreError::DuplicateUrl(input.url));
        }

        let new_types = input.normalized_event_types();
        inner.unindex_events(id, &old_types);
        inner.index_events(id, &new_types);

        if url_changed {
            inner.by_url.remove(&old_url);
            inner.by_url.insert(input.url.clone(), id);
        }

        let record = inner.by_id.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if url_changed {
            record.url = input.url;
        }
        if !input.secret.is_empty() {
            record.secret = input.secret;
        }
        if !input.content_type.is_empty() {
            record.content_type = input.content_type;
        }
        if let Some(state) = input.state {
            record.state = state;
        }
        record.trigger_event_types = new_types;

        debug!(%id, "subscription updated");
        Ok(())
    }

    async fn delete(&self, id: SubscriptionId) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(removed) = inner.by_id.remove(&id) {
            inner.unindex_events(id, &removed.trigger_event_types);
            inner.by_url.remove(&removed.url);
            debug!(%id, "subscription deleted");
        }
        Ok(())
    }

    async fn query(&self, condition: &QueryCondition) -> StoreResult<Page> {
        let inner = self.inner.read().await;
        let total = inner.by_id.len();
        let page_size = condition.effective_page_size();

        if let Some(id) = condition.id {
            let found = inner.by_id.get(&id).ok_or(StoreError::NotFound(id))?;
            return Ok(Page {
                items: vec![found.clone()],
                total,
            });
        }

        if let Some(url) = condition.url.as_deref().filter(|u| !u.is_empty()) {
            let found = inner
                .by_url
                .get(url)
                .and_then(|id| inner.by_id.get(id))
                .ok_or_else(|| StoreError::UrlNotFound(url.to_string()))?;
            return Ok(Page {
                items: vec![found.clone()],
                total,
            });
        }

        let items = match condition.event_type.as_deref().filter(|t| !t.is_empty()) {
            Some(event_type) => match inner.by_event.get(event_type) {
                Some(bucket) => window(
                    bucket.iter().map(|id| inner.by_id.get(id)),
                    condition.offset,
                    page_size,
                    condition.state,
                ),
                None => Vec::new(),
            },
            None => window(
                inner.by_id.values().map(Some),
                condition.offset,
                page_size,
                condition.state,
            ),
        };

        Ok(Page { items, total })
    }

    async fn update_notify_status(
        &self,
        id: SubscriptionId,
        at: DateTime<Utc>,
        success: bool,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let record = inner.by_id.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if success {
            record.success_count += 1;
            record.last_success_time = Some(at);
        } else {
            record.failure_count += 1;
            record.last_failure_time = Some(at);
        }
        Ok(())
    }
}
