//! Subscription storage.
//!
//! [`SubscriptionStore`] is the contract consumed by the dispatch engine and
//! the management API. [`MemoryStore`] is the reference implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hookwire_core::{Page, QueryCondition, SubscriptionId, SubscriptionInput};

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Registers a subscription. Fails on an empty or already registered url.
    async fn create(&self, input: SubscriptionInput) -> StoreResult<SubscriptionId>;

    /// Merges non-empty fields of `input`; trigger event types are replaced.
    async fn update(&self, id: SubscriptionId, input: SubscriptionInput) -> StoreResult<()>;

    /// Removes a subscription. Unknown ids are not an error.
    async fn delete(&self, id: SubscriptionId) -> StoreResult<()>;

    /// Id and url lookups fail with not-found; the paged paths never fail.
    async fn query(&self, condition: &QueryCondition) -> StoreResult<Page>;

    /// Bumps the success or failure counter and its timestamp.
    async fn update_notify_status(
        &self,
        id: SubscriptionId,
        at: DateTime<Utc>,
        success: bool,
    ) -> StoreResult<()>;
}
