use std::sync::Arc;

use store::SubscriptionStore;
use worker::{Dispatcher, QueuedDispatcher};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SubscriptionStore>,
    pub dispatcher: Dispatcher,
    pub queued: Arc<QueuedDispatcher>,
    /// Production deployments refuse loopback webhook urls.
    pub production: bool,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, queued: Arc<QueuedDispatcher>, production: bool) -> Self {
        Self {
            store: dispatcher.store().clone(),
            dispatcher,
            queued,
            production,
        }
    }
}
