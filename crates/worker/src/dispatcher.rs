use std::sync::Arc;

use hookwire_core::{
    DeliveryResponse, DispatchConfig, ErrorList, Event, HmacSigner, QueryCondition,
    ResponseDeserializer, Signer, Subscription, SubscriptionState,
};
use store::{StoreError, SubscriptionStore};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::DispatchError;
use crate::jobs::delivery::{self, DeliveryJob};
use crate::notifier::Notifier;

/// Result of a direct notification.
///
/// `responses` yields one entry per matched subscriber in completion order
/// and closes once every delivery has finished or been abandoned.
#[derive(Debug)]
pub struct Notification {
    pub responses: mpsc::Receiver<DeliveryResponse>,
    pub result: Result<(), DispatchError>,
}

impl Notification {
    /// Drains the response stream.
    pub async fn collect(mut self) -> (Vec<DeliveryResponse>, Result<(), DispatchError>) {
        let mut out = Vec::new();
        while let Some(response) = self.responses.recv().await {
            out.push(response);
        }
        (out, self.result)
    }
}

/// Fans an event out to every matching subscription.
///
/// Cheap to clone; every delivery unit carries its own handle.
#[derive(Clone)]
pub struct Dispatcher {
    pub(crate) store: Arc<dyn SubscriptionStore>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) signer: Arc<dyn Signer>,
    pub(crate) deserializer: Option<Arc<dyn ResponseDeserializer>>,
    pub(crate) config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        notifier: Arc<dyn Notifier>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            signer: Arc::new(HmacSigner::default()),
            deserializer: None,
            config,
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = signer;
        self
    }

    pub fn with_deserializer(mut self, deserializer: Arc<dyn ResponseDeserializer>) -> Self {
        self.deserializer = Some(deserializer);
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SubscriptionStore> {
        &self.store
    }

    /// Delivers `event` to every matching subscriber and waits for all of
    /// them, or for `cancel`.
    ///
    /// The result is an aggregate of every delivery error; responses of the
    /// subscribers that succeeded are still streamed.
    pub async fn notify(&self, event: Event, cancel: &CancellationToken) -> Notification {
        let subscriptions = match self.matching(&event.event_type).await {
            Ok(subscriptions) => subscriptions,
            Err(err) => {
                let (_, responses) = mpsc::channel(1);
                return Notification {
                    responses,
                    result: Err(err.into()),
                };
            }
        };

        let buffer = self.config.result_buffer.max(subscriptions.len()).max(1);
        let (tx, responses) = mpsc::channel(buffer);
        let result = self.run_batch(event, subscriptions, cancel, Some(tx)).await;
        Notification { responses, result }
    }

    /// Same fan-out as [`Dispatcher::notify`] without a response stream.
    pub async fn dispatch(&self, event: Event, cancel: &CancellationToken) -> Result<(), DispatchError> {
        let subscriptions = self.matching(&event.event_type).await?;
        self.run_batch(event, subscriptions, cancel, None).await
    }

    /// Pages through every subscriber of `event_type`.
    ///
    /// The state filter is applied inside each page, so a page can come back
    /// empty while later pages still hold normal subscriptions; paging stops
    /// on the reported total instead.
    async fn matching(&self, event_type: &str) -> Result<Vec<Subscription>, StoreError> {
        let page_size = self.config.page_size.max(1);
        let mut offset = 0;
        let mut found = Vec::new();
        loop {
            let condition = QueryCondition::by_event_type(event_type)
                .with_state(SubscriptionState::Normal)
                .page(offset, page_size);
            let page = self.store.query(&condition).await?;
            found.extend(page.items);
            offset += 1;
            if offset * page_size >= page.total {
                break;
            }
        }
        Ok(found)
    }

    async fn run_batch(
        &self,
        event: Event,
        subscriptions: Vec<Subscription>,
        cancel: &CancellationToken,
        sink: Option<mpsc::Sender<DeliveryResponse>>,
    ) -> Result<(), DispatchError> {
        if subscriptions.is_empty() {
            debug!(event_type = %event.event_type, "no subscribers for event");
            return Ok(());
        }
        info!(
            event_type = %event.event_type,
            subscribers = subscriptions.len(),
            "dispatching event"
        );

        let event = Arc::new(event);
        let errors = Arc::new(Mutex::new(ErrorList::new()));
        let batch_token = cancel.child_token();
        let mut units = JoinSet::new();

        for subscription in subscriptions {
            let job = DeliveryJob {
                dispatcher: self.clone(),
                subscription,
                event: event.clone(),
                cancel: batch_token.clone(),
                sink: sink.clone(),
                errors: errors.clone(),
            };
            units.spawn(delivery::handle_delivery_job(job));
        }
        drop(sink);

        let finished = tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = join_all(&mut units) => true,
        };

        if !finished {
            batch_token.cancel();
            units.abort_all();
            info!(event_type = %event.event_type, "dispatch cancelled by caller");
            return Err(DispatchError::Cancelled);
        }

        let errors = std::mem::take(&mut *errors.lock().await);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::Delivery(errors))
        }
    }
}

async fn join_all(units: &mut JoinSet<()>) {
    while let Some(joined) = units.join_next().await {
        if let Err(err) = joined {
            error!(error = %err, "delivery unit panicked");
        }
    }
}
