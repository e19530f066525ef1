use std::sync::Arc;

use hookwire_core::Event;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::{DispatchError, QueueError};
use crate::queue::EventQueue;

struct Running {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Accepts events into a bounded queue and dispatches them from a single
/// background loop.
pub struct QueuedDispatcher {
    dispatcher: Dispatcher,
    queue: Arc<EventQueue>,
    running: Mutex<Option<Running>>,
}

impl QueuedDispatcher {
    pub fn new(dispatcher: Dispatcher) -> Self {
        let queue = Arc::new(EventQueue::new(dispatcher.config().queue_capacity));
        Self {
            dispatcher,
            queue,
            running: Mutex::new(None),
        }
    }

    /// Connects the queue and spawns the dispatch loop. Calling it on a
    /// running dispatcher is a no-op.
    pub async fn start(&self) -> Result<(), QueueError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Ok(());
        }
        self.queue.connect()?;

        let token = CancellationToken::new();
        let handle = tokio::spawn(dispatch_loop(
            self.dispatcher.clone(),
            self.queue.clone(),
            token.clone(),
        ));
        *running = Some(Running { token, handle });
        info!(capacity = self.queue.capacity(), "queued dispatcher started");
        Ok(())
    }

    /// Stops the loop and closes the queue. Idempotent.
    ///
    /// Events still buffered in the queue are dropped; an in-flight batch is
    /// cancelled.
    pub async fn stop(&self) {
        let Some(Running { token, handle }) = self.running.lock().await.take() else {
            self.queue.disconnect();
            return;
        };
        token.cancel();
        self.queue.disconnect();
        if let Err(err) = handle.await {
            warn!(error = %err, "dispatch loop ended abnormally");
        }
        info!(dropped = self.queue.len(), "queued dispatcher stopped");
    }

    /// Number of events accepted but not yet taken by the loop.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Enqueues `event`, waiting for space when the queue is full.
    pub async fn notify(&self, event: Event, cancel: &CancellationToken) -> Result<(), QueueError> {
        self.queue.put(event, cancel).await
    }
}

async fn dispatch_loop(dispatcher: Dispatcher, queue: Arc<EventQueue>, token: CancellationToken) {
    loop {
        let event = match queue.get(&token).await {
            Ok(event) => event,
            Err(QueueError::Disconnected) | Err(QueueError::Cancelled) => break,
        };
        let event_type = event.event_type.clone();

        match dispatcher.dispatch(event, &token).await {
            Ok(()) => {}
            Err(DispatchError::Cancelled) => break,
            Err(DispatchError::Delivery(errors)) => {
                warn!(event_type = %event_type, failed = errors.len(), error = %errors, "event partially delivered");
            }
            Err(err) => {
                warn!(event_type = %event_type, error = %err, "event dispatch failed");
            }
        }
    }
    info!("dispatch loop exited");
}
