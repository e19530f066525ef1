use std::sync::atomic::{AtomicU8, Ordering};

use hookwire_core::config::DEFAULT_QUEUE_CAPACITY;
use hookwire_core::Event;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::QueueError;

const IDLE: u8 = 0;
const CONNECTED: u8 = 1;
const CLOSED: u8 = 2;

/// Bounded mailbox of pending events.
///
/// Lifecycle is `idle -> connected -> closed`; a closed queue cannot be
/// reconnected. `put` applies backpressure when full instead of dropping.
pub struct EventQueue {
    capacity: usize,
    state: AtomicU8,
    stop: CancellationToken,
    tx: mpsc::Sender<Event>,
    rx: Mutex<mpsc::Receiver<Event>>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            capacity,
            state: AtomicU8::new(IDLE),
            stop: CancellationToken::new(),
            tx,
            rx: Mutex::new(rx),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events waiting to be taken.
    pub fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_connected(&self) -> bool {
        self.state.load(Ordering::Acquire) == CONNECTED
    }

    /// Opens the queue. Connecting twice is a no-op; connecting after
    /// `disconnect` fails.
    pub fn connect(&self) -> Result<(), QueueError> {
        match self
            .state
            .compare_exchange(IDLE, CONNECTED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                debug!(capacity = self.capacity, "event queue connected");
                Ok(())
            }
            Err(CONNECTED) => Ok(()),
            Err(_) => Err(QueueError::Disconnected),
        }
    }

    /// Closes the queue and wakes every pending `put`/`get`. Idempotent.
    pub fn disconnect(&self) {
        if self.state.swap(CLOSED, Ordering::AcqRel) != CLOSED {
            self.stop.cancel();
            debug!("event queue disconnected");
        }
    }

    fn ensure_connected(&self) -> Result<(), QueueError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(QueueError::Disconnected)
        }
    }

    pub async fn put(&self, event: Event, cancel: &CancellationToken) -> Result<(), QueueError> {
        self.ensure_connected()?;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(QueueError::Cancelled),
            _ = self.stop.cancelled() => Err(QueueError::Disconnected),
            sent = self.tx.send(event) => sent.map_err(|_| QueueError::Disconnected),
        }
    }

    pub async fn get(&self, cancel: &CancellationToken) -> Result<Event, QueueError> {
        self.ensure_connected()?;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(QueueError::Cancelled),
            _ = self.stop.cancelled() => Err(QueueError::Disconnected),
            event = async { self.rx.lock().await.recv().await } => {
                event.ok_or(QueueError::Disconnected)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn event(n: u64) -> Event {
        Event::new("push", json!({ "n": n }))
    }

    fn connected(capacity: usize) -> EventQueue {
        let queue = EventQueue::new(capacity);
        queue.connect().unwrap();
        queue
    }

    #[tokio::test]
    async fn test_put_then_get_fifo() {
        let queue = connected(4);
        let cancel = CancellationToken::new();

        queue.put(event(1), &cancel).await.unwrap();
        queue.put(event(2), &cancel).await.unwrap();
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.get(&cancel).await.unwrap(), event(1));
        assert_eq!(queue.get(&cancel).await.unwrap(), event(2));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_default_capacity() {
        assert_eq!(EventQueue::default().capacity(), 4096);
    }

    #[tokio::test]
    async fn test_operations_before_connect_fail() {
        let queue = EventQueue::new(1);
        let cancel = CancellationToken::new();

        assert_eq!(queue.put(event(1), &cancel).await, Err(QueueError::Disconnected));
        assert_eq!(queue.get(&cancel).await, Err(QueueError::Disconnected));
    }

    #[tokio::test]
    async fn test_connect_twice_is_noop() {
        let queue = connected(1);
        assert!(queue.connect().is_ok());
        assert!(queue.is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent_and_final() {
        let queue = connected(1);
        queue.disconnect();
        queue.disconnect();

        assert!(!queue.is_connected());
        assert_eq!(queue.connect(), Err(QueueError::Disconnected));
        let cancel = CancellationToken::new();
        assert_eq!(queue.put(event(1), &cancel).await, Err(QueueError::Disconnected));
    }

    #[tokio::test]
    async fn test_disconnect_wakes_pending_get() {
        let queue = Arc::new(connected(1));
        let cancel = CancellationToken::new();

        let waiter = {
            let queue = queue.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { queue.get(&cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.disconnect();

        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("get should wake up")
            .unwrap();
        assert_eq!(result, Err(QueueError::Disconnected));
    }

    #[tokio::test]
    async fn test_cancel_wakes_pending_get() {
        let queue = connected(1);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        assert_eq!(queue.get(&cancel).await, Err(QueueError::Cancelled));
        assert!(queue.is_connected(), "caller cancellation must not close the queue");
    }

    #[tokio::test]
    async fn test_full_queue_blocks_put() {
        let queue = connected(1);
        let cancel = CancellationToken::new();
        queue.put(event(1), &cancel).await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), queue.put(event(2), &cancel)).await;
        assert!(blocked.is_err(), "put on a full queue should wait for space");
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_blocked_put_resumes_after_get() {
        let queue = Arc::new(connected(1));
        let cancel = CancellationToken::new();
        queue.put(event(1), &cancel).await.unwrap();

        let producer = {
            let queue = queue.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { queue.put(event(2), &cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(queue.get(&cancel).await.unwrap(), event(1));

        producer.await.unwrap().unwrap();
        assert_eq!(queue.get(&cancel).await.unwrap(), event(2));
    }

    #[tokio::test]
    async fn test_cancelled_put_on_full_queue() {
        let queue = connected(1);
        let cancel = CancellationToken::new();
        queue.put(event(1), &cancel).await.unwrap();

        let put_cancel = CancellationToken::new();
        put_cancel.cancel();
        assert_eq!(queue.put(event(2), &put_cancel).await, Err(QueueError::Cancelled));
    }

    #[tokio::test]
    async fn test_disconnect_wakes_blocked_put() {
        let queue = Arc::new(connected(1));
        let cancel = CancellationToken::new();
        queue.put(event(1), &cancel).await.unwrap();

        let producer = {
            let queue = queue.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { queue.put(event(2), &cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.disconnect();

        assert_eq!(producer.await.unwrap(), Err(QueueError::Disconnected));
    }
}
