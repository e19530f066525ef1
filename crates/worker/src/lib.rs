//! Event fan-out to webhook subscribers.
//!
//! [`Dispatcher`] delivers one event inline and streams per-subscriber
//! responses back to the caller. [`QueuedDispatcher`] puts the same engine
//! behind a bounded [`EventQueue`] drained by a background loop.

pub mod dispatcher;
pub mod error;
pub mod jobs;
pub mod manager;
pub mod notifier;
pub mod queue;

pub use dispatcher::{Dispatcher, Notification};
pub use error::{DispatchError, QueueError};
pub use manager::QueuedDispatcher;
pub use notifier::{HttpNotifier, Notifier, EVENT_TYPE_HEADER, SIGNATURE_HEADER};
pub use queue::EventQueue;
