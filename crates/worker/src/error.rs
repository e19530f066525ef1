use hookwire_core::ErrorList;
use store::StoreError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("event queue disconnected")]
    Disconnected,

    #[error("queue operation cancelled")]
    Cancelled,
}

/// Batch-level failure reported to the producer.
#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    #[error("query subscriptions failed: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Delivery(#[from] ErrorList),

    #[error("dispatch cancelled")]
    Cancelled,
}

impl DispatchError {
    /// Delivery errors collected before the batch finished, if any.
    pub fn delivery_errors(&self) -> Option<&ErrorList> {
        match self {
            DispatchError::Delivery(errors) => Some(errors),
            _ => None,
        }
    }
}
