use hookwire_core::SubscriptionId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("invalid subscription: {0}")]
    Validation(String),

    #[error("url already registered: {0}")]
    DuplicateUrl(String),

    #[error("subscription {0} not found")]
    NotFound(SubscriptionId),

    #[error("url {0} not found")]
    UrlNotFound(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_) | StoreError::UrlNotFound(_))
    }
}
