use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("signature failed: {0}")]
pub struct SignerError(pub String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("encode payload as {content_type} failed: {reason}")]
    Encode { content_type: String, reason: String },

    #[error("decode response failed: {0}")]
    Decode(String),
}

/// Failure of a single delivery to a single subscriber.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("sign for {url} failed: {source}")]
    Signer { url: String, source: SignerError },

    #[error("notify to {url} failed: {source}")]
    Encode { url: String, source: CodecError },

    #[error("notify to {url} failed, http status: {status}")]
    Status { url: String, status: u16 },

    #[error("notify to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("notify to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("notify to {url} cancelled")]
    Cancelled { url: String },

    #[error("deserialize response from {url} failed: {source}")]
    Deserialize { url: String, source: CodecError },
}

impl DeliveryError {
    pub fn url(&self) -> &str {
        match self {
            DeliveryError::Signer { url, .. }
            | DeliveryError::Encode { url, .. }
            | DeliveryError::Status { url, .. }
            | DeliveryError::Transport { url, .. }
            | DeliveryError::Timeout { url, .. }
            | DeliveryError::Cancelled { url }
            | DeliveryError::Deserialize { url, .. } => url,
        }
    }

    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DeliveryError::Signer { .. } => "signer",
            DeliveryError::Encode { .. } => "encode",
            DeliveryError::Status { .. } => "http_status",
            DeliveryError::Transport { .. } => "transport",
            DeliveryError::Timeout { .. } => "timeout",
            DeliveryError::Cancelled { .. } => "cancelled",
            DeliveryError::Deserialize { .. } => "deserialize",
        }
    }
}

/// Every delivery error collected during one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorList(Vec<DeliveryError>);

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: DeliveryError) {
        self.0.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn errors(&self) -> &[DeliveryError] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<DeliveryError> {
        self.0
    }
}

impl From<Vec<DeliveryError>> for ErrorList {
    fn from(errors: Vec<DeliveryError>) -> Self {
        Self(errors)
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} delivery error(s)", self.0.len())?;
        for (i, err) in self.0.iter().enumerate() {
            let sep = if i == 0 { ": " } else { ", " };
            write!(f, "{sep}{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorList {}
