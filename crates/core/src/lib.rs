pub mod auth;
pub mod codec;
pub mod config;
pub mod error;
pub mod types;

pub use auth::{HmacSigner, Signer};
pub use codec::{JsonDeserializer, ResponseDeserializer};
pub use config::{DispatchConfig, Settings};
pub use error::{CodecError, DeliveryError, ErrorList, SignerError};
pub use types::{
    DeliveryResponse, Event, Page, QueryCondition, Subscription, SubscriptionId,
    SubscriptionInput, SubscriptionState,
};
