//! Management api of hookwire: webhook registration, event intake and the
//! matching [`client::WebhookClient`].

pub mod client;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;

pub use client::{ClientError, WebhookClient};
pub use state::AppState;
