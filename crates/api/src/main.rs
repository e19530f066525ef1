use std::net::SocketAddr;
use std::sync::Arc;

use hookwire_core::{HmacSigner, JsonDeserializer, Settings};
use store::{MemoryStore, SubscriptionStore};
use tokio::net::TcpListener;
use tracing::{info, warn};
use worker::{Dispatcher, HttpNotifier, QueuedDispatcher};

use api::{routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let settings = Settings::from_env();

    let store: Arc<dyn SubscriptionStore> = Arc::new(MemoryStore::new());
    let dispatcher = Dispatcher::new(store, Arc::new(HttpNotifier::new()?), settings.dispatch.clone())
        .with_signer(Arc::new(HmacSigner::new(settings.signature_key.clone())))
        .with_deserializer(Arc::new(JsonDeserializer));

    let queued = Arc::new(QueuedDispatcher::new(dispatcher.clone()));
    queued.start().await?;

    let state = AppState::new(dispatcher, queued.clone(), settings.is_production());
    let app = routes::app(state);

    let addr: SocketAddr = settings.api_bind.parse()?;
    info!(%addr, env = %settings.hookwire_env, "starting api");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    queued.stop().await;
    info!("api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
    }
}
