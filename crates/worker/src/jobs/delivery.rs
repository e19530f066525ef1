use std::sync::Arc;

use chrono::Utc;
use hookwire_core::{DeliveryError, DeliveryResponse, ErrorList, Event, Subscription};
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::dispatcher::Dispatcher;

/// One event bound for one subscriber.
pub struct DeliveryJob {
    pub dispatcher: Dispatcher,
    pub subscription: Subscription,
    pub event: Arc<Event>,
    pub cancel: CancellationToken,
    pub sink: Option<mpsc::Sender<DeliveryResponse>>,
    pub errors: Arc<Mutex<ErrorList>>,
}

enum Outcome {
    Delivered(Vec<u8>),
    Failed(DeliveryError),
    Cancelled,
}

pub async fn handle_delivery_job(job: DeliveryJob) {
    let url = job.subscription.url.clone();

    let signature = match job.dispatcher.signer.sign(&job.subscription.secret) {
        Ok(signature) => signature,
        Err(source) => {
            let err = DeliveryError::Signer {
                url: url.clone(),
                source,
            };
            error!(subscription_id = %job.subscription.id, url = %url, error = %err, "signing failed");
            job.errors.lock().await.push(err.clone());
            publish(&job, DeliveryResponse { url, payload: None, error: Some(err) }).await;
            return;
        }
    };

    let body = match deliver(&job, &signature).await {
        Outcome::Delivered(body) => body,
        Outcome::Cancelled => {
            debug!(subscription_id = %job.subscription.id, "delivery cancelled");
            return;
        }
        Outcome::Failed(err) => {
            error!(subscription_id = %job.subscription.id, error = %err, "delivery failed");
            publish(&job, DeliveryResponse { url, payload: None, error: Some(err) }).await;
            return;
        }
    };

    update_status(&job, true).await;

    // A body that does not decode still counts as delivered.
    let mut response = DeliveryResponse { url: url.clone(), payload: None, error: None };
    if let Some(deserializer) = job.dispatcher.deserializer.as_ref() {
        match deserializer.deserialize(&body) {
            Ok(Value::Null) => {}
            Ok(payload) => response.payload = Some(payload),
            Err(source) => {
                let err = DeliveryError::Deserialize { url, source };
                warn!(subscription_id = %job.subscription.id, error = %err, "response not decoded");
                job.errors.lock().await.push(err.clone());
                response.error = Some(err);
            }
        }
    }
    publish(&job, response).await;
}

async fn deliver(job: &DeliveryJob, signature: &str) -> Outcome {
    let config = &job.dispatcher.config;
    let subscription = &job.subscription;
    let attempts = config.attempts();
    let mut last_err = None;

    for attempt in 1..=attempts {
        let send = job.dispatcher.notifier.send(
            &subscription.url,
            &subscription.content_type,
            signature,
            &job.event,
        );
        let result = tokio::select! {
            biased;
            _ = job.cancel.cancelled() => return Outcome::Cancelled,
            sent = tokio::time::timeout(config.notify_timeout, send) => sent,
        };

        let err = match result {
            Ok(Ok(body)) => {
                debug!(subscription_id = %subscription.id, attempt, "delivered");
                return Outcome::Delivered(body);
            }
            Ok(Err(err)) => err,
            Err(_) => DeliveryError::Timeout {
                url: subscription.url.clone(),
                timeout: config.notify_timeout,
            },
        };
        warn!(
            subscription_id = %subscription.id,
            attempt,
            attempts,
            reason = err.as_label(),
            error = %err,
            "delivery attempt failed"
        );
        // Every failed attempt is recorded, not only the last one.
        job.errors.lock().await.push(err.clone());
        update_status(job, false).await;
        last_err = Some(err);
    }

    Outcome::Failed(last_err.unwrap_or_else(|| DeliveryError::Cancelled {
        url: subscription.url.clone(),
    }))
}

async fn update_status(job: &DeliveryJob, success: bool) {
    let id = job.subscription.id;
    if let Err(err) = job
        .dispatcher
        .store
        .update_notify_status(id, Utc::now(), success)
        .await
    {
        warn!(subscription_id = %id, error = %err, "failed to record notify status");
    }
}

async fn publish(job: &DeliveryJob, response: DeliveryResponse) {
    let Some(sink) = job.sink.as_ref() else {
        return;
    };
    tokio::select! {
        biased;
        _ = job.cancel.cancelled() => {}
        _ = sink.send(response) => {}
    }
}
