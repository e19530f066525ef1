use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use hookwire_core::{DeliveryResponse, Event};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use worker::DispatchError;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/events", post(publish_event))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PublishParams {
    /// Deliver inline and report per-subscriber results.
    wait: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum PublishResponse {
    Queued { status: &'static str },
    Delivered(DeliveryReport),
}

#[derive(Debug, Serialize)]
struct DeliveryReport {
    status: &'static str,
    results: Vec<DeliveryResult>,
    errors: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DeliveryResult {
    url: String,
    payload: Option<serde_json::Value>,
    error: Option<String>,
}

impl From<DeliveryResponse> for DeliveryResult {
    fn from(resp: DeliveryResponse) -> Self {
        Self {
            url: resp.url,
            payload: resp.payload,
            error: resp.error.map(|e| e.to_string()),
        }
    }
}

async fn publish_event(
    State(state): State<AppState>,
    Query(params): Query<PublishParams>,
    Json(event): Json<Event>,
) -> ApiResult<(StatusCode, Json<PublishResponse>)> {
    if event.event_type.trim().is_empty() {
        return Err(ApiError::BadRequest("event type required".to_string()));
    }

    // Dropping the handler aborts in-flight deliveries.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    if !params.wait {
        state.queued.notify(event, &cancel).await?;
        return Ok((
            StatusCode::ACCEPTED,
            Json(PublishResponse::Queued { status: "queued" }),
        ));
    }

    let event_type = event.event_type.clone();
    let (responses, result) = state.dispatcher.notify(event, &cancel).await.collect().await;

    let (status, errors) = match result {
        Ok(()) => ("delivered", Vec::new()),
        Err(DispatchError::Delivery(errors)) => {
            warn!(event_type = %event_type, failed = errors.len(), "event partially delivered");
            (
                "partial",
                errors.into_inner().into_iter().map(|e| e.to_string()).collect(),
            )
        }
        Err(DispatchError::Store(err)) => return Err(err.into()),
        Err(DispatchError::Cancelled) => return Err(ApiError::Internal),
    };
    info!(event_type = %event_type, delivered = responses.len(), "event dispatched inline");

    Ok((
        StatusCode::OK,
        Json(PublishResponse::Delivered(DeliveryReport {
            status,
            results: responses.into_iter().map(DeliveryResult::from).collect(),
            errors,
        })),
    ))
}
