use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use hookwire_core::{QueryCondition, SubscriptionId, SubscriptionInput, SubscriptionState};
use serde::Deserialize;
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    models::{WebhookIdResponse, WebhookItem, WebhookListResponse},
    state::AppState,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/webhooks", post(register_webhook).get(list_webhooks))
        .route(
            "/v1/webhooks/{id}",
            get(get_webhook).put(update_webhook).delete(delete_webhook),
        )
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListParams {
    id: Option<u64>,
    url: Option<String>,
    event_type: Option<String>,
    state: Option<String>,
    offset: usize,
    page_size: usize,
}

impl ListParams {
    fn into_condition(self) -> ApiResult<QueryCondition> {
        let state = self
            .state
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<SubscriptionState>())
            .transpose()
            .map_err(ApiError::BadRequest)?;
        Ok(QueryCondition {
            id: self.id.map(SubscriptionId),
            url: self.url,
            event_type: self.event_type,
            state,
            offset: self.offset,
            page_size: self.page_size,
        })
    }
}

async fn register_webhook(
    State(state): State<AppState>,
    Json(payload): Json<SubscriptionInput>,
) -> ApiResult<Json<WebhookIdResponse>> {
    validate_url(&payload.url, state.production)?;

    let id = state.store.create(payload).await?;
    info!(%id, "webhook registered");
    Ok(Json(WebhookIdResponse { id }))
}

async fn list_webhooks(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<WebhookListResponse>> {
    let condition = params.into_condition()?;
    let page = state.store.query(&condition).await?;

    Ok(Json(WebhookListResponse {
        items: page.items.into_iter().map(WebhookItem::from).collect(),
        total: page.total,
    }))
}

async fn get_webhook(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<WebhookItem>> {
    fetch(&state, SubscriptionId(id)).await.map(Json)
}

async fn update_webhook(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(payload): Json<SubscriptionInput>,
) -> ApiResult<Json<WebhookItem>> {
    if !payload.url.is_empty() {
        validate_url(&payload.url, state.production)?;
    }

    let id = SubscriptionId(id);
    state.store.update(id, payload).await?;
    info!(%id, "webhook updated");
    fetch(&state, id).await.map(Json)
}

async fn delete_webhook(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<WebhookIdResponse>> {
    let id = SubscriptionId(id);
    state.store.delete(id).await?;
    info!(%id, "webhook deleted");
    Ok(Json(WebhookIdResponse { id }))
}

async fn fetch(state: &AppState, id: SubscriptionId) -> ApiResult<WebhookItem> {
    let page = state.store.query(&QueryCondition::by_id(id)).await?;
    page.items
        .into_iter()
        .next()
        .map(WebhookItem::from)
        .ok_or_else(|| ApiError::NotFound(format!("subscription {id} not found")))
}

fn validate_url(url: &str, production: bool) -> ApiResult<()> {
    let url = url.trim();
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(ApiError::BadRequest("url must start with http:// or https://".to_string()));
    }
    if production && (url.contains("localhost") || url.contains("127.0.0.1")) {
        return Err(ApiError::BadRequest("url cannot target localhost in production".to_string()));
    }
    Ok(())
}
