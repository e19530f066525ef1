pub mod events;
pub mod health;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

pub fn v1_router(state: AppState) -> Router {
    Router::new()
        .merge(webhooks::router(state.clone()))
        .merge(events::router(state))
}

pub fn health_router(state: AppState) -> Router {
    health::router(state)
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health_router(state.clone()))
        .merge(v1_router(state))
}
