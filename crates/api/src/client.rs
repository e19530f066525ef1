//! HTTP client for the `/v1/webhooks` management routes.

use std::time::Duration;

use hookwire_core::{QueryCondition, SubscriptionId, SubscriptionInput};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::ErrorResponse;
use crate::models::{WebhookIdResponse, WebhookItem, WebhookListResponse};

const WEBHOOKS_PATH: &str = "/v1/webhooks";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{status} {code}: {message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Http(err) => err.status(),
            ClientError::Api { status, .. } => Some(*status),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Registers, inspects and removes subscriptions on a running hookwire api.
#[derive(Clone)]
pub struct WebhookClient {
    endpoint: String,
    client: reqwest::Client,
}

impl WebhookClient {
    /// `base_url` is the api root, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            endpoint: format!("{}{WEBHOOKS_PATH}", base_url.trim_end_matches('/')),
            client,
        })
    }

    pub async fn create(&self, input: &SubscriptionInput) -> ClientResult<SubscriptionId> {
        let resp = self.client.post(&self.endpoint).json(input).send().await?;
        let created: WebhookIdResponse = decode(resp).await?;
        Ok(created.id)
    }

    pub async fn update(&self, id: SubscriptionId, input: &SubscriptionInput) -> ClientResult<WebhookItem> {
        let resp = self.client.put(self.item_url(id)).json(input).send().await?;
        decode(resp).await
    }

    /// Only the fields set on `condition` are sent.
    pub async fn query(&self, condition: &QueryCondition) -> ClientResult<WebhookListResponse> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(id) = condition.id {
            params.push(("id", id.to_string()));
        }
        if let Some(url) = &condition.url {
            params.push(("url", url.clone()));
        }
        if let Some(event_type) = &condition.event_type {
            params.push(("event_type", event_type.clone()));
        }
        if let Some(state) = condition.state {
            params.push(("state", state.as_str().to_string()));
        }
        if condition.offset > 0 {
            params.push(("offset", condition.offset.to_string()));
        }
        if condition.page_size > 0 {
            params.push(("page_size", condition.page_size.to_string()));
        }

        let resp = self.client.get(&self.endpoint).query(&params).send().await?;
        decode(resp).await
    }

    pub async fn detail(&self, id: SubscriptionId) -> ClientResult<WebhookItem> {
        let resp = self.client.get(self.item_url(id)).send().await?;
        decode(resp).await
    }

    pub async fn delete(&self, id: SubscriptionId) -> ClientResult<()> {
        let resp = self.client.delete(self.item_url(id)).send().await?;
        let _: WebhookIdResponse = decode(resp).await?;
        Ok(())
    }

    fn item_url(&self, id: SubscriptionId) -> String {
        format!("{}/{id}", self.endpoint)
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> ClientResult<T> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }

    let body = resp.text().await?;
    let (code, message) = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => (err.error.code, err.error.message),
        Err(_) => ("unknown".to_string(), body),
    };
    Err(ClientError::Api {
        status,
        code,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes;
    use crate::state::testing::test_state;
    use hookwire_core::SubscriptionState;
    use tokio::net::TcpListener;

    async fn spawn_api() -> WebhookClient {
        let app = routes::app(test_state(false).await);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        WebhookClient::new(&format!("http://{addr}/")).unwrap()
    }

    fn input(url: &str, events: &[&str]) -> SubscriptionInput {
        SubscriptionInput::new(url)
            .with_secret("s3cret")
            .with_event_types(events.iter().copied())
    }

    #[tokio::test]
    async fn test_create_then_detail() {
        let client = spawn_api().await;
        let id = client.create(&input("http://a.test/hook", &["push"])).await.unwrap();

        let item = client.detail(id).await.unwrap();
        assert_eq!(item.id, id);
        assert_eq!(item.url, "http://a.test/hook");
        assert_eq!(item.state, SubscriptionState::Normal);
        assert_eq!(item.trigger_event_types, vec!["push".to_string()]);
    }

    #[tokio::test]
    async fn test_create_duplicate_is_conflict() {
        let client = spawn_api().await;
        client.create(&input("http://a.test/hook", &["push"])).await.unwrap();

        let err = client.create(&input("http://a.test/hook", &["tag"])).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::CONFLICT));
        assert!(matches!(err, ClientError::Api { ref code, .. } if code == "conflict"));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_url() {
        let client = spawn_api().await;
        let err = client.create(&input("a.test/hook", &["push"])).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn test_update_merges() {
        let client = spawn_api().await;
        let id = client.create(&input("http://a.test/hook", &["push"])).await.unwrap();

        let item = client
            .update(id, &SubscriptionInput::new("http://b.test/hook").with_event_types(["tag"]))
            .await
            .unwrap();
        assert_eq!(item.url, "http://b.test/hook");
        assert_eq!(item.content_type, "application/json");
        assert_eq!(item.trigger_event_types, vec!["tag".to_string()]);
    }

    #[tokio::test]
    async fn test_query_by_event_type_and_state() {
        let client = spawn_api().await;
        client.create(&input("http://a.test/hook", &["push"])).await.unwrap();
        let b = client.create(&input("http://b.test/hook", &["push"])).await.unwrap();
        client.create(&input("http://c.test/hook", &["tag"])).await.unwrap();
        client
            .update(
                b,
                &SubscriptionInput::default()
                    .with_event_types(["push"])
                    .with_state(SubscriptionState::Abnormal),
            )
            .await
            .unwrap();

        let page = client.query(&QueryCondition::by_event_type("push")).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 3);

        let page = client
            .query(&QueryCondition::by_event_type("push").with_state(SubscriptionState::Normal))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].url, "http://a.test/hook");

        let page = client.query(&QueryCondition::default().page(1, 2)).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].url, "http://c.test/hook");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let client = spawn_api().await;
        let id = client.create(&input("http://a.test/hook", &["push"])).await.unwrap();

        client.delete(id).await.unwrap();
        client.delete(id).await.unwrap();

        let err = client.detail(id).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = WebhookClient::new(&format!("http://{addr}")).unwrap();
        let err = client.detail(SubscriptionId(1)).await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)), "got {err:?}");
    }
}
