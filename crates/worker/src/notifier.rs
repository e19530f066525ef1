use std::time::Duration;

use async_trait::async_trait;
use hookwire_core::codec::encode_payload;
use hookwire_core::types::DEFAULT_CONTENT_TYPE;
use hookwire_core::{DeliveryError, Event};
use tracing::error;

pub const EVENT_TYPE_HEADER: &str = "X-Hookwire-Event";
pub const SIGNATURE_HEADER: &str = "X-Hookwire-Signature";

/// Transport used to hand one event to one subscriber.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns the raw response body on a non-error status.
    async fn send(
        &self,
        url: &str,
        content_type: &str,
        signature: &str,
        event: &Event,
    ) -> Result<Vec<u8>, DeliveryError>;
}

/// Delivers events with an HTTP POST.
#[derive(Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
}

impl HttpNotifier {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(
        &self,
        url: &str,
        content_type: &str,
        signature: &str,
        event: &Event,
    ) -> Result<Vec<u8>, DeliveryError> {
        let content_type = if content_type.is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            content_type
        };
        let body = encode_payload(content_type, &event.payload).map_err(|source| {
            DeliveryError::Encode {
                url: url.to_string(),
                source,
            }
        })?;

        let transport = |err: reqwest::Error| DeliveryError::Transport {
            url: url.to_string(),
            reason: err.to_string(),
        };

        let resp = self
            .client
            .post(url)
            .header("Content-Type", content_type)
            .header(EVENT_TYPE_HEADER, event.event_type.as_str())
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status().as_u16();
        let data = resp.bytes().await.map_err(transport)?;

        if status >= 400 {
            error!(
                url,
                status,
                response = %String::from_utf8_lossy(&data),
                "subscriber rejected notification"
            );
            return Err(DeliveryError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Bytes,
        extract::State,
        http::{HeaderMap, StatusCode},
        routing::post,
        Router,
    };
    use serde_json::json;
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    #[derive(Debug, Clone)]
    struct Captured {
        headers: HeaderMap,
        body: Bytes,
    }

    type Captures = Arc<Mutex<Vec<Captured>>>;

    async fn capture(State(captures): State<Captures>, headers: HeaderMap, body: Bytes) -> &'static str {
        captures.lock().await.push(Captured { headers, body });
        r#"{"received":true}"#
    }

    async fn reject() -> (StatusCode, &'static str) {
        (StatusCode::SERVICE_UNAVAILABLE, "try later")
    }

    async fn spawn_server() -> (String, Captures) {
        let captures: Captures = Arc::default();
        let app = Router::new()
            .route("/hook", post(capture))
            .route("/down", post(reject))
            .with_state(captures.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), captures)
    }

    #[tokio::test]
    async fn test_send_json_with_headers() {
        let (base, captures) = spawn_server().await;
        let notifier = HttpNotifier::new().unwrap();
        let event = Event::new("push", json!({"ref": "main"}));

        let body = notifier
            .send(&format!("{base}/hook"), "application/json", "sig-123", &event)
            .await
            .unwrap();
        assert_eq!(body, br#"{"received":true}"#.to_vec());

        let captured = captures.lock().await.remove(0);
        assert_eq!(captured.headers["content-type"], "application/json");
        assert_eq!(captured.headers["x-hookwire-event"], "push");
        assert_eq!(captured.headers["x-hookwire-signature"], "sig-123");
        let sent: serde_json::Value = serde_json::from_slice(&captured.body).unwrap();
        assert_eq!(sent, json!({"ref": "main"}));
    }

    #[tokio::test]
    async fn test_send_defaults_to_json() {
        let (base, captures) = spawn_server().await;
        let notifier = HttpNotifier::new().unwrap();

        notifier
            .send(&format!("{base}/hook"), "", "sig", &Event::new("push", json!([1, 2])))
            .await
            .unwrap();

        let captured = captures.lock().await.remove(0);
        assert_eq!(captured.headers["content-type"], "application/json");
        assert_eq!(&captured.body[..], b"[1,2]");
    }

    #[tokio::test]
    async fn test_send_xml_body() {
        let (base, captures) = spawn_server().await;
        let notifier = HttpNotifier::new().unwrap();

        notifier
            .send(
                &format!("{base}/hook"),
                "application/xml",
                "sig",
                &Event::new("push", json!({"name": "alice"})),
            )
            .await
            .unwrap();

        let captured = captures.lock().await.remove(0);
        assert_eq!(captured.headers["content-type"], "application/xml");
        let text = String::from_utf8(captured.body.to_vec()).unwrap();
        assert!(text.contains("<name>alice</name>"), "got {text}");
    }

    #[tokio::test]
    async fn test_send_unknown_content_type_has_empty_body() {
        let (base, captures) = spawn_server().await;
        let notifier = HttpNotifier::new().unwrap();

        notifier
            .send(&format!("{base}/hook"), "text/plain", "sig", &Event::new("push", json!({"a": 1})))
            .await
            .unwrap();

        assert!(captures.lock().await[0].body.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_is_failure() {
        let (base, _) = spawn_server().await;
        let notifier = HttpNotifier::new().unwrap();
        let url = format!("{base}/down");

        let err = notifier
            .send(&url, "application/json", "sig", &Event::new("push", json!({})))
            .await
            .unwrap_err();

        assert_eq!(err, DeliveryError::Status { url: url.clone(), status: 503 });
        assert!(err.to_string().contains(&url));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_not_found_route_is_failure() {
        let (base, _) = spawn_server().await;
        let notifier = HttpNotifier::new().unwrap();

        let err = notifier
            .send(&format!("{base}/missing"), "", "sig", &Event::new("push", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = HttpNotifier::new()
            .unwrap()
            .send(&format!("http://{addr}/hook"), "", "sig", &Event::new("push", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Transport { .. }), "got {err:?}");
    }
}
