//! The relay front end: forwards free text to a fixed JSON endpoint with a
//! bearer token and shows whatever JSON comes back.

use crate::config::{ApiKey, RelaySettings};
use crate::gemini::{error_message, http_client, ModelError};
use crate::page::*;
use async_trait::async_trait;
use serde::Serialize;
use tracing::*;
use url::Url;

#[async_trait]
pub trait Relay: Send + Sync {
    async fn send(&self, input: &str) -> Result<serde_json::Value, ModelError>;
}

#[derive(Debug, Serialize)]
struct RelayBody<'a> {
    input: &'a str,
}

pub struct RelayClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: ApiKey,
}

impl RelayClient {
    pub fn new(settings: &RelaySettings, api_key: ApiKey) -> Result<Self, ModelError> {
        let endpoint = Url::parse(&settings.endpoint)
            .map_err(|e| ModelError::InvalidRequest(format!("bad relay endpoint: {e}")))?;
        Ok(RelayClient {
            http: http_client(settings.timeout_secs)?,
            endpoint,
            api_key,
        })
    }
}

impl std::fmt::Debug for RelayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RelayClient {{ endpoint: {} }}", self.endpoint)
    }
}

#[async_trait]
impl Relay for RelayClient {
    #[tracing::instrument(skip_all)]
    async fn send(&self, input: &str) -> Result<serde_json::Value, ModelError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.expose())
            .json(&RelayBody { input })
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ModelError::Api {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Handle one press of the relay's submit button
pub async fn relay(client: &dyn Relay, input: &str) -> Page {
    let mut page = Page::new(RELAY_TITLE);
    let input = input.trim();
    if input.is_empty() {
        page.error(NO_TEXT);
        return page;
    }

    match client.send(input).await {
        Ok(value) => {
            page.heading(RESULTS_HEADING);
            page.json(value);
        }
        Err(e) => {
            error!("relay call failed: {e}");
            page.error(format!("Error processing the request: {e}"));
        }
    }
    page
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::sync::Mutex;

    /// A `Relay` that echoes a fixed value and records inputs
    pub struct FakeRelay {
        pub reply: Option<serde_json::Value>,
        pub inputs: Mutex<Vec<String>>,
    }

    impl FakeRelay {
        pub fn new(reply: Option<serde_json::Value>) -> Self {
            FakeRelay {
                reply,
                inputs: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl Relay for FakeRelay {
        async fn send(&self, input: &str) -> Result<serde_json::Value, ModelError> {
            self.inputs.lock().unwrap().push(input.to_string());
            self.reply.clone().ok_or(ModelError::Api {
                status: 503,
                message: "service unavailable".into(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test::FakeRelay;
    use super::*;
    use crate::gemini::test::Upstream;
    use actix_web::http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_body_shape() {
        let body = serde_json::to_value(RelayBody { input: "hello" }).unwrap();
        assert_eq!(body, json!({ "input": "hello" }));
    }

    #[tokio::test]
    async fn test_reply_shown_verbatim() {
        let reply = json!({ "output": "bonjour", "tokens": [1, 2] });
        let client = FakeRelay::new(Some(reply.clone()));
        let page = relay(&client, "  translate hello ").await;

        assert_eq!(page.results(), Some(&[Block::Json { value: reply }][..]));
        assert_eq!(*client.inputs.lock().unwrap(), ["translate hello"]);
    }

    #[tokio::test]
    async fn test_empty_input_not_sent() {
        let client = FakeRelay::new(Some(json!({})));
        let page = relay(&client, " ").await;

        assert_eq!(page.errors(), [NO_TEXT]);
        assert!(client.inputs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_displayed() {
        let client = FakeRelay::new(None);
        let page = relay(&client, "hello").await;

        let errors = page.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("service unavailable"));
        assert_eq!(page.results(), None);
    }

    fn client_for(upstream: &Upstream) -> RelayClient {
        let settings = RelaySettings {
            endpoint: format!("{}endpoint", upstream.base_url),
            ..RelaySettings::default()
        };
        RelayClient::new(&settings, ApiKey::new("k1").unwrap()).unwrap()
    }

    #[actix_web::test]
    async fn test_send_posts_input_with_bearer_token() {
        let reply = json!({ "output": "hello back" });
        let upstream = Upstream::start(StatusCode::OK, reply.clone()).await;
        let client = client_for(&upstream);

        assert_eq!(client.send("hi").await.unwrap(), reply);

        let requests = upstream.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/endpoint");
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer k1"));
        assert_eq!(requests[0].body, json!({ "input": "hi" }));
        upstream.stop().await;
    }

    #[actix_web::test]
    async fn test_send_maps_error_status() {
        let upstream = Upstream::start(
            StatusCode::BAD_REQUEST,
            json!({ "error": { "message": "nope" } }),
        )
        .await;
        let client = client_for(&upstream);

        let err = client.send("hi").await.unwrap_err();
        assert!(matches!(
            &err,
            ModelError::Api { status: 400, message } if message == "nope"
        ));
        assert_eq!(err.to_string(), "API error 400: nope");

        let page = relay(&client, "hi").await;
        assert_eq!(page.errors(), ["Error processing the request: API error 400: nope"]);
        upstream.stop().await;
    }

    #[test]
    fn test_client_rejects_bad_endpoint() {
        let settings = RelaySettings {
            endpoint: "gemini-pro-api.com/endpoint".into(),
            ..RelaySettings::default()
        };
        let key = ApiKey::new("k").unwrap();
        assert!(RelayClient::new(&settings, key).is_err());
        assert!(RelayClient::new(&RelaySettings::default(), ApiKey::new("k").unwrap()).is_ok());
    }
}
