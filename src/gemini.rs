//! Client for the Gemini `generateContent` endpoint. Callers talk to the
//! `ModelClient` trait so that request handling can be exercised without a
//! network.

use crate::config::{ApiKey, ModelSettings};
use crate::images::EncodedImage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::*;
use url::Url;

/// Errors from an outbound model call
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// One prompt: the text part followed by zero or more images
#[derive(Debug, Clone)]
pub struct Prompt {
    pub text: String,
    pub images: Vec<EncodedImage>,
}

/// The model's answer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    text: Option<String>,
}

impl Reply {
    pub fn new(text: impl Into<String>) -> Self {
        Reply {
            text: Some(text.into()),
        }
    }

    /// A reply that carries no text, e.g. a safety block
    pub fn empty() -> Self {
        Reply { text: None }
    }

    /// The reply text, if there is any non-empty text at all
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<Reply, ModelError>;
}

/// Wire types for `generateContent`
pub(crate) mod protocol {
    use super::*;

    #[derive(Debug, Serialize)]
    pub struct GenerateContentRequest {
        pub contents: Vec<Content>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Content {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub role: Option<String>,
        #[serde(default)]
        pub parts: Vec<Part>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum Part {
        Text {
            text: String,
        },
        InlineData {
            #[serde(rename = "inlineData")]
            inline_data: Blob,
        },
        /// Parts this client does not read, e.g. function calls
        Other(serde_json::Value),
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Blob {
        pub mime_type: String,
        pub data: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GenerateContentResponse {
        #[serde(default)]
        pub candidates: Vec<Candidate>,
        pub prompt_feedback: Option<PromptFeedback>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Candidate {
        pub content: Option<Content>,
        pub finish_reason: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PromptFeedback {
        pub block_reason: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ErrorResponse {
        pub error: ErrorBody,
    }

    #[derive(Debug, Deserialize)]
    pub struct ErrorBody {
        pub message: String,
    }

    impl From<&Prompt> for GenerateContentRequest {
        fn from(prompt: &Prompt) -> Self {
            let mut parts = vec![Part::Text {
                text: prompt.text.clone(),
            }];
            parts.extend(prompt.images.iter().map(|image| Part::InlineData {
                inline_data: Blob {
                    mime_type: image.mime_type.to_string(),
                    data: image.to_base64(),
                },
            }));

            GenerateContentRequest {
                contents: vec![Content {
                    role: Some("user".into()),
                    parts,
                }],
            }
        }
    }

    impl From<GenerateContentResponse> for Reply {
        fn from(response: GenerateContentResponse) -> Reply {
            if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
                warn!("prompt was blocked: {reason}");
                return Reply::empty();
            }

            let Some(candidate) = response.candidates.into_iter().next() else {
                return Reply::empty();
            };
            if let Some(reason) = &candidate.finish_reason {
                debug!("finish reason: {reason}");
            }

            let text: String = candidate
                .content
                .map(|c| c.parts)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|part| match part {
                    Part::Text { text } => Some(text),
                    _ => None,
                })
                .collect();

            Reply { text: Some(text) }
        }
    }
}

/// Pull a readable message out of an error body
pub(crate) fn error_message(body: &str) -> String {
    match serde_json::from_str::<protocol::ErrorResponse>(body) {
        Ok(err) => err.error.message,
        Err(_) => body.trim().to_string(),
    }
}

/// Build the shared HTTP client, with an optional timeout
pub(crate) fn http_client(timeout_secs: Option<u64>) -> Result<reqwest::Client, ModelError> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

/// Talks to the hosted Gemini REST API
pub struct GeminiClient {
    http: reqwest::Client,
    url: Url,
    api_key: ApiKey,
}

impl GeminiClient {
    pub fn new(settings: &ModelSettings, api_key: ApiKey) -> Result<Self, ModelError> {
        Ok(GeminiClient {
            http: http_client(settings.timeout_secs)?,
            url: generate_url(&settings.base_url, &settings.name)?,
            api_key,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// `{base}models/{model}:generateContent`
pub fn generate_url(base_url: &str, model: &str) -> Result<Url, ModelError> {
    let base = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    };
    let model = model.trim_start_matches("models/");
    Url::parse(&base)
        .and_then(|base| base.join(&format!("models/{model}:generateContent")))
        .map_err(|e| ModelError::InvalidRequest(e.to_string()))
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GeminiClient {{ url: {} }}", self.url)
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    #[tracing::instrument(skip_all, fields(images = prompt.images.len()))]
    async fn generate(&self, prompt: &Prompt) -> Result<Reply, ModelError> {
        let body = protocol::GenerateContentRequest::from(prompt);

        debug!("sending generateContent request to {}", self.url);
        let response = self
            .http
            .post(self.url.clone())
            .header("x-goog-api-key", self.api_key.expose())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            warn!("model call failed with status {status}");
            return Err(ModelError::Api {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let parsed: protocol::GenerateContentResponse = serde_json::from_str(&text)?;
        info!("model returned {} candidate(s)", parsed.candidates.len());
        Ok(parsed.into())
    }
}
