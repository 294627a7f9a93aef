use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{http_client, send, VisionProvider, MAX_OUTPUT_TOKENS, PING_PROMPT};
use crate::config::{Secret, DEFAULT_REQUEST_TIMEOUT};
use crate::error::ProviderError;
use crate::types::{ImagePayload, ProviderKind};

/// OpenAI chat-completions client. Also works with any server exposing a
/// compatible `/v1/chat/completions` endpoint.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<Secret>,
    model: String,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(api_key: Option<Secret>, model: impl Into<String>) -> Self {
        Self {
            client: http_client(DEFAULT_REQUEST_TIMEOUT),
            base_url: "https://api.openai.com".into(),
            api_key,
            model: model.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self.timeout = timeout;
        self
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        match self.api_key {
            Some(ref key) if key.expose().starts_with("sk-") => Ok(key.expose()),
            Some(_) => Err(ProviderError::Auth(
                "OPENAI_API_KEY must start with 'sk-'".into(),
            )),
            None => Err(ProviderError::Auth("OPENAI_API_KEY is not set".into())),
        }
    }

    fn vision_body(&self, image: &ImagePayload, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": MAX_OUTPUT_TOKENS,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    {
                        "type": "image_url",
                        "image_url": { "url": super::data_url(image), "detail": "high" }
                    }
                ]
            }]
        })
    }

    async fn complete(&self, body: &Value) -> Result<String, ProviderError> {
        let key = self.api_key()?;

        let req = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {key}"))
            .json(body);

        let text = send(req, &[], self.timeout).await?;
        reply_text(&text)
    }
}

/// Pull `choices[0].message.content` out of a chat-completions reply.
fn reply_text(body: &str) -> Result<String, ProviderError> {
    let parsed: Value =
        serde_json::from_str(body).map_err(|e| ProviderError::Response(e.to_string()))?;

    parsed["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ProviderError::Response("reply has no message content".into()))
}

#[async_trait]
impl VisionProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn analyze(&self, image: &ImagePayload, prompt: &str) -> Result<String, ProviderError> {
        let body = self.vision_body(image, prompt);
        debug!(
            model = %self.model,
            bytes = image.bytes.len(),
            "openai vision request"
        );
        self.complete(&body).await
    }

    async fn ping(&self) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.model,
            "max_tokens": 10,
            "messages": [{ "role": "user", "content": PING_PROMPT }],
        });
        self.complete(&body).await
    }
}
