use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{encode_base64, http_client, send, VisionProvider, MAX_OUTPUT_TOKENS, PING_PROMPT};
use crate::config::{Secret, DEFAULT_REQUEST_TIMEOUT};
use crate::error::ProviderError;
use crate::types::{ImagePayload, ProviderKind};

/// Anthropic reports an overloaded API with this non-standard status.
const OVERLOADED: u16 = 529;

/// Claude API client via Anthropic's messages endpoint.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: Option<Secret>,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl AnthropicProvider {
    pub fn new(api_key: Option<Secret>, model: impl Into<String>) -> Self {
        Self {
            client: http_client(DEFAULT_REQUEST_TIMEOUT),
            api_key,
            base_url: "https://api.anthropic.com".into(),
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
            Some(ref key) if key.expose().starts_with("sk-ant-") => Ok(key.expose()),
            Some(_) => Err(ProviderError::Auth(
                "ANTHROPIC_API_KEY must start with 'sk-ant-'".into(),
            )),
            None => Err(ProviderError::Auth("ANTHROPIC_API_KEY is not set".into())),
        }
    }

    fn vision_body(&self, image: &ImagePayload, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": MAX_OUTPUT_TOKENS,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": image.media_type.as_str(),
                            "data": encode_base64(&image.bytes),
                        }
                    },
                    { "type": "text", "text": prompt }
                ]
            }]
        })
    }

    async fn messages(&self, body: &Value) -> Result<String, ProviderError> {
        let key = self.api_key()?;

        let req = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(body);

        let text = send(req, &[OVERLOADED], self.timeout).await?;
        reply_text(&text)
    }
}

/// Join the text blocks of a messages reply.
fn reply_text(body: &str) -> Result<String, ProviderError> {
    let parsed: Value =
        serde_json::from_str(body).map_err(|e| ProviderError::Response(e.to_string()))?;

    let blocks = parsed["content"]
        .as_array()
        .ok_or_else(|| ProviderError::Response("reply has no content".into()))?;

    let text: Vec<&str> = blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect();

    if text.is_empty() {
        return Err(ProviderError::Response("reply has no text block".into()));
    }
    Ok(text.join("\n"))
}

#[async_trait]
impl VisionProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn analyze(&self, image: &ImagePayload, prompt: &str) -> Result<String, ProviderError> {
        let body = self.vision_body(image, prompt);
        debug!(
            model = %self.model,
            bytes = image.bytes.len(),
            media_type = image.media_type.as_str(),
            "anthropic vision request"
        );
        self.messages(&body).await
    }

    async fn ping(&self) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.model,
            "max_tokens": 10,
            "messages": [{ "role": "user", "content": PING_PROMPT }],
        });
        self.messages(&body).await
    }
}
