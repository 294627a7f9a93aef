pub mod anthropic;
pub mod bedrock;
pub mod openai;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::{ModelConfig, ProviderCredentials};
use crate::error::ProviderError;
use crate::types::{ImagePayload, ProviderKind};

/// Instruction sent with every photo, identical across backends so their
/// replies come back in the same shape.
pub const ANALYSIS_PROMPT: &str = "Analyze this image and identify all food items visible.
For each item, provide:
- item_name: specific food product
- quantity: count of discrete items
- confidence: 0-1 score
- is_leftover: boolean for containers/homemade food

Return results as a JSON list.";

/// Short text-only request used by connectivity checks.
pub const PING_PROMPT: &str = "Say 'API connection successful'";

pub const MAX_OUTPUT_TOKENS: u32 = 1000;

/// One vision API call. Image and prompt in, reply text out.
/// No retries here; the pipeline owns that.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn analyze(&self, image: &ImagePayload, prompt: &str) -> Result<String, ProviderError>;

    /// Cheap text-only round trip to check credentials and connectivity.
    async fn ping(&self) -> Result<String, ProviderError>;
}

#[async_trait]
impl VisionProvider for Box<dyn VisionProvider> {
    fn kind(&self) -> ProviderKind {
        (**self).kind()
    }

    async fn analyze(&self, image: &ImagePayload, prompt: &str) -> Result<String, ProviderError> {
        (**self).analyze(image, prompt).await
    }

    async fn ping(&self) -> Result<String, ProviderError> {
        (**self).ping().await
    }
}

/// Build the adapter for `kind`. Credentials are copied in but not checked
/// until the first call.
pub fn build_provider(
    kind: ProviderKind,
    credentials: &ProviderCredentials,
    models: &ModelConfig,
    timeout: Duration,
) -> Box<dyn VisionProvider> {
    let model = models.for_provider(kind);
    match kind {
        ProviderKind::OpenAi => Box::new(
            openai::OpenAiProvider::new(credentials.openai_api_key.clone(), model)
                .with_timeout(timeout),
        ),
        ProviderKind::Anthropic => Box::new(
            anthropic::AnthropicProvider::new(credentials.anthropic_api_key.clone(), model)
                .with_timeout(timeout),
        ),
        ProviderKind::Aws => {
            Box::new(bedrock::BedrockProvider::new(credentials, model).with_timeout(timeout))
        }
    }
}

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

fn request_error(e: reqwest::Error, timeout: Duration) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::Request(e.to_string())
    }
}

/// Send a prepared request and return the body of a 2xx reply, mapping
/// throttling and auth statuses onto their own error classes.
pub(crate) async fn send(
    req: reqwest::RequestBuilder,
    throttle_statuses: &[u16],
    timeout: Duration,
) -> Result<String, ProviderError> {
    let resp = req.send().await.map_err(|e| request_error(e, timeout))?;

    let status = resp.status().as_u16();
    let retry_after = resp
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);

    let text = resp.text().await.map_err(|e| request_error(e, timeout))?;

    match status {
        200..=299 => Ok(text),
        s if s == 429 || throttle_statuses.contains(&s) => Err(ProviderError::RateLimited {
            retry_after,
            message: text,
        }),
        401 | 403 => Err(ProviderError::Auth(format!("HTTP {status}: {text}"))),
        _ => Err(ProviderError::ApiError { status, body: text }),
    }
}

pub(crate) fn data_url(image: &ImagePayload) -> String {
    format!(
        "data:{};base64,{}",
        image.media_type.as_str(),
        encode_base64(&image.bytes)
    )
}

pub(crate) fn encode_base64(bytes: &[u8]) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine};
    STANDARD.encode(bytes)
}
