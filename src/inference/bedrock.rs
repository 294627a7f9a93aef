use std::time::Duration;

use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_bedrockruntime::config::{Credentials, Region};
use aws_sdk_bedrockruntime::error::{DisplayErrorContext, SdkError};
use aws_sdk_bedrockruntime::operation::converse::ConverseError;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, ConverseOutput, ImageBlock, ImageFormat, ImageSource,
    InferenceConfiguration, Message,
};
use aws_sdk_bedrockruntime::Client;
use tracing::debug;

use super::{VisionProvider, MAX_OUTPUT_TOKENS, PING_PROMPT};
use crate::config::{ProviderCredentials, Secret, DEFAULT_REQUEST_TIMEOUT};
use crate::error::ProviderError;
use crate::types::{ImagePayload, MediaType, ProviderKind};

/// AWS Bedrock Runtime client using the Converse API.
pub struct BedrockProvider {
    access_key_id: Option<Secret>,
    secret_access_key: Option<Secret>,
    region: String,
    model: String,
    timeout: Duration,
}

impl BedrockProvider {
    pub fn new(credentials: &ProviderCredentials, model: impl Into<String>) -> Self {
        Self {
            access_key_id: credentials.aws_access_key_id.clone(),
            secret_access_key: credentials.aws_secret_access_key.clone(),
            region: credentials.aws_region.clone(),
            model: model.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check the static credentials and build an SDK client from them.
    async fn client(&self) -> Result<Client, ProviderError> {
        let key_id = match self.access_key_id {
            Some(ref id) if id.expose().starts_with("AKIA") => id.expose(),
            Some(_) => {
                return Err(ProviderError::Auth(
                    "AWS_ACCESS_KEY_ID must start with 'AKIA'".into(),
                ))
            }
            None => return Err(ProviderError::Auth("AWS_ACCESS_KEY_ID is not set".into())),
        };
        let secret = self
            .secret_access_key
            .as_ref()
            .filter(|s| !s.expose().is_empty())
            .ok_or_else(|| ProviderError::Auth("AWS_SECRET_ACCESS_KEY is not set".into()))?;

        let credentials = Credentials::new(key_id, secret.expose(), None, None, "fridge-inventory");
        Ok(Client::new(&self.sdk_config(credentials).await))
    }

    /// SDK config whose operation timeout is the request deadline, so a
    /// stalled call surfaces as `SdkError::TimeoutError`.
    async fn sdk_config(&self, credentials: Credentials) -> SdkConfig {
        aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .credentials_provider(credentials)
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(self.timeout)
                    .build(),
            )
            .load()
            .await
    }

    async fn converse(&self, message: Message, max_tokens: u32) -> Result<String, ProviderError> {
        let client = self.client().await?;

        let output = client
            .converse()
            .model_id(&self.model)
            .messages(message)
            .inference_config(
                InferenceConfiguration::builder()
                    .max_tokens(max_tokens as i32)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| classify(e, self.timeout))?;

        let Some(ConverseOutput::Message(reply)) = output.output() else {
            return Err(ProviderError::Response("reply has no message".into()));
        };

        let text: Vec<&str> = reply
            .content()
            .iter()
            .filter_map(|block| block.as_text().ok())
            .map(String::as_str)
            .collect();

        if text.is_empty() {
            return Err(ProviderError::Response("reply has no text block".into()));
        }
        Ok(text.join("\n"))
    }
}

fn image_format(media_type: MediaType) -> ImageFormat {
    match media_type {
        MediaType::Jpeg => ImageFormat::Jpeg,
        MediaType::Png => ImageFormat::Png,
        MediaType::Gif => ImageFormat::Gif,
        MediaType::Webp => ImageFormat::Webp,
    }
}

fn classify<R>(err: SdkError<ConverseError, R>, timeout: Duration) -> ProviderError
where
    R: std::fmt::Debug,
{
    if let SdkError::TimeoutError(_) = err {
        return ProviderError::Timeout(timeout);
    }
    let message = DisplayErrorContext(&err).to_string();
    match err.as_service_error() {
        Some(ConverseError::ThrottlingException(_)) => ProviderError::RateLimited {
            retry_after: None,
            message,
        },
        Some(ConverseError::AccessDeniedException(_)) => ProviderError::Auth(message),
        _ => ProviderError::Request(message),
    }
}

fn build_error(e: impl std::fmt::Display) -> ProviderError {
    ProviderError::Request(format!("invalid request: {e}"))
}

#[async_trait]
impl VisionProvider for BedrockProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Aws
    }

    async fn analyze(&self, image: &ImagePayload, prompt: &str) -> Result<String, ProviderError> {
        let image_block = ImageBlock::builder()
            .format(image_format(image.media_type))
            .source(ImageSource::Bytes(Blob::new(image.bytes.clone())))
            .build()
            .map_err(build_error)?;

        let message = Message::builder()
            .role(ConversationRole::User)
            .content(ContentBlock::Image(image_block))
            .content(ContentBlock::Text(prompt.to_string()))
            .build()
            .map_err(build_error)?;

        debug!(
            model = %self.model,
            region = %self.region,
            bytes = image.bytes.len(),
            "bedrock vision request"
        );
        self.converse(message, MAX_OUTPUT_TOKENS).await
    }

    async fn ping(&self) -> Result<String, ProviderError> {
        let message = Message::builder()
            .role(ConversationRole::User)
            .content(ContentBlock::Text(PING_PROMPT.to_string()))
            .build()
            .map_err(build_error)?;
        self.converse(message, 10).await
    }
}
