use std::time::Duration;

use crate::error::ConfigError;
use crate::image::DEFAULT_MAX_IMAGE_BYTES;
use crate::types::ProviderKind;

pub const DEFAULT_AWS_REGION: &str = "us-east-1";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A secret string. Prints as `[REDACTED]` and can't be serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Secret material for every backend. Read-only once built; share by reference.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub openai_api_key: Option<Secret>,
    pub anthropic_api_key: Option<Secret>,
    pub aws_access_key_id: Option<Secret>,
    pub aws_secret_access_key: Option<Secret>,
    pub aws_region: String,
}

impl ProviderCredentials {
    pub fn validate_openai(&self) -> bool {
        self.openai_api_key
            .as_ref()
            .is_some_and(|k| k.expose().starts_with("sk-"))
    }

    pub fn validate_anthropic(&self) -> bool {
        self.anthropic_api_key
            .as_ref()
            .is_some_and(|k| k.expose().starts_with("sk-ant-"))
    }

    pub fn validate_aws(&self) -> bool {
        let id_ok = self
            .aws_access_key_id
            .as_ref()
            .is_some_and(|k| k.expose().starts_with("AKIA"));
        let secret_ok = self
            .aws_secret_access_key
            .as_ref()
            .is_some_and(|k| !k.expose().is_empty());
        id_ok && secret_ok
    }

    pub fn validate(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::OpenAi => self.validate_openai(),
            ProviderKind::Anthropic => self.validate_anthropic(),
            ProviderKind::Aws => self.validate_aws(),
        }
    }

    /// Which environment variables feed a given provider. For error messages.
    pub fn env_hint(kind: ProviderKind) -> &'static str {
        match kind {
            ProviderKind::OpenAi => "OPENAI_API_KEY (must start with 'sk-')",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY (must start with 'sk-ant-')",
            ProviderKind::Aws => {
                "AWS_ACCESS_KEY_ID (must start with 'AKIA') and AWS_SECRET_ACCESS_KEY"
            }
        }
    }
}

/// Model identifiers, one per backend.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub openai: String,
    pub anthropic: String,
    pub bedrock: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            openai: "gpt-4o".into(),
            anthropic: "claude-sonnet-4-5-20250929".into(),
            bedrock: "anthropic.claude-3-5-sonnet-20240620-v1:0".into(),
        }
    }
}

impl ModelConfig {
    pub fn for_provider(&self, kind: ProviderKind) -> &str {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::Aws => &self.bedrock,
        }
    }

    pub fn set(&mut self, kind: ProviderKind, model: impl Into<String>) {
        let model = model.into();
        match kind {
            ProviderKind::OpenAi => self.openai = model,
            ProviderKind::Anthropic => self.anthropic = model,
            ProviderKind::Aws => self.bedrock = model,
        }
    }
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderKind,
    pub credentials: ProviderCredentials,
    pub models: ModelConfig,
    pub log_level: String,
    pub max_image_bytes: u64,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let secret = |name: &str| get(name).map(Secret::new);

        let provider = match get("AI_SERVICE") {
            Some(s) => s.parse()?,
            None => ProviderKind::OpenAi,
        };

        let credentials = ProviderCredentials {
            openai_api_key: secret("OPENAI_API_KEY"),
            anthropic_api_key: secret("ANTHROPIC_API_KEY"),
            aws_access_key_id: secret("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: secret("AWS_SECRET_ACCESS_KEY"),
            aws_region: get("AWS_REGION").unwrap_or_else(|| DEFAULT_AWS_REGION.into()),
        };

        let mut models = ModelConfig::default();
        if let Some(m) = get("OPENAI_MODEL") {
            models.openai = m;
        }
        if let Some(m) = get("ANTHROPIC_MODEL") {
            models.anthropic = m;
        }
        if let Some(m) = get("BEDROCK_MODEL_ID") {
            models.bedrock = m;
        }

        let max_image_bytes = match get("MAX_IMAGE_BYTES") {
            Some(v) => parse_positive("MAX_IMAGE_BYTES", &v)?,
            None => DEFAULT_MAX_IMAGE_BYTES,
        };

        let request_timeout = match get("REQUEST_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_positive("REQUEST_TIMEOUT_SECS", &v)?),
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        Ok(Self {
            provider,
            credentials,
            models,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "INFO".into()),
            max_image_bytes,
            request_timeout,
        })
    }
}

fn parse_positive(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        }),
    }
}
