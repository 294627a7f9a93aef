use std::path::PathBuf;
use std::time::Duration;

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Loading,
    Analyzing,
    Parsing,
    Validating,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Loading => "Loading",
            Stage::Analyzing => "Analyzing",
            Stage::Parsing => "Parsing",
            Stage::Validating => "Validating",
        };
        f.write_str(name)
    }
}

/// Terminal failure of a pipeline run, tagged with the stage that failed.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {cause}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub cause: StageError,
}

impl PipelineError {
    pub fn new(stage: Stage, cause: impl Into<StageError>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }

    /// Short machine-friendly name of the underlying error class.
    pub fn kind(&self) -> &'static str {
        match &self.cause {
            StageError::Image(e) => e.kind(),
            StageError::Provider(e) => e.kind(),
            StageError::Parse(_) => "MalformedResponseError",
            StageError::NoValidItems { .. } => "ValidationFailure",
            StageError::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("no valid items ({dropped} dropped)")]
    NoValidItems { dropped: usize },
    #[error("cancelled")]
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("image is empty: {0}")]
    Empty(PathBuf),
    #[error("image is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },
}

impl ImageError {
    pub fn kind(&self) -> &'static str {
        match self {
            ImageError::NotFound(_) => "ImageNotFoundError",
            ImageError::Read { .. } | ImageError::Empty(_) => "ImageReadError",
            ImageError::TooLarge { .. } => "ImageTooLargeError",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("credentials rejected: {0}")]
    Auth(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("API returned {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("rate limited: {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },
    #[error("unreadable response: {0}")]
    Response(String),
}

impl ProviderError {
    /// Only throttling is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Auth(_) => "ProviderAuthError",
            ProviderError::Request(_) | ProviderError::ApiError { .. } => "ProviderRequestError",
            ProviderError::Response(_) => "ProviderRequestError",
            ProviderError::Timeout(_) => "ProviderTimeoutError",
            ProviderError::RateLimited { .. } => "ProviderRateLimitError",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("no JSON array found in response")]
    Malformed,
}

/// Why a single candidate was rejected. Never fatal on its own.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationFailure {
    #[error("item_name is empty")]
    EmptyName,
    #[error("quantity {0} is below 1")]
    QuantityTooLow(i64),
    #[error("quantity {0} is too large")]
    QuantityTooLarge(i64),
    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),
    #[error("is_leftover is not a boolean: {0}")]
    NotBoolean(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown provider '{0}', expected openai, anthropic, or aws")]
    UnknownProvider(String),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}
