pub mod config;
pub mod error;
pub mod events;
pub mod image;
pub mod inference;
pub mod parser;
pub mod retry;
pub mod types;
pub mod validate;

use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use config::{Config, ModelConfig, ProviderCredentials, Secret};
pub use error::{
    ConfigError, ImageError, ParseError, PipelineError, ProviderError, Stage, StageError,
    ValidationFailure,
};
pub use events::PipelineEvent;
pub use inference::{build_provider, VisionProvider, ANALYSIS_PROMPT};
pub use retry::RetryPolicy;
pub use types::{AnalysisResult, CandidateItem, ImagePayload, InventoryItem, MediaType, ProviderKind};

/// Pipeline settings. Built once, shared by every run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_image_bytes: u64,
    /// Deadline for each individual provider call.
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub models: ModelConfig,
    pub prompt: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: image::DEFAULT_MAX_IMAGE_BYTES,
            request_timeout: config::DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
            models: ModelConfig::default(),
            prompt: ANALYSIS_PROMPT.into(),
        }
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_image_bytes: config.max_image_bytes,
            request_timeout: config.request_timeout,
            models: config.models.clone(),
            ..Self::default()
        }
    }
}

/// Analyze one photo with the adapter for `provider`.
pub async fn run(
    photo_path: &Path,
    provider: ProviderKind,
    credentials: &ProviderCredentials,
    config: &PipelineConfig,
) -> Result<AnalysisResult, PipelineError> {
    Pipeline::for_provider(provider, credentials, config.clone())
        .run(photo_path)
        .await
}

/// Photo in, validated inventory out: Loading, Analyzing, Parsing, Validating.
///
/// Any stage failure ends the run with a [`PipelineError`] naming that stage.
/// Only throttled provider calls are retried.
pub struct Pipeline {
    provider: Box<dyn VisionProvider>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(provider: impl VisionProvider + 'static, config: PipelineConfig) -> Self {
        Self {
            provider: Box::new(provider),
            config,
        }
    }

    pub fn for_provider(
        kind: ProviderKind,
        credentials: &ProviderCredentials,
        config: PipelineConfig,
    ) -> Self {
        let provider = build_provider(kind, credentials, &config.models, config.request_timeout);
        Self::new(provider, config)
    }

    pub async fn run(&self, photo_path: &Path) -> Result<AnalysisResult, PipelineError> {
        self.run_stages(photo_path, None, None).await
    }

    /// Like [`run`](Self::run), aborting the provider call or backoff wait
    /// when `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        photo_path: &Path,
        cancel: CancellationToken,
    ) -> Result<AnalysisResult, PipelineError> {
        self.run_stages(photo_path, Some(cancel), None).await
    }

    /// Like [`run`](Self::run), reporting progress on `tx`.
    pub async fn run_streaming(
        &self,
        photo_path: &Path,
        tx: Sender<PipelineEvent>,
    ) -> Result<AnalysisResult, PipelineError> {
        self.run_stages(photo_path, None, Some(tx)).await
    }

    async fn run_stages(
        &self,
        photo_path: &Path,
        cancel: Option<CancellationToken>,
        tx: Option<Sender<PipelineEvent>>,
    ) -> Result<AnalysisResult, PipelineError> {
        let cancel = cancel.unwrap_or_default();
        let tx = tx.as_ref();
        let kind = self.provider.kind();
        let mut warnings = Vec::new();

        // Loading
        enter(Stage::Loading, tx).await;
        let image = image::load(photo_path, self.config.max_image_bytes)
            .await
            .map_err(|e| PipelineError::new(Stage::Loading, e))?;
        warnings.extend(image.warning.clone());

        // Analyzing
        enter(Stage::Analyzing, tx).await;
        let raw = self
            .analyze_with_retry(&image, &cancel, tx)
            .await
            .map_err(|e| PipelineError::new(Stage::Analyzing, e))?;
        debug!(provider = %kind, chars = raw.len(), "provider replied");

        // Parsing
        enter(Stage::Parsing, tx).await;
        let parsed = parser::parse(&raw).map_err(|e| {
            warn!(provider = %kind, "no JSON array in provider reply");
            PipelineError::new(Stage::Parsing, e)
        })?;
        warnings.extend(parsed.warnings);

        // Validating
        enter(Stage::Validating, tx).await;
        let mut items = Vec::with_capacity(parsed.candidates.len());
        for candidate in &parsed.candidates {
            match validate::validate(candidate) {
                Ok(item) => items.push(item),
                Err(failure) => {
                    let reason = format!("'{}' dropped: {failure}", candidate.item_name);
                    debug!(%reason, "candidate rejected");
                    emit(tx, PipelineEvent::ItemDropped { reason: reason.clone() }).await;
                    warnings.push(reason);
                }
            }
        }

        let total = parsed.total_entries;
        let dropped = total - items.len();
        if total == 0 {
            warnings.push("no food items detected".into());
        } else if items.is_empty() {
            return Err(PipelineError::new(
                Stage::Validating,
                StageError::NoValidItems { dropped },
            ));
        } else if dropped > 0 {
            warnings.push(format!("{dropped} of {total} entries dropped"));
        }

        info!(provider = %kind, items = items.len(), dropped, "analysis complete");
        emit(tx, PipelineEvent::Finished { items: items.len() }).await;

        Ok(AnalysisResult::new(kind, items, warnings, raw))
    }

    async fn analyze_with_retry(
        &self,
        image: &ImagePayload,
        cancel: &CancellationToken,
        tx: Option<&Sender<PipelineEvent>>,
    ) -> Result<String, StageError> {
        let policy = &self.config.retry;
        let deadline = self.config.request_timeout;
        let mut attempt = 1;

        loop {
            let call = tokio::time::timeout(deadline, self.provider.analyze(image, &self.config.prompt));
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(attempt, "analysis cancelled");
                    return Err(StageError::Cancelled);
                }
                r = call => r.unwrap_or(Err(ProviderError::Timeout(deadline))),
            };

            let err = match result {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < policy.max_attempts => e,
                Err(e) => {
                    warn!(attempt, kind = e.kind(), error = %e, "provider call failed");
                    return Err(e.into());
                }
            };

            let mut delay = policy.delay_for_retry(attempt);
            if let ProviderError::RateLimited {
                retry_after: Some(after),
                ..
            } = &err
            {
                delay = delay.max((*after).min(policy.max_delay));
            }
            warn!(attempt, ?delay, error = %err, "provider throttled, backing off");
            emit(tx, PipelineEvent::RetryScheduled { attempt, delay }).await;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(attempt, "analysis cancelled during backoff");
                    return Err(StageError::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

async fn enter(stage: Stage, tx: Option<&Sender<PipelineEvent>>) {
    debug!(%stage, "pipeline stage");
    emit(tx, PipelineEvent::StageStarted { stage }).await;
}

async fn emit(tx: Option<&Sender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    // --- Mock Provider ---

    struct MockProvider {
        responses: Mutex<VecDeque<Result<String, ProviderError>>>,
        calls: Arc<AtomicU32>,
    }

    impl MockProvider {
        fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Arc::new(AtomicU32::new(0)),
            }
        }

        fn replying(text: impl Into<String>) -> Self {
            Self::new(vec![Ok(text.into())])
        }

        fn calls(&self) -> Arc<AtomicU32> {
            self.calls.clone()
        }
    }

    #[async_trait]
    impl VisionProvider for MockProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::OpenAi
        }

        async fn analyze(&self, _: &ImagePayload, _: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or(Err(ProviderError::Request("no more mock responses".into())))
        }

        async fn ping(&self) -> Result<String, ProviderError> {
            Ok("pong".into())
        }
    }

    // --- Slow Provider ---

    struct SlowProvider;

    #[async_trait]
    impl VisionProvider for SlowProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Anthropic
        }

        async fn analyze(&self, _: &ImagePayload, _: &str) -> Result<String, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("[]".into())
        }

        async fn ping(&self) -> Result<String, ProviderError> {
            Ok("pong".into())
        }
    }

    // --- Throttle Then Cancel ---

    /// Gets throttled, and the caller gives up while waiting to retry.
    struct ThrottleThenCancel {
        cancel: CancellationToken,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl VisionProvider for ThrottleThenCancel {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Aws
        }

        async fn analyze(&self, _: &ImagePayload, _: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.cancel.cancel();
            Err(rate_limited())
        }

        async fn ping(&self) -> Result<String, ProviderError> {
            Ok("pong".into())
        }
    }

    // --- Helpers ---

    fn photo(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"\xFF\xD8\xFFfake-jpeg").unwrap();
        path
    }

    fn rate_limited() -> ProviderError {
        ProviderError::RateLimited {
            retry_after: None,
            message: "slow down".into(),
        }
    }

    fn fridge_reply() -> String {
        format!(
            "Sure! Here's the inventory:\n```json\n{}\n```\nHope that helps.",
            json!([
                {"item_name": "milk carton", "quantity": 1, "confidence": 0.92, "is_leftover": false},
                {"item_name": "lasagna in tupperware", "quantity": 1, "confidence": 0.7, "is_leftover": true},
                {"item_name": "eggs", "quantity": 6, "confidence": 0.85, "is_leftover": false}
            ])
        )
    }

    // --- Tests ---

    #[tokio::test]
    async fn well_formed_reply_yields_validated_items() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(MockProvider::replying(fridge_reply()), PipelineConfig::default());

        let result = pipeline.run(&photo(&dir, "fridge.jpg")).await.unwrap();
        assert_eq!(result.provider(), ProviderKind::OpenAi);
        assert_eq!(result.items().len(), 3);
        assert_eq!(result.items()[0].item_name, "milk carton");
        assert!(result.items()[1].is_leftover);
        assert_eq!(result.items()[2].quantity, 6);
        assert!(result.warnings().is_empty());
        assert_eq!(result.raw_response(), fridge_reply());
        for item in result.items() {
            assert!(!item.item_name.trim().is_empty());
            assert!(item.quantity >= 1);
            assert!((0.0..=1.0).contains(&item.confidence));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_retried_until_success() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new(vec![
            Err(rate_limited()),
            Err(rate_limited()),
            Ok(fridge_reply()),
        ]);
        let calls = provider.calls();
        let pipeline = Pipeline::new(provider, PipelineConfig::default());

        let start = tokio::time::Instant::now();
        let result = pipeline.run(&photo(&dir, "fridge.png")).await.unwrap();
        assert_eq!(result.items().len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s then 2s, plus jitter.
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_lengthens_backoff_up_to_cap() {
        let dir = tempfile::tempdir().unwrap();
        let throttled = |secs| ProviderError::RateLimited {
            retry_after: Some(Duration::from_secs(secs)),
            message: "slow down".into(),
        };
        let provider = MockProvider::new(vec![
            Err(throttled(10)),
            Err(throttled(120)),
            Ok(fridge_reply()),
        ]);
        let pipeline = Pipeline::new(provider, PipelineConfig::default());
        let (tx, mut rx) = tokio::sync::mpsc::channel(32);

        let start = tokio::time::Instant::now();
        pipeline
            .run_streaming(&photo(&dir, "fridge.jpg"), tx)
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(40));

        let mut delays = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let PipelineEvent::RetryScheduled { delay, .. } = event {
                delays.push(delay);
            }
        }
        // 10s from the header; 120s is held to the 30s max_delay.
        assert_eq!(delays, [Duration::from_secs(10), Duration::from_secs(30)]);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_gives_up_after_max_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new(vec![
            Err(rate_limited()),
            Err(rate_limited()),
            Err(rate_limited()),
            Ok(fridge_reply()),
        ]);
        let calls = provider.calls();
        let pipeline = Pipeline::new(provider, PipelineConfig::default());

        let err = pipeline.run(&photo(&dir, "fridge.jpg")).await.unwrap_err();
        assert_eq!(err.stage, Stage::Analyzing);
        assert_eq!(err.kind(), "ProviderRateLimitError");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn no_retry_policy_makes_a_single_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new(vec![Err(rate_limited()), Ok(fridge_reply())]);
        let calls = provider.calls();
        let config = PipelineConfig {
            retry: RetryPolicy::no_retry(),
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(provider, config);

        let err = pipeline.run(&photo(&dir, "fridge.jpg")).await.unwrap_err();
        assert_eq!(err.kind(), "ProviderRateLimitError");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn auth_error_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new(vec![
            Err(ProviderError::Auth("bad key".into())),
            Ok(fridge_reply()),
        ]);
        let calls = provider.calls();
        let pipeline = Pipeline::new(provider, PipelineConfig::default());

        let err = pipeline.run(&photo(&dir, "fridge.jpg")).await.unwrap_err();
        assert_eq!(err.stage, Stage::Analyzing);
        assert!(matches!(err.cause, StageError::Provider(ProviderError::Auth(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn api_error_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new(vec![Err(ProviderError::ApiError {
            status: 500,
            body: "boom".into(),
        })]);
        let calls = provider.calls();
        let pipeline = Pipeline::new(provider, PipelineConfig::default());

        let err = pipeline.run(&photo(&dir, "fridge.jpg")).await.unwrap_err();
        assert_eq!(err.kind(), "ProviderRequestError");
        assert!(err.to_string().contains("500"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_photo_fails_at_loading() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::replying(fridge_reply());
        let calls = provider.calls();
        let pipeline = Pipeline::new(provider, PipelineConfig::default());

        let err = pipeline.run(&dir.path().join("missing.jpg")).await.unwrap_err();
        assert_eq!(err.stage, Stage::Loading);
        assert_eq!(err.kind(), "ImageNotFoundError");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn oversized_photo_fails_at_loading() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            max_image_bytes: 4,
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(MockProvider::replying(fridge_reply()), config);

        let err = pipeline.run(&photo(&dir, "fridge.jpg")).await.unwrap_err();
        assert_eq!(err.kind(), "ImageTooLargeError");
    }

    #[tokio::test]
    async fn prose_only_reply_fails_at_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            MockProvider::replying("I'm sorry, I can't identify anything."),
            PipelineConfig::default(),
        );

        let err = pipeline.run(&photo(&dir, "fridge.jpg")).await.unwrap_err();
        assert_eq!(err.stage, Stage::Parsing);
        assert!(matches!(err.cause, StageError::Parse(ParseError::Malformed)));
    }

    #[tokio::test]
    async fn zero_quantity_item_is_dropped_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let reply = json!([
            {"item_name": "butter", "quantity": 0, "confidence": 0.9, "is_leftover": false},
            {"item_name": "cheese", "quantity": 2, "confidence": 1.4, "is_leftover": false}
        ])
        .to_string();
        let pipeline = Pipeline::new(MockProvider::replying(reply), PipelineConfig::default());

        let result = pipeline.run(&photo(&dir, "fridge.jpg")).await.unwrap();
        assert_eq!(result.items().len(), 1);
        assert_eq!(result.items()[0].item_name, "cheese");
        assert_eq!(result.items()[0].confidence, 1.0);
        assert!(result.warnings().iter().any(|w| w.contains("clamped")));
        assert!(result.warnings().iter().any(|w| w.contains("'butter' dropped")));
        assert!(result.warnings().iter().any(|w| w == "1 of 2 entries dropped"));
    }

    #[tokio::test]
    async fn no_surviving_items_fails_at_validating() {
        let dir = tempfile::tempdir().unwrap();
        let reply = json!([
            {"item_name": "", "quantity": 1, "confidence": 0.9, "is_leftover": false},
            {"item_name": "soup", "quantity": 1, "confidence": 0.9, "is_leftover": "maybe"},
            {"quantity": 1}
        ])
        .to_string();
        let pipeline = Pipeline::new(MockProvider::replying(reply), PipelineConfig::default());

        let err = pipeline.run(&photo(&dir, "fridge.jpg")).await.unwrap_err();
        assert_eq!(err.stage, Stage::Validating);
        assert!(matches!(err.cause, StageError::NoValidItems { dropped: 3 }));
        assert!(err.to_string().contains("no valid items"));
    }

    #[tokio::test]
    async fn empty_fridge_is_success_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            MockProvider::replying("The fridge is empty: []"),
            PipelineConfig::default(),
        );

        let result = pipeline.run(&photo(&dir, "fridge.jpg")).await.unwrap();
        assert!(result.items().is_empty());
        assert_eq!(result.warnings(), ["no food items detected".to_string()]);
    }

    #[tokio::test]
    async fn unknown_extension_warning_reaches_result() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(MockProvider::replying(fridge_reply()), PipelineConfig::default());

        let result = pipeline.run(&photo(&dir, "fridge.bmp")).await.unwrap();
        assert!(result.warnings()[0].contains("bmp"));
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_provider_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            request_timeout: Duration::from_secs(30),
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(SlowProvider, config);

        let err = pipeline.run(&photo(&dir, "fridge.jpg")).await.unwrap_err();
        assert_eq!(err.stage, Stage::Analyzing);
        assert_eq!(err.kind(), "ProviderTimeoutError");
    }

    #[tokio::test]
    async fn cancellation_aborts_provider_call() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let pipeline = Pipeline::new(SlowProvider, PipelineConfig::default());
        let err = pipeline
            .run_with_cancel(&photo(&dir, "fridge.jpg"), cancel)
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::Analyzing);
        assert!(matches!(err.cause, StageError::Cancelled));
    }

    #[tokio::test]
    async fn cancellation_aborts_backoff() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let provider = ThrottleThenCancel {
            cancel: cancel.clone(),
            calls: Arc::new(AtomicU32::new(0)),
        };
        let calls = provider.calls.clone();
        let pipeline = Pipeline::new(provider, PipelineConfig::default());

        let err = pipeline
            .run_with_cancel(&photo(&dir, "fridge.jpg"), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err.cause, StageError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn streaming_reports_stages_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let reply = json!([
            {"item_name": "ham", "quantity": 1, "confidence": 0.6, "is_leftover": false},
            {"item_name": "  ", "quantity": 1, "confidence": 0.6, "is_leftover": false}
        ])
        .to_string();
        let provider = MockProvider::new(vec![Err(rate_limited()), Ok(reply)]);
        let pipeline = Pipeline::new(provider, PipelineConfig::default());

        let (tx, mut rx) = tokio::sync::mpsc::channel(64);
        let result = pipeline
            .run_streaming(&photo(&dir, "fridge.jpg"), tx)
            .await
            .unwrap();
        assert_eq!(result.items().len(), 1);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        let stages: Vec<Stage> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::StageStarted { stage } => Some(*stage),
                _ => None,
            })
            .collect();
        assert_eq!(
            stages,
            [Stage::Loading, Stage::Analyzing, Stage::Parsing, Stage::Validating]
        );
        assert!(events
            .iter()
            .any(|e| matches!(e, PipelineEvent::RetryScheduled { attempt: 1, .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, PipelineEvent::ItemDropped { .. })));
        assert_eq!(events.last(), Some(&PipelineEvent::Finished { items: 1 }));
    }

    #[tokio::test]
    async fn run_without_credentials_fails_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = photo(&dir, "fridge.jpg");
        let credentials = ProviderCredentials::default();
        let config = PipelineConfig::default();

        for kind in [ProviderKind::OpenAi, ProviderKind::Anthropic, ProviderKind::Aws] {
            let err = run(&path, kind, &credentials, &config).await.unwrap_err();
            assert_eq!(err.stage, Stage::Analyzing, "{kind}");
            assert_eq!(err.kind(), "ProviderAuthError", "{kind}");
        }
    }
}
