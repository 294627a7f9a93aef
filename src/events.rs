use std::time::Duration;

use crate::error::Stage;

/// Progress emitted during a streaming pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StageStarted { stage: Stage },
    RetryScheduled { attempt: u32, delay: Duration },
    ItemDropped { reason: String },
    Finished { items: usize },
}
