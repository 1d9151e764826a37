//! Dead-letter sink interface used by the failure recorder.
use async_trait::async_trait;
use thiserror::Error;

use crate::repos::error::RepoError;
use crate::services::dead_letter::record::FailureRecord;

/// Sink-layer errors.
///
/// Note:
/// - The recorder logs and drops these; they never reach the client.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Write side of a dead-letter store.
///
/// Implementations must be safe to share across requests (typically a pool
/// or `Arc<...>` inside).
#[async_trait]
pub trait DeadLetterSink: Send + Sync + 'static {
    // Returns the sink backend name (for logging).
    fn backend_name(&self) -> &'static str;

    async fn create(&self, record: FailureRecord) -> Result<(), SinkError>;
}

/// Fallback sink when no database is configured: the record goes to the log.
#[derive(Clone, Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl DeadLetterSink for TracingSink {
    fn backend_name(&self) -> &'static str {
        "tracing"
    }

    async fn create(&self, record: FailureRecord) -> Result<(), SinkError> {
        let payload =
            serde_json::to_string(&record).map_err(|e| SinkError::Unavailable(e.to_string()))?;

        tracing::warn!(
            record_id = %record.id,
            status = record.status,
            record = %payload,
            "dead letter"
        );

        Ok(())
    }
}
