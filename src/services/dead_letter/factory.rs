/// Factory: build the dead-letter sink and `FailureRecorder` from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::repos::dead_letter_repo::DeadLetterRepo;
use crate::repos::error::RepoError;
use crate::services::dead_letter::{DeadLetterSink, FailureRecorder, StatusWhitelist, TracingSink};

/// Postgres when `DATABASE_URL` is set, otherwise the log-only sink.
pub async fn build_sink(config: &Config) -> Result<Arc<dyn DeadLetterSink>, RepoError> {
    match config.database_url.as_deref() {
        Some(url) => {
            let pool = sqlx::PgPool::connect(url).await?;
            let repo = DeadLetterRepo::new(pool);
            repo.ensure_schema().await?;
            Ok(Arc::new(repo))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; dead letters are written to the log only");
            Ok(Arc::new(TracingSink))
        }
    }
}

pub fn build_failure_recorder(
    config: &Config,
    sink: Arc<dyn DeadLetterSink>,
) -> Arc<FailureRecorder> {
    let recorder = FailureRecorder::new(sink)
        .with_whitelist(StatusWhitelist::new(
            config.failure_status_whitelist.iter().copied(),
        ))
        .with_principal_path(config.failure_principal_path.clone())
        .with_dispatch(config.dead_letter_dispatch);

    Arc::new(recorder)
}
