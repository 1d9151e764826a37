use std::collections::HashSet;
use std::sync::Arc;

use crate::config::{DEFAULT_FAILURE_STATUS_WHITELIST, DispatchMode};
use crate::error::RaisedError;
use crate::services::auth::Principal;
use crate::services::dead_letter::record::{FailureRecord, RequestSnapshot};
use crate::services::dead_letter::sink::DeadLetterSink;

/// Statuses treated as expected client-side outcomes: not logged, not persisted.
#[derive(Debug, Clone)]
pub struct StatusWhitelist(HashSet<u16>);

impl StatusWhitelist {
    pub fn new(statuses: impl IntoIterator<Item = u16>) -> Self {
        Self(statuses.into_iter().collect())
    }

    pub fn contains(&self, status: u16) -> bool {
        self.0.contains(&status)
    }
}

impl Default for StatusWhitelist {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_STATUS_WHITELIST)
    }
}

/// Observes unhandled request errors and writes the unexpected ones to a
/// dead-letter sink.
///
/// `observe` never fails: sink errors (and sink panics) are logged and dropped.
#[derive(Clone)]
pub struct FailureRecorder {
    sink: Arc<dyn DeadLetterSink>,
    whitelist: StatusWhitelist,
    principal_path: String,
    dispatch: DispatchMode,
}

impl std::fmt::Debug for FailureRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailureRecorder")
            .field("sink", &self.sink.backend_name())
            .field("whitelist", &self.whitelist)
            .field("principal_path", &self.principal_path)
            .field("dispatch", &self.dispatch)
            .finish()
    }
}

impl FailureRecorder {
    pub fn new(sink: Arc<dyn DeadLetterSink>) -> Self {
        Self {
            sink,
            whitelist: StatusWhitelist::default(),
            principal_path: String::new(),
            dispatch: DispatchMode::default(),
        }
    }

    pub fn with_whitelist(mut self, whitelist: StatusWhitelist) -> Self {
        self.whitelist = whitelist;
        self
    }

    /// JSON pointer applied to the principal before it is stored as `user`.
    pub fn with_principal_path(mut self, path: impl Into<String>) -> Self {
        self.principal_path = path.into();
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn sink_backend(&self) -> &'static str {
        self.sink.backend_name()
    }

    pub fn dispatch(&self) -> DispatchMode {
        self.dispatch
    }

    pub fn is_whitelisted(&self, status: u16) -> bool {
        self.whitelist.contains(status)
    }

    pub async fn observe(
        &self,
        error: &RaisedError,
        request: &RequestSnapshot,
        principal: Option<&Principal>,
    ) {
        let status = error.derived_status();
        if self.is_whitelisted(status) {
            return;
        }

        let detail = match &error.stack {
            Some(stack) => stack.clone(),
            None => error.raw.to_string(),
        };
        tracing::warn!(
            url = %request.url,
            params = ?request.params,
            query = ?request.query,
            status,
            error = %detail,
            "[APP_ERROR_AT] unexpected request failure"
        );

        let user = principal.and_then(|p| p.at(&self.principal_path)).cloned();
        let record = FailureRecord::build(error, request, user);

        // The write runs as its own task: a dropped request future (client
        // disconnect) does not cancel it, and a panicking sink stays contained.
        let sink = Arc::clone(&self.sink);
        let write = tokio::spawn(async move { persist(sink.as_ref(), record).await });

        if self.dispatch == DispatchMode::Inline {
            if let Err(err) = write.await {
                tracing::error!(error = %err, "dead letter write task failed");
            }
        }
    }
}

async fn persist(sink: &dyn DeadLetterSink, record: FailureRecord) {
    let record_id = record.id;
    match sink.create(record).await {
        Ok(()) => tracing::debug!(%record_id, backend = sink.backend_name(), "dead letter stored"),
        Err(err) => tracing::error!(
            %record_id,
            backend = sink.backend_name(),
            error = %err,
            "failed to persist dead letter"
        ),
    }
}
