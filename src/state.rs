/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - access: AccessController, recorder: FailureRecorder
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::{auth::AccessController, dead_letter::FailureRecorder};

#[derive(Clone, Debug)]
pub struct AppState {
    pub access: Arc<AccessController>,
    pub recorder: Arc<FailureRecorder>,
    // Max request body buffered for failure records
    pub body_limit: usize,
}

impl AppState {
    pub fn new(
        access: Arc<AccessController>,
        recorder: Arc<FailureRecorder>,
        body_limit: usize,
    ) -> Self {
        Self {
            access,
            recorder,
            body_limit,
        }
    }
}
