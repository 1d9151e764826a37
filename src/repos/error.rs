/**
 * Responsibility
 * - dead letter store (repo) が上位に伝える失敗の定義
 * - sqlx のエラーは source として保持し、message に含める
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("dead letter store query failed: {0}")]
    Db(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;
