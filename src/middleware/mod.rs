/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth::access (bearer + role guard), failure (dead-letter recorder), http (transport)
 */
pub mod auth;
pub mod context;
pub mod failure;
pub mod http;

pub use context::RequestContext;
