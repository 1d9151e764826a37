/*
 * Responsibility
 * - v1 の公開ポイント (routes() / role_requirements() の re-export など)
 */
pub mod extractors;
pub mod handlers;
mod routes;

pub use routes::{role_requirements, routes};
