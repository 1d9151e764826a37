/*!
 * Principal extractor
 *
 * Responsibility:
 * - access guard が検証した Principal を handler に提供する
 * - HTTP / axum 依存は core に閉じ込める
 *
 * Public API:
 * - PrincipalExtractor
 */

mod core;

pub use core::PrincipalExtractor;
