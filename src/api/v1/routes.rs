/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health は public、それ以外は access guard を route_layer で適用
 * - route ごとの required roles もここで宣言する (matched path で lookup)
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware;
use crate::services::auth::RoleRequirements;
use crate::state::AppState;

use crate::api::v1::handlers::{
    admin::admin_stats, health::health, me::me, reports::submit_report,
};

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(me))
        .route("/admin/stats", get(admin_stats))
        .route("/reports", post(submit_report));
    let protected = middleware::auth::access::apply(protected, state);

    Router::new().route("/health", get(health)).merge(protected)
}

/// Keys are full matched paths, i.e. including the `/api/v1` prefix.
pub fn role_requirements() -> RoleRequirements {
    RoleRequirements::new()
        .require("/api/v1/admin/stats", ["admin"])
        .require("/api/v1/reports", ["admin", "user"])
}
