//! Bearer credential check + role authorization → Principal を extensions に入れる
//!
//! - `Authorization: Bearer <jwt>` を AccessController で検証する
//! - route (matched path) ごとの required roles は AccessController が持つ
//! - 成功時: Principal を request extensions と RequestContext に格納
//! - 失敗時: AppError (401、role mismatch は設定次第で 403) を返し、handler は実行しない

use axum::{
    Router,
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::middleware::RequestContext;
use crate::state::AppState;

/// Guard every route registered on `router` so far.
///
/// 例：
/// ```ignore
/// let protected = Router::new().route("/me", get(me));
/// let protected = middleware::auth::access::apply(protected, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // route_layer: MatchedPath が入った後に走らせる (required roles の lookup に必要)
    router.route_layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned());

    let required_roles = state.access.required_roles(route.as_deref());

    let principal = match state.access.authorize(req.headers(), required_roles).await {
        Ok(principal) => principal,
        Err(err) => {
            tracing::warn!(
                route = route.as_deref().unwrap_or("-"),
                error = %err,
                "access denied"
            );
            return Err(state.access.reject(err));
        }
    };

    if let Some(ctx) = req.extensions().get::<RequestContext>() {
        ctx.attach_principal(principal.clone());
    }

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
