/// Factory: build `AccessController` from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::{AccessController, JwtVerifier, RoleRequirements};

pub fn build_access_controller(
    config: &Config,
    requirements: RoleRequirements,
) -> Arc<AccessController> {
    let verifier = JwtVerifier::new(
        &config.jwt_secret,
        config.jwt_algorithm,
        config.jwt_issuer.as_deref(),
        config.jwt_audience.as_deref(),
        config.access_token_leeway_seconds,
    );

    let controller = AccessController::new(Arc::new(verifier))
        .with_role_claim_path(config.role_claim_path.clone())
        .with_role_mismatch_status(config.role_mismatch_status)
        .with_requirements(requirements);

    Arc::new(controller)
}
