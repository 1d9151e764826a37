use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode, header};
use thiserror::Error;

use crate::error::AppError;
use crate::services::auth::access_jwt::TokenVerifier;
use crate::services::auth::principal::Principal;

/// Why a request was not admitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("missing credential")]
    MissingCredential,
    #[error("invalid credential: {detail}")]
    InvalidCredential { detail: String },
    #[error("no required role held")]
    Forbidden,
}

/// Required roles per route pattern (axum matched path, e.g. `/api/v1/admin/stats`).
///
/// Routes without an entry only require a valid credential.
#[derive(Debug, Clone, Default)]
pub struct RoleRequirements {
    by_route: HashMap<String, Vec<String>>,
}

impl RoleRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require<I, R>(mut self, route: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.by_route
            .insert(route.into(), roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn required_for(&self, route: &str) -> &[String] {
        self.by_route.get(route).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Bearer credential validation + role authorization.
///
/// Read-only after construction; shared across requests behind an `Arc`.
pub struct AccessController {
    verifier: Arc<dyn TokenVerifier>,
    role_claim_path: String,
    role_mismatch_status: StatusCode,
    requirements: RoleRequirements,
}

impl std::fmt::Debug for AccessController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessController")
            .field("role_claim_path", &self.role_claim_path)
            .field("role_mismatch_status", &self.role_mismatch_status)
            .field("requirements", &self.requirements)
            .finish_non_exhaustive()
    }
}

impl AccessController {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            verifier,
            role_claim_path: "/user/type".to_string(),
            role_mismatch_status: StatusCode::UNAUTHORIZED,
            requirements: RoleRequirements::default(),
        }
    }

    pub fn with_role_claim_path(mut self, path: impl Into<String>) -> Self {
        self.role_claim_path = path.into();
        self
    }

    pub fn with_role_mismatch_status(mut self, status: StatusCode) -> Self {
        self.role_mismatch_status = status;
        self
    }

    pub fn with_requirements(mut self, requirements: RoleRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn required_roles(&self, route: Option<&str>) -> &[String] {
        route
            .map(|r| self.requirements.required_for(r))
            .unwrap_or(&[])
    }

    /// Decide whether a request carrying `headers` may proceed.
    ///
    /// 1. extract `Authorization: Bearer <token>`
    /// 2. verify the token
    /// 3. if `required_roles` is non-empty, the principal must hold at least one of them
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        required_roles: &[String],
    ) -> Result<Principal, AuthorizationError> {
        let token = extract_bearer(headers).ok_or(AuthorizationError::MissingCredential)?;

        let principal = self.verifier.verify(token).await.map_err(|err| {
            AuthorizationError::InvalidCredential {
                detail: err.to_string(),
            }
        })?;

        if !required_roles.is_empty() {
            let held = principal.roles_at(&self.role_claim_path);
            if !required_roles.iter().any(|role| held.contains(role)) {
                tracing::debug!(
                    required = ?required_roles,
                    held = ?held,
                    "role check failed"
                );
                return Err(AuthorizationError::Forbidden);
            }
        }

        Ok(principal)
    }

    /// Map a rejection onto the application error taxonomy.
    pub fn reject(&self, err: AuthorizationError) -> AppError {
        match err {
            AuthorizationError::MissingCredential => AppError::MissingCredential,
            AuthorizationError::InvalidCredential { detail } => {
                AppError::InvalidCredential { detail }
            }
            AuthorizationError::Forbidden => AppError::Forbidden {
                status: self.role_mismatch_status,
            },
        }
    }
}

/// `Authorization: <scheme> <token>` with exactly two whitespace-separated
/// parts and the scheme spelled `Bearer`.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;

    let mut parts = value.split_whitespace();
    let (scheme, token) = (parts.next()?, parts.next()?);
    if parts.next().is_some() || scheme != "Bearer" {
        return None;
    }

    Some(token)
}
