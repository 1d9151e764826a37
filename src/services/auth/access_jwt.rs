use std::collections::HashSet;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::Value;
use thiserror::Error;

use crate::services::auth::principal::Principal;

// Errors returned by credential verification. The middleware collapses all of
// them into a single "invalid credential" rejection.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("jwt verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("claims are not a JSON object")]
    NotAnObject,
}

/// Verifies a bearer credential and decodes it into a [`Principal`].
///
/// Async so implementations may fetch keys remotely. Dropping the future
/// cancels verification.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal, VerifyError>;
}

/// HMAC (shared secret) JWT verifier.
///
/// - signature is always checked
/// - `exp` / `nbf` are checked when present (with leeway)
/// - `iss` / `aud` are required and checked only when configured
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("JwtVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtVerifier {
    pub fn new(
        secret: &str,
        algorithm: Algorithm,
        issuer: Option<&str>,
        audience: Option<&str>,
        leeway_seconds: u64,
    ) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        let mut validation = Validation::new(algorithm);
        validation.leeway = leeway_seconds;
        validation.validate_nbf = true;
        validation.required_spec_claims = HashSet::new();

        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
            validation.required_spec_claims.insert("iss".to_string());
        }

        match audience {
            Some(audience) => {
                validation.set_audience(&[audience]);
                validation.required_spec_claims.insert("aud".to_string());
            }
            // Tokens carrying an `aud` would otherwise be rejected.
            None => validation.validate_aud = false,
        }

        Self {
            decoding_key,
            validation,
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, VerifyError> {
        let data = jsonwebtoken::decode::<Value>(token, &self.decoding_key, &self.validation)?;

        if !data.claims.is_object() {
            return Err(VerifyError::NotAnObject);
        }

        Ok(Principal::new(data.claims))
    }
}
