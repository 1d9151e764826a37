/*
 * Responsibility
 * - 環境変数の読み込み (JWT secret, role claim path, dead-letter 設定など)
 * - 設定値のバリデーション (不足・不正なら起動失敗)
 */
use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::StatusCode;
use jsonwebtoken::Algorithm;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }
}

/// How a failure record reaches the dead-letter sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Spawn the write; the response does not wait and a client disconnect
    /// does not cancel it.
    #[default]
    Background,
    /// Await the write before the response is returned.
    Inline,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

pub const DEFAULT_FAILURE_STATUS_WHITELIST: [u16; 4] = [400, 401, 403, 404];

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub database_url: Option<String>,

    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    pub access_token_leeway_seconds: u64,

    // JSON pointer into the token claims
    pub role_claim_path: String,
    pub role_mismatch_status: StatusCode,

    pub failure_status_whitelist: Vec<u16>,
    // JSON pointer into the principal; "" stores the whole principal
    pub failure_principal_path: String,
    pub dead_letter_dispatch: DispatchMode,

    pub request_body_limit_bytes: usize,
    pub request_timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match var("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(var("APP_ENV"));

        let database_url = var("DATABASE_URL").filter(|s| !s.trim().is_empty());

        let jwt_secret = var("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let jwt_algorithm = match var("JWT_ALGORITHM").as_deref() {
            None | Some("HS256") => Algorithm::HS256,
            Some("HS384") => Algorithm::HS384,
            Some("HS512") => Algorithm::HS512,
            Some(_) => return Err(ConfigError::Invalid("JWT_ALGORITHM")),
        };

        let jwt_issuer = var("JWT_ISSUER").filter(|s| !s.trim().is_empty());
        let jwt_audience = var("JWT_AUDIENCE").filter(|s| !s.trim().is_empty());

        let access_token_leeway_seconds =
            parse_or(var("ACCESS_TOKEN_LEEWAY_SECONDS"), "ACCESS_TOKEN_LEEWAY_SECONDS", 60)?;

        let role_claim_path = var("ROLE_CLAIM_PATH").unwrap_or_else(|| "/user/type".to_string());
        if !is_json_pointer(&role_claim_path) {
            return Err(ConfigError::Invalid("ROLE_CLAIM_PATH"));
        }

        let role_mismatch_status = match var("ROLE_MISMATCH_STATUS").as_deref() {
            None | Some("401") => StatusCode::UNAUTHORIZED,
            Some("403") => StatusCode::FORBIDDEN,
            Some(_) => return Err(ConfigError::Invalid("ROLE_MISMATCH_STATUS")),
        };

        let failure_status_whitelist = match var("FAILURE_STATUS_WHITELIST") {
            Some(raw) => parse_status_list(&raw)
                .ok_or(ConfigError::Invalid("FAILURE_STATUS_WHITELIST"))?,
            None => DEFAULT_FAILURE_STATUS_WHITELIST.to_vec(),
        };

        let failure_principal_path = var("FAILURE_PRINCIPAL_PATH").unwrap_or_default();
        if !is_json_pointer(&failure_principal_path) {
            return Err(ConfigError::Invalid("FAILURE_PRINCIPAL_PATH"));
        }

        let dead_letter_dispatch = match var("DEAD_LETTER_DISPATCH")
            .map(|s| s.to_ascii_lowercase())
            .as_deref()
        {
            None | Some("background") => DispatchMode::Background,
            Some("inline") => DispatchMode::Inline,
            Some(_) => return Err(ConfigError::Invalid("DEAD_LETTER_DISPATCH")),
        };

        let request_body_limit_bytes =
            parse_or(var("REQUEST_BODY_LIMIT_BYTES"), "REQUEST_BODY_LIMIT_BYTES", 1024 * 1024)?;

        let request_timeout_seconds =
            parse_or(var("REQUEST_TIMEOUT_SECONDS"), "REQUEST_TIMEOUT_SECONDS", 30)?;

        Ok(Self {
            addr,
            app_env,
            database_url,
            jwt_secret,
            jwt_algorithm,
            jwt_issuer,
            jwt_audience,
            access_token_leeway_seconds,
            role_claim_path,
            role_mismatch_status,
            failure_status_whitelist,
            failure_principal_path,
            dead_letter_dispatch,
            request_body_limit_bytes,
            request_timeout_seconds,
        })
    }
}

// Unset falls back to `default`; set but unparsable is an error.
fn parse_or<T: FromStr>(
    raw: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

// "" or "/a/b"
fn is_json_pointer(path: &str) -> bool {
    path.is_empty() || path.starts_with('/')
}

// Empty entries are skipped; an empty list disables the whitelist.
fn parse_status_list(raw: &str) -> Option<Vec<u16>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u16>()
                .ok()
                .filter(|code| StatusCode::from_u16(*code).is_ok())
        })
        .collect()
}
