use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::CsrfConfig;

/// Header carrying the token back on mutating requests.
pub const CSRF_TOKEN_HEADER: &str = "x-csrf-token";

pub const MIN_SECRET_LEN: usize = 32;
pub const MAX_TOKEN_LEN: usize = 1_024;

/// Upper bound on concurrently outstanding nonces the replay cache tracks.
const MAX_TRACKED_NONCES: u64 = 100_000;

/// Rejection reasons surfaced to the client. Messages stay short and
/// say nothing about the signing scheme.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CsrfError {
    #[error("CSRF token missing")]
    Missing,
    #[error("CSRF token rejected")]
    Rejected,
    #[error("CSRF token expired")]
    Expired,
    #[error("CSRF token already used")]
    Replayed,
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    jti: String,
    iat: i64,
    exp: i64,
}

/// Issues one-time anti-forgery tokens and validates them on mutating
/// requests. Validity is stateless (signature plus expiry); single-use
/// comes from a TTL-bounded cache of consumed nonces.
pub struct CsrfGuard {
    enabled: bool,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl_seconds: u64,
    used_nonces: Cache<String, ()>,
}

impl CsrfGuard {
    pub fn new(config: &CsrfConfig) -> Self {
        if config.enabled {
            assert!(
                config.secret.len() >= MIN_SECRET_LEN,
                "CSRF secret below minimum length"
            );
        }
        let ttl = config.token_ttl_seconds;
        assert!(ttl >= 60, "CSRF token TTL must be at least 60 seconds");
        assert!(ttl <= 3_600, "CSRF token TTL cannot exceed one hour");

        // Nonces only need to outlive the tokens they belong to.
        let used_nonces = Cache::builder()
            .max_capacity(MAX_TRACKED_NONCES)
            .time_to_live(Duration::from_secs(ttl))
            .build();

        Self {
            enabled: config.enabled,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            token_ttl_seconds: ttl,
            used_nonces,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Generates a fresh token. No server-side state is written until the
    /// token is presented back.
    pub fn issue(&self) -> Result<String> {
        let issued_at = Utc::now().timestamp();
        let expires_at = issued_at + self.token_ttl_seconds as i64;
        assert!(expires_at > issued_at, "Token expiry must follow issuance");

        let claims = TokenClaims {
            jti: Uuid::new_v4().to_string(),
            iat: issued_at,
            exp: expires_at,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .context("Failed to sign CSRF token")
    }

    /// Fails closed: any decode failure, expiry, or replayed nonce yields a
    /// rejection. Acceptance consumes the nonce, making the token one-shot.
    pub async fn validate(&self, presented: Option<&str>) -> Result<(), CsrfError> {
        if !self.enabled {
            return Ok(());
        }

        let token = presented.map(str::trim).ok_or(CsrfError::Missing)?;
        if token.is_empty() {
            return Err(CsrfError::Missing);
        }
        if token.len() > MAX_TOKEN_LEN {
            return Err(CsrfError::Rejected);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<TokenClaims>(token, &self.decoding_key, &validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => CsrfError::Expired,
                _ => CsrfError::Rejected,
            },
        )?;

        let entry = self
            .used_nonces
            .entry(data.claims.jti)
            .or_insert(())
            .await;
        if !entry.is_fresh() {
            return Err(CsrfError::Replayed);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(secret: &str, enabled: bool) -> CsrfConfig {
        CsrfConfig {
            secret: secret.to_string(),
            token_ttl_seconds: 900,
            enabled,
        }
    }

    fn guard(secret: &str) -> CsrfGuard {
        CsrfGuard::new(&test_config(secret, true))
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";
    const OTHER_SECRET: &str = "fedcba9876543210fedcba9876543210";

    #[tokio::test]
    async fn issued_token_validates_exactly_once() {
        let guard = guard(SECRET);
        let token = guard.issue().expect("token issues");

        assert_eq!(guard.validate(Some(&token)).await, Ok(()));
        assert_eq!(
            guard.validate(Some(&token)).await,
            Err(CsrfError::Replayed)
        );
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let guard = guard(SECRET);
        assert_eq!(guard.validate(None).await, Err(CsrfError::Missing));
        assert_eq!(guard.validate(Some("   ")).await, Err(CsrfError::Missing));
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_rejected() {
        let issuer = guard(OTHER_SECRET);
        let verifier = guard(SECRET);
        let token = issuer.issue().expect("token issues");
        assert_eq!(
            verifier.validate(Some(&token)).await,
            Err(CsrfError::Rejected)
        );
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let guard = guard(SECRET);
        let mut token = guard.issue().expect("token issues");
        token.push('x');
        assert_eq!(guard.validate(Some(&token)).await, Err(CsrfError::Rejected));
        assert_eq!(
            guard.validate(Some("not-a-token")).await,
            Err(CsrfError::Rejected)
        );
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let guard = guard(SECRET);
        let issued_at = Utc::now().timestamp() - 1_000;
        let claims = TokenClaims {
            jti: Uuid::new_v4().to_string(),
            iat: issued_at,
            exp: issued_at + 10,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("token encodes");

        assert_eq!(guard.validate(Some(&token)).await, Err(CsrfError::Expired));
    }

    #[tokio::test]
    async fn disabled_guard_accepts_everything() {
        let guard = CsrfGuard::new(&test_config("", false));
        assert_eq!(guard.validate(None).await, Ok(()));
        assert_eq!(guard.validate(Some("junk")).await, Ok(()));
    }
}
