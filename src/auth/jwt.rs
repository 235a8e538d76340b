use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::Claims;
use crate::config::{AuthConfig, MAX_TOKEN_TTL_MINUTES};
use crate::error::AuthError;

/// Why a token was refused. Kept for logs and tests; callers only ever see
/// "no user".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenRejection {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not verify")]
    BadSignature,
    #[error("token issuer or audience mismatch")]
    WrongIssuerOrAudience,
    #[error("token expired")]
    Expired,
    #[error("token subject does not exist")]
    UnknownSubject,
    #[error("token subject is inactive")]
    InactiveSubject,
}

/// HS256 signing and verification keys with the token policy.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl TokenKeys {
    pub fn from_config(cfg: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::minutes(cfg.token_ttl_minutes.clamp(0, MAX_TOKEN_TTL_MINUTES)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn sign(&self, user_id: Uuid, now: OffsetDateTime) -> Result<String, AuthError> {
        let exp = now.checked_add(self.ttl).ok_or(AuthError::TokenLifetime)?;
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, exp = claims.exp, "token signed");
        Ok(token)
    }

    /// Checks signature, issuer, audience and expiry against `now`.
    /// Expiry is exclusive: a token is dead once `now >= exp`.
    pub fn verify(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenRejection> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        // expiry is checked below against the caller's clock, without leeway
        validation.validate_exp = false;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenRejection::BadSignature,
                ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
                    TokenRejection::WrongIssuerOrAudience
                }
                _ => TokenRejection::Malformed,
            }
        })?;

        if data.claims.exp <= now.unix_timestamp() {
            return Err(TokenRejection::Expired);
        }
        debug!(user_id = %data.claims.sub, "token verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
pub(crate) fn test_auth_config(ttl_minutes: i64) -> AuthConfig {
    AuthConfig {
        secret: "test-secret".into(),
        issuer: "test-issuer".into(),
        audience: "test-aud".into(),
        token_ttl_minutes: ttl_minutes,
        password_min_length: 8,
        hash: crate::config::HashConfig {
            time_cost: 1,
            memory_kib: 256,
            parallelism: 1,
        },
    }
}
