//! Signed, time-limited bearer tokens.
//!
//! A token is `base64url(claims).base64url(hmac_sha256(claims))`, where the
//! claims are a small JSON object naming the user and the validity window.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use keeper_core::types::CallerIdentity;
use keeper_core::SecretString;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;

use crate::error::{Result, VaultError};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    uid: String,
    iat: i64,
    exp: i64,
}

/// Issues and verifies bearer tokens with a shared HMAC key.
pub struct TokenIssuer {
    key: SecretString,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(key: SecretString, ttl: Duration) -> Self {
        Self { key, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(self.key.expose_bytes())
            .map_err(|e| VaultError::Token(e.to_string()))
    }

    /// Issue a token for `user_id`, valid from now for the configured lifetime.
    pub fn issue(&self, user_id: &str) -> Result<String> {
        self.issue_at(user_id, Utc::now())
    }

    pub fn issue_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<String> {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            uid: user_id.to_string(),
            iat: now.timestamp(),
            exp: now.timestamp().saturating_add(ttl),
        };
        let body = serde_json::to_vec(&claims).map_err(|e| VaultError::Token(e.to_string()))?;

        let mut mac = self.mac()?;
        mac.update(&body);
        let tag = mac.finalize().into_bytes();

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(body),
            URL_SAFE_NO_PAD.encode(tag)
        ))
    }

    /// Check signature and expiry, returning the identity the token binds to.
    pub fn verify(&self, token: &str) -> Result<CallerIdentity> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<CallerIdentity> {
        let malformed = || VaultError::Unauthenticated("malformed token".to_string());

        let (body_b64, tag_b64) = token.split_once('.').ok_or_else(malformed)?;
        let body = URL_SAFE_NO_PAD.decode(body_b64).map_err(|_| malformed())?;
        let tag = URL_SAFE_NO_PAD.decode(tag_b64).map_err(|_| malformed())?;

        let mut mac = self.mac()?;
        mac.update(&body);
        mac.verify_slice(&tag)
            .map_err(|_| VaultError::Unauthenticated("bad token signature".to_string()))?;

        let claims: Claims = serde_json::from_slice(&body).map_err(|_| malformed())?;
        let issued_at = Utc.timestamp_opt(claims.iat, 0).single().ok_or_else(malformed)?;
        let expires_at = Utc.timestamp_opt(claims.exp, 0).single().ok_or_else(malformed)?;

        let identity = CallerIdentity {
            user_id: claims.uid,
            issued_at,
            expires_at,
        };
        if identity.user_id.is_empty() {
            return Err(malformed());
        }
        if identity.is_expired_at(now) {
            return Err(VaultError::Unauthenticated("token expired".to_string()));
        }
        Ok(identity)
    }
}
