//! Access token minting and verification for the credential issuer.
//!
//! Tokens are `base64url(claims-json) . base64url(sha256(secret || claims-json))`.
//! Claims carry the user id and a validity window: issued 60 seconds in the
//! past to absorb clock skew, expiring 24 hours later.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Clock-skew grace applied to the issued-at claim
const ISSUED_AT_GRACE_SECS: i64 = 60;

/// Token validity window
const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("malformed token")]
    Malformed,

    #[error("token signature mismatch")]
    BadSignature,

    #[error("token expired")]
    Expired,
}

/// Claims embedded in an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
}

impl TokenClaims {
    /// Decode claims without checking the signature.
    ///
    /// This is the client-side view: holders of a token can read their own
    /// validity window but cannot verify it was minted by the issuer.
    pub fn decode(token: &str) -> Result<Self, AuthError> {
        let payload = token.split('.').next().ok_or(AuthError::Malformed)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::Malformed)?;
        serde_json::from_slice(&bytes).map_err(|_| AuthError::Malformed)
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }
}

/// Mint a signed token for `user_id`.
pub fn mint_token(secret: &str, user_id: &str) -> String {
    let iat = Utc::now().timestamp() - ISSUED_AT_GRACE_SECS;
    let claims = TokenClaims {
        user_id: user_id.to_string(),
        iat,
        exp: iat + TOKEN_TTL_SECS,
    };

    // Serializing a struct with only string/int fields cannot fail
    let payload = serde_json::to_vec(&claims).expect("claims serialize");

    format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(&payload),
        URL_SAFE_NO_PAD.encode(sign(secret, &payload))
    )
}

/// Verify a token's signature and expiry, returning its claims.
pub fn verify_token(secret: &str, token: &str) -> Result<TokenClaims, AuthError> {
    let (payload_b64, sig_b64) = token.split_once('.').ok_or(AuthError::Malformed)?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AuthError::Malformed)?;
    let sig = URL_SAFE_NO_PAD
        .decode(sig_b64)
        .map_err(|_| AuthError::Malformed)?;

    if sign(secret, &payload) != sig {
        return Err(AuthError::BadSignature);
    }

    let claims: TokenClaims =
        serde_json::from_slice(&payload).map_err(|_| AuthError::Malformed)?;

    if claims.is_expired() {
        return Err(AuthError::Expired);
    }

    Ok(claims)
}

fn sign(secret: &str, payload: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(payload);
    hasher.finalize().to_vec()
}
