//! HS256 handoff token issuance/verification and opaque secret
//! generation.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::HandoffConfig;
use crate::error::AuthError;

/// Claims carried by a handoff token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffClaims {
    /// Account ID (UUID string).
    pub uid: String,
    /// External workspace key of the conference.
    pub team: String,
    /// The account's login key at minting time.
    pub secret: String,
    /// Room the user was heading to.
    #[serde(rename = "roomName")]
    pub room_name: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issue a signed handoff token.
pub fn issue_handoff_token(
    account_id: Uuid,
    workspace_id: &str,
    login_key: &str,
    room_name: &str,
    config: &HandoffConfig,
) -> Result<String, AuthError> {
    if config.signing_key.is_empty() {
        return Err(AuthError::Crypto("handoff signing key is not configured".into()));
    }
    let now = Utc::now().timestamp();
    let claims = HandoffClaims {
        uid: account_id.to_string(),
        team: workspace_id.to_string(),
        secret: login_key.to_string(),
        room_name: room_name.to_string(),
        iss: config.issuer.clone(),
        iat: now,
        exp: now + config.token_lifetime_secs as i64,
    };

    let key = EncodingKey::from_secret(config.signing_key.as_bytes());
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

/// Verify signature, issuer and expiry of a handoff token.
pub fn decode_handoff_token(
    token: &str,
    config: &HandoffConfig,
) -> Result<HandoffClaims, AuthError> {
    let key = DecodingKey::from_secret(config.signing_key.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    validation.set_required_spec_claims(&["exp", "iat", "iss"]);

    jsonwebtoken::decode::<HandoffClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Fresh per-account login key (48 random bytes, hex-encoded).
pub fn generate_login_key() -> String {
    random_hex(48)
}

/// Fresh opaque session token, `r:` followed by 24 random bytes in hex.
pub fn generate_session_token() -> String {
    format!("r:{}", random_hex(24))
}

/// SHA-256 of a raw session token, hex-encoded. This is what the
/// session table stores.
pub fn hash_session_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
