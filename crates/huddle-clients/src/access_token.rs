//! Twilio access tokens carrying a video grant.

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Lifetime of a minted video token.
pub const VIDEO_TOKEN_TTL_SECS: i64 = 4 * 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoGrant {
    pub room: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grants {
    pub identity: String,
    pub video: VideoGrant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub jti: String,
    /// API key SID.
    pub iss: String,
    /// Account SID.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub grants: Grants,
}

/// Sign a token letting `identity` join the call `room`.
pub fn video_access_token(
    account_sid: &str,
    api_key: &str,
    api_secret: &str,
    identity: &str,
    room: &str,
) -> Result<String, ClientError> {
    let now = Utc::now().timestamp();
    let claims = AccessTokenClaims {
        jti: format!("{api_key}-{now}"),
        iss: api_key.to_string(),
        sub: account_sid.to_string(),
        iat: now,
        exp: now + VIDEO_TOKEN_TTL_SECS,
        grants: Grants {
            identity: identity.to_string(),
            video: VideoGrant {
                room: room.to_string(),
            },
        },
    };

    let mut header = Header::new(Algorithm::HS256);
    header.cty = Some("twilio-fpa;v=1".into());
    jsonwebtoken::encode(&header, &claims, &EncodingKey::from_secret(api_secret.as_bytes()))
        .map_err(|e| ClientError::Signing(format!("access token: {e}")))
}
