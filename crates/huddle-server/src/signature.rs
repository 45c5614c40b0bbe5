//! Chat platform request signing.
//!
//! Callbacks carry `X-Slack-Signature: v0=<hex>` where the digest is
//! HMAC-SHA256 over `v0:<timestamp>:<raw body>` keyed by the app's
//! signing secret.

use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use hmac::{Hmac, Mac};
use huddle_core::repository::Store;
use sha2::Sha256;
use tracing::warn;

use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

const VERSION: &str = "v0";
/// Replay window for signed requests.
const MAX_SKEW_SECS: i64 = 5 * 60;
const MAX_BODY_BYTES: usize = 1024 * 1024;

fn mac(secret: &str, timestamp: &str, body: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Some(mac)
}

/// Signature header value for `body` sent at `timestamp`.
pub fn sign(secret: &str, timestamp: &str, body: &[u8]) -> Option<String> {
    let digest = mac(secret, timestamp, body)?.finalize().into_bytes();
    Some(format!("{VERSION}={}", hex::encode(digest)))
}

/// Check a request's signature headers against its raw body.
pub fn verify(secret: &str, headers: &HeaderMap, body: &[u8], now: i64) -> Result<(), &'static str> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let timestamp = header(TIMESTAMP_HEADER).ok_or("missing timestamp")?;
    let signature = header(SIGNATURE_HEADER).ok_or("missing signature")?;

    let sent_at: i64 = timestamp.parse().map_err(|_| "malformed timestamp")?;
    if (now - sent_at).abs() > MAX_SKEW_SECS {
        return Err("stale timestamp");
    }

    let digest = signature
        .strip_prefix("v0=")
        .and_then(|hex_digest| hex::decode(hex_digest).ok())
        .ok_or("malformed signature")?;
    mac(secret, timestamp, body)
        .ok_or("unusable secret")?
        .verify_slice(&digest)
        .map_err(|_| "signature mismatch")
}

/// Reject chat callbacks that are not signed with the configured secret.
/// The body is buffered and handed on unchanged.
pub async fn require_chat_signature<S: Store>(
    State(state): State<AppState<S>>,
    request: Request,
    next: Next,
) -> Response {
    if state.chat_signing_secret.is_empty() {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let Ok(bytes) = to_bytes(body, MAX_BODY_BYTES).await else {
        return StatusCode::PAYLOAD_TOO_LARGE.into_response();
    };
    let now = chrono::Utc::now().timestamp();
    if let Err(reason) = verify(&state.chat_signing_secret, &parts.headers, &bytes, now) {
        warn!(path = %parts.uri.path(), reason, "Rejected chat callback");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
