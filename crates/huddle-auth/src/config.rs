//! Handoff configuration.

/// Configuration for handoff tokens and the sessions they create.
#[derive(Debug, Clone)]
pub struct HandoffConfig {
    /// Shared HMAC key used to sign handoff tokens.
    pub signing_key: String,
    /// Handoff token and login key lifetime in seconds (default: 8 hours).
    pub token_lifetime_secs: u64,
    /// Lifetime of sessions created by redemption (default: 8 hours).
    pub session_lifetime_secs: u64,
    /// JWT issuer (`iss` claim).
    pub issuer: String,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            signing_key: String::new(),
            token_lifetime_secs: 8 * 3600,
            session_lifetime_secs: 8 * 3600,
            issuer: "huddle".into(),
        }
    }
}
