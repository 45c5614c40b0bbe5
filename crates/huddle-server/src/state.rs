//! Shared request state.

use std::sync::Arc;

use huddle_conference::Gateway;
use huddle_conference::install::InstallService;
use huddle_core::repository::Store;

pub struct AppState<S: Store> {
    pub gateway: Arc<Gateway<S>>,
    pub install: Arc<InstallService<S>>,
    /// Empty disables chat callback signature checks.
    pub chat_signing_secret: Arc<str>,
}

impl<S: Store> AppState<S> {
    pub fn new(
        gateway: Arc<Gateway<S>>,
        install: Arc<InstallService<S>>,
        chat_signing_secret: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            gateway,
            install,
            chat_signing_secret: chat_signing_secret.into(),
        }
    }
}

// Manual impl: `S` itself need not be `Clone`.
impl<S: Store> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            install: self.install.clone(),
            chat_signing_secret: self.chat_signing_secret.clone(),
        }
    }
}
