//! Huddle Server: application entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use huddle_auth::service::HandoffService;
use huddle_clients::HttpClientFactory;
use huddle_clients::slack::SlackInstaller;
use huddle_clients::twilio::TwilioProvisioner;
use huddle_conference::install::InstallService;
use huddle_conference::{ConferenceRegistry, Gateway};
use huddle_db::{DbManager, SurrealStore};
use huddle_server::{AppState, ServerConfig, router};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("huddle=info".parse()?))
        .json()
        .init();

    info!("Starting huddle server...");

    let config = ServerConfig::from_env().context("loading configuration")?;

    let db = DbManager::connect(&config.db)
        .await
        .context("connecting to SurrealDB")?;
    let store = Arc::new(SurrealStore::new(db.client().clone()));

    let http = reqwest::Client::builder()
        .timeout(config.call_timeout)
        .build()
        .context("building HTTP client")?;

    let registry = Arc::new(
        ConferenceRegistry::new(
            store.clone(),
            Arc::new(HttpClientFactory::new(http.clone())),
            config.defaults.clone(),
        )
        .with_call_timeout(config.call_timeout),
    );
    let handoff = Arc::new(HandoffService::new(store.clone(), config.handoff.clone()));
    let gateway = Arc::new(Gateway::new(registry.clone(), handoff));
    let install = Arc::new(InstallService::new(
        store,
        Arc::new(SlackInstaller::new(
            http.clone(),
            &config.chat.client_id,
            &config.chat.client_secret,
        )),
        Arc::new(TwilioProvisioner::new(
            http,
            &config.video_master.account_sid,
            &config.video_master.auth_token,
        )),
        &config.install_success_url,
    ));

    if config.chat.signing_secret.is_empty() {
        warn!("SLACK_SIGNING_SECRET is not set; chat callbacks are not verified");
    }

    if config.skip_init {
        registry
            .roles()
            .create_privileges()
            .await
            .context("creating privileged actions")?;
    } else {
        let report = registry.warm_up().await.context("warming up conferences")?;
        info!(
            resolved = report.succeeded.len(),
            failed = report.failed.len(),
            "Conferences warmed up"
        );
    }

    let state = AppState::new(gateway, install, config.chat.signing_secret.as_str());
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!(addr = %config.bind, "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("Huddle server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
