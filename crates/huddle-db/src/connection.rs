//! SurrealDB connection management.

use std::time::Duration;

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::{info, warn};

use crate::error::DbError;
use crate::schema::run_migrations;

#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket address, e.g. `127.0.0.1:8000`.
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
    /// Connection attempts before giving up; at least one is made.
    pub connect_attempts: u32,
    /// Pause between failed attempts.
    pub retry_delay: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "huddle".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
            connect_attempts: 5,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Owns the client every repository is built from.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Open the connection and bring the schema up to date. The store
    /// often starts alongside the server, so refused connections are
    /// retried up to `connect_attempts` times.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        let attempts = config.connect_attempts.max(1);
        let mut attempt = 1;
        let db = loop {
            match Self::open(config).await {
                Ok(db) => break db,
                Err(e) if attempt < attempts => {
                    warn!(
                        url = %config.url,
                        attempt,
                        attempts,
                        error = %e,
                        "SurrealDB not reachable, retrying"
                    );
                    tokio::time::sleep(config.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        run_migrations(&db).await?;
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connected to SurrealDB"
        );
        Ok(Self { db })
    }

    async fn open(config: &DbConfig) -> Result<Surreal<Client>, DbError> {
        let db = Surreal::new::<Ws>(&config.url).await?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;
        Ok(db)
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
