use std::sync::Arc;

use anyhow::Context;
use db::DbService;
use services::services::{
    auth::AuthService,
    board_connections::BoardConnections,
    cluster_bus::{ClusterBus, LoopbackBus, RedisBus},
    sync::BoardSync,
};

pub mod config;
pub mod error;
pub mod principal;
pub mod routes;
pub mod ws;

use config::Config;

/// Every process-wide handle, constructed once at startup and passed
/// explicitly to handlers through axum state. Nothing here is a global.
#[derive(Clone)]
pub struct AppState {
    db: DbService,
    connections: BoardConnections,
    bus: Arc<dyn ClusterBus>,
    sync: BoardSync,
    auth: AuthService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let db = DbService::new(&config.database_path)
            .await
            .context("failed to open database")?;

        let bus: Arc<dyn ClusterBus> = match &config.redis_url {
            Some(url) => {
                tracing::info!("using Redis cluster bus");
                Arc::new(
                    RedisBus::connect(url, "boardsync:events")
                        .await
                        .context("failed to connect cluster bus")?,
                )
            }
            None => {
                tracing::info!("no REDIS_URL configured, using in-process bus");
                Arc::new(LoopbackBus::new())
            }
        };

        let sync = BoardSync::new(db.pool.clone(), bus.clone());
        let auth = AuthService::new(config.token_secret.clone());

        Ok(Self {
            db,
            connections: BoardConnections::new(),
            bus,
            sync,
            auth,
        })
    }

    pub fn db(&self) -> &DbService {
        &self.db
    }

    pub fn connections(&self) -> &BoardConnections {
        &self.connections
    }

    pub fn bus(&self) -> &Arc<dyn ClusterBus> {
        &self.bus
    }

    pub fn sync(&self) -> &BoardSync {
        &self.sync
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }
}
