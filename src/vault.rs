use crate::config::Config;
use crate::db::{Database, HistoryRepository, ServiceRepository, TagRepository, UserRepository};
use crate::error::VaultError;
use crate::service::audit::{AuditListener, ServiceEvent};
use crate::service::event_bus::{self, EventBusHandle};
use std::sync::Arc;
use tracing::info;

/// Wires the repositories, the event bus and the audit listener together.
#[derive(Clone)]
pub struct Vault {
    pub db: Database,
    pub users: UserRepository,
    pub services: ServiceRepository,
    pub tags: TagRepository,
    pub history: HistoryRepository,
    pub events: EventBusHandle<ServiceEvent>,
}

impl Vault {
    pub async fn open(cfg: &Config) -> Result<Self, VaultError> {
        let db = Database::connect(&cfg.database_url, cfg.max_connections).await?;
        Self::with_database(db, cfg).await
    }

    pub async fn with_database(db: Database, cfg: &Config) -> Result<Self, VaultError> {
        let events = event_bus::spawn::<ServiceEvent>().await?;
        let history = HistoryRepository::new(db.clone());
        events
            .subscribe(Arc::new(AuditListener::new(history.clone())))
            .await?;
        info!(
            search_threshold = cfg.search_threshold,
            "vault opened, audit listener subscribed"
        );

        Ok(Self {
            users: UserRepository::new(db.clone(), cfg.kdf.clone()),
            services: ServiceRepository::new(db.clone(), events.clone(), cfg.search_threshold),
            tags: TagRepository::new(db.clone()),
            history,
            events,
            db,
        })
    }

    /// Wait until every audit event published so far is persisted.
    pub async fn flush_audit(&self) -> Result<(), VaultError> {
        self.events.flush().await
    }
}
