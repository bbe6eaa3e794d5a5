use crate::db::history::HistoryRepository;
use crate::db::models::{DbService, now_timestamp};
use crate::error::VaultError;
use crate::service::event_bus::Listener;
use crate::types::event::Action;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Published after a service mutation succeeds. The snapshot is sealed, so
/// nothing on the bus carries plaintext secrets.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceEvent {
    pub service: DbService,
    pub action: Action,
    pub action_date: DateTime<Utc>,
}

impl ServiceEvent {
    pub fn new(service: DbService, action: Action) -> Self {
        Self {
            service,
            action,
            action_date: now_timestamp(),
        }
    }
}

/// Writes every service event into `services_hist`.
pub struct AuditListener {
    history: HistoryRepository,
}

impl AuditListener {
    pub fn new(history: HistoryRepository) -> Self {
        Self { history }
    }
}

#[ractor::async_trait]
impl Listener<ServiceEvent> for AuditListener {
    async fn on_message(&self, event: ServiceEvent) -> Result<(), VaultError> {
        self.history.record(&event).await?;
        debug!(
            service = %event.service.name,
            user_id = event.service.user_id,
            action = %event.action,
            "audit event stored"
        );
        Ok(())
    }
}
