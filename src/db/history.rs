use crate::db::models::{DbService, parse_timestamp};
use crate::db::sqlite::Database;
use crate::error::VaultError;
use crate::service::audit::ServiceEvent;
use crate::sql::Params;
use crate::types::event::{Action, Event};
use crate::types::user::UserContext;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

const INSERT_HIST: &str = r#"
    INSERT INTO services_hist (
        name, username, password, note, tags, last_update, user_id, action, action_date
    ) VALUES (
        :name, :username, :password, :note, :tags, :last_update, :user_id, :action, :action_date
    )"#;

const SELECT_HIST: &str = r#"
    SELECT name, username, password, note, tags, last_update, user_id, action, action_date
    FROM services_hist
    WHERE user_id = :user_id
    ORDER BY action_date DESC, id DESC"#;

const SELECT_HIST_FOR_SERVICE: &str = r#"
    SELECT name, username, password, note, tags, last_update, user_id, action, action_date
    FROM services_hist
    WHERE user_id = :user_id AND name = :name
    ORDER BY action_date DESC, id DESC"#;

/// Audit trail of service mutations.
#[derive(Clone)]
pub struct HistoryRepository {
    db: Database,
}

impl HistoryRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn record(&self, event: &ServiceEvent) -> Result<(), VaultError> {
        let s = &event.service;
        let params = Params::named()
            .with("name", &s.name)
            .with("username", &s.username)
            .with("password", &s.password)
            .with("note", &s.note)
            .with("tags", serde_json::to_string(&s.tags)?)
            .with("last_update", s.last_update)
            .with("user_id", s.user_id)
            .with("action", event.action.as_str())
            .with("action_date", event.action_date);
        self.db.save_or_update(INSERT_HIST, params).await?;
        Ok(())
    }

    /// All events of the user, newest first.
    pub async fn list(&self, ctx: &UserContext) -> Result<Vec<Event>, VaultError> {
        let params = Params::named().with("user_id", ctx.user_id());
        let rows = self.db.query(SELECT_HIST, params, row_to_event).await?;
        rows.into_iter().map(|e| open_event(e, ctx)).collect()
    }

    pub async fn list_for_service(
        &self,
        ctx: &UserContext,
        name: &str,
    ) -> Result<Vec<Event>, VaultError> {
        let params = Params::named()
            .with("user_id", ctx.user_id())
            .with("name", name);
        let rows = self
            .db
            .query(SELECT_HIST_FOR_SERVICE, params, row_to_event)
            .await?;
        rows.into_iter().map(|e| open_event(e, ctx)).collect()
    }
}

fn row_to_event(row: &SqliteRow) -> Result<ServiceEvent, VaultError> {
    let tags_json: String = row.try_get("tags")?;
    let last_update: String = row.try_get("last_update")?;
    let action: String = row.try_get("action")?;
    let action_date: String = row.try_get("action_date")?;

    let service = DbService {
        name: row.try_get("name")?,
        username: row.try_get("username")?,
        password: row.try_get("password")?,
        note: row.try_get("note")?,
        tags: serde_json::from_str(&tags_json)?,
        last_update: parse_timestamp(&last_update)?,
        user_id: row.try_get("user_id")?,
    };
    let action: Action = action
        .parse()
        .map_err(|e: String| sqlx::Error::Decode(e.into()))?;

    Ok(ServiceEvent {
        service,
        action,
        action_date: parse_timestamp(&action_date)?,
    })
}

fn open_event(event: ServiceEvent, ctx: &UserContext) -> Result<Event, VaultError> {
    Ok(Event {
        service: event.service.open(ctx.cipher())?,
        action: event.action,
        action_date: event.action_date,
    })
}
