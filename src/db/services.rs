use crate::db::models::{DbService, now_timestamp};
use crate::db::sqlite::Database;
use crate::db::tags::link_tags;
use crate::error::VaultError;
use crate::service::audit::ServiceEvent;
use crate::service::event_bus::EventBusHandle;
use crate::service::fuzzy::similarity;
use crate::sql::{Params, exec};
use crate::types::event::Action;
use crate::types::service::Service;
use crate::types::user::UserContext;
use sqlx::Row;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info, warn};

const SELECT_SERVICES: &str = r#"
    SELECT id, name, username, password, note, last_update, user_id
    FROM services
    WHERE user_id = :user_id
    ORDER BY name"#;

const SELECT_SERVICE_TAGS: &str = r#"
    SELECT st.service_id AS service_id, t.name AS name
    FROM service_tags st
    JOIN tags t ON t.id = st.tag_id
    JOIN services s ON s.id = st.service_id
    WHERE s.user_id = :user_id
    ORDER BY t.name"#;

const SELECT_SERVICES_BY_TAG: &str = r#"
    SELECT s.id, s.name, s.username, s.password, s.note, s.last_update, s.user_id
    FROM services s
    JOIN service_tags st ON st.service_id = s.id
    JOIN tags t ON t.id = st.tag_id
    WHERE s.user_id = :user_id AND t.name = :tag
    ORDER BY s.name"#;

const SELECT_SERVICE: &str = r#"
    SELECT id, name, username, password, note, last_update, user_id
    FROM services
    WHERE name = :name AND user_id = :user_id"#;

const SELECT_SERVICE_ID: &str =
    "SELECT id FROM services WHERE name = :name AND user_id = :user_id";

const INSERT_SERVICE: &str = r#"
    INSERT INTO services (name, username, password, note, last_update, user_id)
    VALUES (:name, :username, :password, :note, :last_update, :user_id)"#;

const UPDATE_SERVICE: &str = r#"
    UPDATE services SET
        name = :name,
        username = :username,
        password = :password,
        note = :note,
        last_update = :last_update
    WHERE id = :id"#;

const DELETE_SERVICE: &str = "DELETE FROM services WHERE name = :name AND user_id = :user_id";

/// Credentials of one user: CRUD, fuzzy search and audit publishing.
#[derive(Clone)]
pub struct ServiceRepository {
    db: Database,
    events: EventBusHandle<ServiceEvent>,
    search_threshold: f64,
}

impl ServiceRepository {
    pub fn new(db: Database, events: EventBusHandle<ServiceEvent>, search_threshold: f64) -> Self {
        Self {
            db,
            events,
            search_threshold,
        }
    }

    /// Services whose name or username matches `pattern`, best match first.
    /// An empty pattern returns every service.
    pub async fn search(&self, ctx: &UserContext, pattern: &str) -> Result<Vec<Service>, VaultError> {
        let mut hits: Vec<Service> = self
            .load_all(ctx)
            .await?
            .into_iter()
            .filter_map(|mut service| {
                service.score = similarity(pattern, &service.name)
                    .max(similarity(pattern, &service.username));
                (service.score >= self.search_threshold).then_some(service)
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        debug!(user_id = ctx.user_id(), pattern, hits = hits.len(), "search done");
        Ok(hits)
    }

    pub async fn search_by_tag(&self, ctx: &UserContext, tag: &str) -> Result<Vec<Service>, VaultError> {
        let params = Params::named()
            .with("user_id", ctx.user_id())
            .with("tag", tag);
        let rows = self
            .db
            .query(SELECT_SERVICES_BY_TAG, params, DbService::from_service_row)
            .await?;
        self.attach_tags_and_open(ctx, rows).await
    }

    pub async fn get(&self, ctx: &UserContext, name: &str) -> Result<Option<Service>, VaultError> {
        let params = Params::named()
            .with("name", name)
            .with("user_id", ctx.user_id());
        let Some(row) = self
            .db
            .optional_row(SELECT_SERVICE, params, DbService::from_service_row)
            .await?
        else {
            return Ok(None);
        };
        Ok(self.attach_tags_and_open(ctx, vec![row]).await?.pop())
    }

    /// Store a new service for the current user and publish an insert event.
    pub async fn add(&self, ctx: &UserContext, service: &Service) -> Result<Service, VaultError> {
        let mut stored = service.clone();
        stored.user_id = ctx.user_id();
        stored.last_update = now_timestamp();
        stored.dirty = false;
        let sealed = DbService::seal(&stored, ctx.cipher())?;

        let row = sealed.clone();
        self.db
            .perform_transaction(move |conn| {
                Box::pin(async move {
                    exec::save_or_update(&mut *conn, INSERT_SERVICE, service_params(&row)).await?;
                    let id: i64 = exec::single_row(
                        &mut *conn,
                        SELECT_SERVICE_ID,
                        Params::named()
                            .with("name", &row.name)
                            .with("user_id", row.user_id),
                        |r| Ok(r.try_get("id")?),
                    )
                    .await?;
                    link_tags(conn, row.user_id, id, &row.tags).await
                })
            })
            .await
            .map_err(|e| duplicate_or(e, &stored.name))?;

        info!(user_id = stored.user_id, service = %stored.name, "service added");
        self.publish(sealed, Action::Insert);
        Ok(stored)
    }

    /// Replace the service currently named `original_name`. Renames are allowed.
    pub async fn update(
        &self,
        ctx: &UserContext,
        original_name: &str,
        service: &Service,
    ) -> Result<Service, VaultError> {
        let mut stored = service.clone();
        stored.user_id = ctx.user_id();
        stored.last_update = now_timestamp();
        stored.dirty = false;
        let sealed = DbService::seal(&stored, ctx.cipher())?;

        let row = sealed.clone();
        let original = original_name.to_string();
        let updated = self
            .db
            .perform_transaction(move |conn| {
                Box::pin(async move {
                    let Some(id) = exec::optional_row(
                        &mut *conn,
                        SELECT_SERVICE_ID,
                        Params::named()
                            .with("name", &original)
                            .with("user_id", row.user_id),
                        |r| Ok(r.try_get::<i64, _>("id")?),
                    )
                    .await?
                    else {
                        return Ok(false);
                    };

                    let params = Params::named()
                        .with("id", id)
                        .with("name", &row.name)
                        .with("username", &row.username)
                        .with("password", &row.password)
                        .with("note", &row.note)
                        .with("last_update", row.last_update);
                    exec::save_or_update(&mut *conn, UPDATE_SERVICE, params).await?;
                    link_tags(conn, row.user_id, id, &row.tags).await?;
                    Ok(true)
                })
            })
            .await
            .map_err(|e| duplicate_or(e, &stored.name))?;

        if !updated {
            return Err(VaultError::ServiceNotFound(original_name.to_string()));
        }
        info!(user_id = stored.user_id, from = original_name, service = %stored.name, "service updated");
        self.publish(sealed, Action::Update);
        Ok(stored)
    }

    /// Delete a service and publish a delete event carrying its last state.
    pub async fn delete(&self, ctx: &UserContext, name: &str) -> Result<(), VaultError> {
        let existing = self
            .get(ctx, name)
            .await?
            .ok_or_else(|| VaultError::ServiceNotFound(name.to_string()))?;
        let sealed = DbService::seal(&existing, ctx.cipher())?;

        let affected = self
            .db
            .save_or_update(
                DELETE_SERVICE,
                Params::named()
                    .with("name", name)
                    .with("user_id", ctx.user_id()),
            )
            .await?;
        if affected == 0 {
            return Err(VaultError::ServiceNotFound(name.to_string()));
        }

        info!(user_id = ctx.user_id(), service = name, "service deleted");
        self.publish(sealed, Action::Delete);
        Ok(())
    }

    async fn load_all(&self, ctx: &UserContext) -> Result<Vec<Service>, VaultError> {
        let rows = self
            .db
            .query(
                SELECT_SERVICES,
                Params::named().with("user_id", ctx.user_id()),
                DbService::from_service_row,
            )
            .await?;
        self.attach_tags_and_open(ctx, rows).await
    }

    async fn attach_tags_and_open(
        &self,
        ctx: &UserContext,
        rows: Vec<(i64, DbService)>,
    ) -> Result<Vec<Service>, VaultError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let links = self
            .db
            .query(
                SELECT_SERVICE_TAGS,
                Params::named().with("user_id", ctx.user_id()),
                |r| Ok((r.try_get::<i64, _>("service_id")?, r.try_get::<String, _>("name")?)),
            )
            .await?;

        let mut tags_by_service: HashMap<i64, Vec<String>> = HashMap::new();
        for (service_id, tag) in links {
            tags_by_service.entry(service_id).or_default().push(tag);
        }

        rows.into_iter()
            .map(|(id, mut row)| {
                row.tags = tags_by_service.remove(&id).unwrap_or_default();
                row.open(ctx.cipher())
            })
            .collect()
    }

    fn publish(&self, service: DbService, action: Action) {
        if let Err(e) = self.events.send(ServiceEvent::new(service, action)) {
            warn!(error = %e, %action, "audit event not published");
        }
    }
}

fn service_params(row: &DbService) -> Params {
    Params::named()
        .with("name", &row.name)
        .with("username", &row.username)
        .with("password", &row.password)
        .with("note", &row.note)
        .with("last_update", row.last_update)
        .with("user_id", row.user_id)
}

fn duplicate_or(e: VaultError, name: &str) -> VaultError {
    if e.is_unique_violation() {
        VaultError::DuplicateService(name.to_string())
    } else {
        e
    }
}
