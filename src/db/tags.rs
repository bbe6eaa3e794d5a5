use crate::db::sqlite::Database;
use crate::error::VaultError;
use crate::sql::{Params, exec};
use crate::types::service::Tag;
use sqlx::{FromRow, Row, SqliteConnection};

const TAG_COUNTS: &str = r#"
    SELECT t.name AS name, COUNT(st.service_id) AS count
    FROM tags t
    JOIN service_tags st ON st.tag_id = t.id
    WHERE t.user_id = :user_id
    GROUP BY t.id, t.name
    ORDER BY t.name"#;

const DELETE_UNUSED: &str = r#"
    DELETE FROM tags
    WHERE user_id = :user_id
      AND id NOT IN (SELECT tag_id FROM service_tags)"#;

#[derive(Clone)]
pub struct TagRepository {
    db: Database,
}

impl TagRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Tags in use by the user's services, with how many services carry each.
    pub async fn list_with_counts(&self, user_id: i64) -> Result<Vec<Tag>, VaultError> {
        self.db
            .query(
                TAG_COUNTS,
                Params::named().with("user_id", user_id),
                |row| Ok(Tag::from_row(row)?),
            )
            .await
    }

    /// Remove tags no service refers to any more. Returns how many were removed.
    pub async fn delete_unused(&self, user_id: i64) -> Result<u64, VaultError> {
        self.db
            .save_or_update(DELETE_UNUSED, Params::named().with("user_id", user_id))
            .await
    }
}

/// Replace the tag links of one service. Runs on the caller's transaction.
pub(crate) async fn link_tags(
    conn: &mut SqliteConnection,
    user_id: i64,
    service_id: i64,
    tags: &[String],
) -> Result<(), VaultError> {
    exec::save_or_update(
        &mut *conn,
        "DELETE FROM service_tags WHERE service_id = :service_id",
        Params::named().with("service_id", service_id),
    )
    .await?;

    for tag in tags {
        exec::save_or_update(
            &mut *conn,
            "INSERT INTO tags (name, user_id) VALUES (:name, :user_id) \
             ON CONFLICT(name, user_id) DO NOTHING",
            Params::named().with("name", tag).with("user_id", user_id),
        )
        .await?;
        let tag_id: i64 = exec::single_row(
            &mut *conn,
            "SELECT id FROM tags WHERE name = :name AND user_id = :user_id",
            Params::named().with("name", tag).with("user_id", user_id),
            |row| Ok(row.try_get("id")?),
        )
        .await?;
        exec::save_or_update(
            &mut *conn,
            "INSERT INTO service_tags (service_id, tag_id) VALUES (:service_id, :tag_id)",
            Params::named()
                .with("service_id", service_id)
                .with("tag_id", tag_id),
        )
        .await?;
    }
    Ok(())
}
