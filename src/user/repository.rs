//! Handle database requests.

use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{Pool, Postgres};

use crate::error::{Result, ServerError};
use crate::user::UserRecord;

#[derive(Clone)]
pub struct UserRepository {
    pool: Pool<Postgres>,
}

impl UserRepository {
    /// Create a new [`UserRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert [`UserRecord`] into database. Single atomic put.
    pub async fn insert(&self, record: &UserRecord) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO users (id, attributes) VALUES ($1, $2)"#,
        )
        .bind(&record.id)
        .bind(Json(&record.attributes))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Return every record. Unscoped scan, acceptable at small scale.
    pub async fn find_all(&self) -> Result<Vec<UserRecord>> {
        let records = sqlx::query_as::<_, UserRecord>(
            r#"SELECT id, attributes FROM users ORDER BY created_at, id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Find a record using `id` field.
    ///
    /// An absent row is a first-class [`ServerError::NotFound`],
    /// distinct from a store failure.
    pub async fn find_by_id(&self, user_id: &str) -> Result<UserRecord> {
        sqlx::query_as::<_, UserRecord>(
            r#"SELECT id, attributes FROM users WHERE id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ServerError::NotFound)
    }

    /// Replace the whole attribute document of a record. Never a merge.
    ///
    /// Updating a non-existent `id` returns [`ServerError::NotFound`]
    /// instead of inheriting backend-dependent upsert behavior.
    pub async fn replace_attributes(
        &self,
        user_id: &str,
        attributes: &Map<String, Value>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"UPDATE users SET attributes = $2 WHERE id = $1"#,
        )
        .bind(user_id)
        .bind(Json(attributes))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServerError::NotFound);
        }

        Ok(())
    }

    /// Delete a record unconditionally.
    ///
    /// Succeeds whether or not `id` existed; no existence check.
    pub async fn delete(&self, user_id: &str) -> Result<()> {
        sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
