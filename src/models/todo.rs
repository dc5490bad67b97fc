//! The primary task entity.

use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{FromRow, SqlitePool};

use super::{row_payload, ListFilter, STATUS_COMPLETE};
use crate::support::datetime;

/// A todo row.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: String,
    pub edited_at: Option<String>,
    pub completed_at: Option<String>,
}

/// Validated input for creating a todo.
#[derive(Debug, Clone)]
pub struct TodoProps {
    pub title: String,
    pub description: Option<String>,
}

impl TodoProps {
    /// Validate a parsed request body into creation props.
    ///
    /// The tagged result is the whole contract: callers turn an `Err`
    /// into a 400 with the reason as the message.
    pub fn from_body(body: &Map<String, Value>) -> Result<Self, String> {
        let title = match body.get("title") {
            Some(Value::String(title)) if !title.trim().is_empty() => title.trim().to_string(),
            Some(Value::String(_)) | None => return Err("title is required".to_string()),
            Some(_) => return Err("title must be a string".to_string()),
        };

        let description = match body.get("description") {
            None | Some(Value::Null) => None,
            Some(Value::String(description)) => {
                let trimmed = description.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Some(_) => return Err("description must be a string".to_string()),
        };

        Ok(Self { title, description })
    }
}

/// Validated input for updating a todo.
#[derive(Debug, Clone)]
pub struct TodoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl TodoUpdate {
    /// Validate a parsed request body into update props. At least one
    /// updatable field must be present.
    pub fn from_body(body: &Map<String, Value>) -> Result<Self, String> {
        let title = match body.get("title") {
            None | Some(Value::Null) => None,
            Some(Value::String(title)) if !title.trim().is_empty() => {
                Some(title.trim().to_string())
            }
            Some(Value::String(_)) => return Err("title must not be empty".to_string()),
            Some(_) => return Err("title must be a string".to_string()),
        };

        let description = match body.get("description") {
            None | Some(Value::Null) => None,
            Some(Value::String(description)) => Some(description.trim().to_string()),
            Some(_) => return Err("description must be a string".to_string()),
        };

        if title.is_none() && description.is_none() {
            return Err("nothing to update: provide title or description".to_string());
        }

        Ok(Self { title, description })
    }
}

impl Todo {
    /// Fetch all todos, honoring the filter.
    pub async fn all(pool: &SqlitePool, filter: &ListFilter) -> Result<Vec<Todo>, sqlx::Error> {
        let mut sql = String::from("SELECT * FROM todos");
        if filter.status.is_some() {
            sql.push_str(" WHERE status = ?");
        }
        sql.push_str(&filter.order_clause());

        let mut query = sqlx::query_as::<_, Todo>(&sql);
        if let Some(status) = &filter.status {
            query = query.bind(status);
        }
        query.fetch_all(pool).await
    }

    /// Fetch one todo by id.
    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Todo>, sqlx::Error> {
        sqlx::query_as::<_, Todo>("SELECT * FROM todos WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a todo and return the fresh row.
    pub async fn create(pool: &SqlitePool, props: &TodoProps) -> Result<Todo, sqlx::Error> {
        sqlx::query_as::<_, Todo>(
            "INSERT INTO todos (title, description, created_at) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(&props.title)
        .bind(&props.description)
        .bind(datetime::now_iso8601())
        .fetch_one(pool)
        .await
    }

    /// Update title/description. `None` when no row has that id.
    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        update: &TodoUpdate,
    ) -> Result<Option<Todo>, sqlx::Error> {
        sqlx::query_as::<_, Todo>(
            "UPDATE todos SET title = COALESCE(?, title), \
             description = COALESCE(?, description), \
             edited_at = ? WHERE id = ? RETURNING *",
        )
        .bind(&update.title)
        .bind(&update.description)
        .bind(datetime::now_iso8601())
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Mark a todo complete. Idempotent: a todo that is already complete
    /// keeps its original completion timestamp.
    pub async fn set_complete(pool: &SqlitePool, id: i64) -> Result<Option<Todo>, sqlx::Error> {
        sqlx::query_as::<_, Todo>(
            "UPDATE todos SET status = ?, \
             completed_at = COALESCE(completed_at, ?) WHERE id = ? RETURNING *",
        )
        .bind(STATUS_COMPLETE)
        .bind(datetime::now_iso8601())
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Delete a todo. Success means exactly one row was affected; the
    /// store's cascade rule removes any subtodos.
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// JSON payload form of this row.
    pub fn payload(&self) -> Value {
        row_payload(self)
    }
}
