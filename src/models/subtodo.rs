//! The child task entity, owned by exactly one todo.

use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{FromRow, SqlitePool};

use super::{row_payload, ListFilter, STATUS_COMPLETE};
use crate::support::datetime;

/// A subtodo row. Subtodos carry a title and status only.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SubTodo {
    pub id: i64,
    pub todo_id: i64,
    pub title: String,
    pub status: String,
    pub created_at: String,
    pub completed_at: Option<String>,
}

/// Validated input for creating a subtodo.
#[derive(Debug, Clone)]
pub struct SubTodoProps {
    pub title: String,
}

impl SubTodoProps {
    /// Validate a parsed request body into creation props.
    pub fn from_body(body: &Map<String, Value>) -> Result<Self, String> {
        match body.get("title") {
            Some(Value::String(title)) if !title.trim().is_empty() => Ok(Self {
                title: title.trim().to_string(),
            }),
            Some(Value::String(_)) | None => Err("title is required".to_string()),
            Some(_) => Err("title must be a string".to_string()),
        }
    }
}

impl SubTodo {
    /// Fetch the subtodos of one todo, honoring the filter.
    pub async fn all_for_todo(
        pool: &SqlitePool,
        todo_id: i64,
        filter: &ListFilter,
    ) -> Result<Vec<SubTodo>, sqlx::Error> {
        let mut sql = String::from("SELECT * FROM subtodos WHERE todo_id = ?");
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        sql.push_str(&filter.order_clause());

        let mut query = sqlx::query_as::<_, SubTodo>(&sql).bind(todo_id);
        if let Some(status) = &filter.status {
            query = query.bind(status);
        }
        query.fetch_all(pool).await
    }

    /// Insert a subtodo under the given todo and return the fresh row.
    pub async fn create(
        pool: &SqlitePool,
        todo_id: i64,
        props: &SubTodoProps,
    ) -> Result<SubTodo, sqlx::Error> {
        sqlx::query_as::<_, SubTodo>(
            "INSERT INTO subtodos (todo_id, title, created_at) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(todo_id)
        .bind(&props.title)
        .bind(datetime::now_iso8601())
        .fetch_one(pool)
        .await
    }

    /// Mark a subtodo complete. Both ids must match the row: a subtodo is
    /// only reachable through the todo that owns it. Idempotent like
    /// [`Todo::set_complete`](super::Todo::set_complete).
    pub async fn set_complete(
        pool: &SqlitePool,
        todo_id: i64,
        id: i64,
    ) -> Result<Option<SubTodo>, sqlx::Error> {
        sqlx::query_as::<_, SubTodo>(
            "UPDATE subtodos SET status = ?, \
             completed_at = COALESCE(completed_at, ?) \
             WHERE id = ? AND todo_id = ? RETURNING *",
        )
        .bind(STATUS_COMPLETE)
        .bind(datetime::now_iso8601())
        .bind(id)
        .bind(todo_id)
        .fetch_optional(pool)
        .await
    }

    /// JSON payload form of this row.
    pub fn payload(&self) -> Value {
        row_payload(self)
    }
}
