//! Subtodo handlers, nested under `/todos/:id`.

use serde_json::json;
use sqlx::SqlitePool;

use super::{body_rejection, parse_list_filter, store_failure};
use crate::core::{Reply, Request, Responder, Result};
use crate::models::{SubTodo, SubTodoProps, Todo};

/// Handlers for the `/todos/:id/subtodos` routes.
pub struct SubTodosController {
    pool: SqlitePool,
}

impl SubTodosController {
    /// Create a controller using the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// GET /todos/:id/subtodos
    pub async fn index(&self, req: Request, res: Responder) -> Result<Responder> {
        let Some(todo_id) = req.param_i64("id") else {
            return res.reply(Reply::bad_request("Invalid todo id"));
        };

        match Todo::find(&self.pool, todo_id).await {
            Ok(Some(_)) => {}
            Ok(None) => return res.reply(Reply::not_found("Todo not found")),
            Err(err) => return store_failure(res, err),
        }

        let filter = match parse_list_filter(&req) {
            Ok(filter) => filter,
            Err(reason) => return res.reply(Reply::bad_request(reason)),
        };

        let subtodos = match SubTodo::all_for_todo(&self.pool, todo_id, &filter).await {
            Ok(subtodos) => subtodos,
            Err(err) => return store_failure(res, err),
        };

        let payload = json!({
            "subtodos": subtodos.iter().map(SubTodo::payload).collect::<Vec<_>>(),
        });
        res.reply(Reply::ok("SubTodos fetched").with_payload(payload))
    }

    /// POST /todos/:id/subtodos
    pub async fn create(&self, mut req: Request, res: Responder) -> Result<Responder> {
        let Some(todo_id) = req.param_i64("id") else {
            return res.reply(Reply::bad_request("Invalid todo id"));
        };

        match Todo::find(&self.pool, todo_id).await {
            Ok(Some(_)) => {}
            Ok(None) => return res.reply(Reply::not_found("Todo not found")),
            Err(err) => return store_failure(res, err),
        }

        if let Err(err) = req.parse_body().await {
            return body_rejection(res, err);
        }

        let props = match SubTodoProps::from_body(req.body()) {
            Ok(props) => props,
            Err(reason) => return res.reply(Reply::bad_request(reason)),
        };

        let subtodo = match SubTodo::create(&self.pool, todo_id, &props).await {
            Ok(subtodo) => subtodo,
            Err(err) => return store_failure(res, err),
        };

        res.reply(
            Reply::created("SubTodo created")
                .with_payload(json!({ "subtodo": subtodo.payload() }))
                .with_redirect(format!("/todos/{}", todo_id)),
        )
    }

    /// PUT /todos/:id/subtodos/:subtodo_id/complete
    pub async fn complete(&self, req: Request, res: Responder) -> Result<Responder> {
        let Some(todo_id) = req.param_i64("id") else {
            return res.reply(Reply::bad_request("Invalid todo id"));
        };
        let Some(subtodo_id) = req.param_i64("subtodo_id") else {
            return res.reply(Reply::bad_request("Invalid subtodo id"));
        };

        // The WHERE clause checks ownership, so a subtodo under a
        // different todo comes back as not found.
        let subtodo = match SubTodo::set_complete(&self.pool, todo_id, subtodo_id).await {
            Ok(Some(subtodo)) => subtodo,
            Ok(None) => return res.reply(Reply::not_found("SubTodo not found")),
            Err(err) => return store_failure(res, err),
        };

        res.reply(
            Reply::ok("SubTodo completed")
                .with_payload(json!({ "subtodo": subtodo.payload() }))
                .with_redirect(format!("/todos/{}", todo_id)),
        )
    }
}
