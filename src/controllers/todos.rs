//! Todo CRUD handlers.

use serde_json::json;
use sqlx::SqlitePool;

use super::{body_rejection, parse_list_filter, store_failure};
use crate::core::{Reply, Request, Responder, Result};
use crate::models::{ListFilter, SubTodo, Todo, TodoProps, TodoUpdate};

/// Handlers for the `/todos` routes.
pub struct TodosController {
    pool: SqlitePool,
}

impl TodosController {
    /// Create a controller using the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// GET /todos
    pub async fn index(&self, req: Request, res: Responder) -> Result<Responder> {
        let filter = match parse_list_filter(&req) {
            Ok(filter) => filter,
            Err(reason) => return res.reply(Reply::bad_request(reason)),
        };

        let todos = match Todo::all(&self.pool, &filter).await {
            Ok(todos) => todos,
            Err(err) => return store_failure(res, err),
        };

        let payload = json!({
            "todos": todos.iter().map(Todo::payload).collect::<Vec<_>>(),
        });
        res.reply(
            Reply::ok("Todos fetched")
                .with_payload(payload)
                .with_template("todos/index.html"),
        )
    }

    /// GET /todos/new
    pub async fn new_form(&self, _req: Request, res: Responder) -> Result<Responder> {
        res.reply(Reply::ok("New todo").with_template("todos/new.html"))
    }

    /// GET /todos/:id
    pub async fn show(&self, req: Request, res: Responder) -> Result<Responder> {
        let Some(id) = req.param_i64("id") else {
            return res.reply(Reply::bad_request("Invalid todo id"));
        };

        let todo = match Todo::find(&self.pool, id).await {
            Ok(Some(todo)) => todo,
            Ok(None) => return res.reply(Reply::not_found("Todo not found")),
            Err(err) => return store_failure(res, err),
        };

        // The detail view shows the subtodos inline.
        let subtodos = match SubTodo::all_for_todo(&self.pool, id, &ListFilter::default()).await {
            Ok(subtodos) => subtodos,
            Err(err) => return store_failure(res, err),
        };

        let payload = json!({
            "todo": todo.payload(),
            "subtodos": subtodos.iter().map(SubTodo::payload).collect::<Vec<_>>(),
        });
        res.reply(
            Reply::ok("Todo fetched")
                .with_payload(payload)
                .with_template("todos/show.html"),
        )
    }

    /// GET /todos/:id/edit
    pub async fn edit_form(&self, req: Request, res: Responder) -> Result<Responder> {
        let Some(id) = req.param_i64("id") else {
            return res.reply(Reply::bad_request("Invalid todo id"));
        };

        let todo = match Todo::find(&self.pool, id).await {
            Ok(Some(todo)) => todo,
            Ok(None) => return res.reply(Reply::not_found("Todo not found")),
            Err(err) => return store_failure(res, err),
        };

        res.reply(
            Reply::ok("Edit todo")
                .with_payload(json!({ "todo": todo.payload() }))
                .with_template("todos/edit.html"),
        )
    }

    /// POST /todos
    pub async fn create(&self, mut req: Request, res: Responder) -> Result<Responder> {
        if let Err(err) = req.parse_body().await {
            return body_rejection(res, err);
        }

        let props = match TodoProps::from_body(req.body()) {
            Ok(props) => props,
            Err(reason) => return res.reply(Reply::bad_request(reason)),
        };

        let todo = match Todo::create(&self.pool, &props).await {
            Ok(todo) => todo,
            Err(err) => return store_failure(res, err),
        };

        res.reply(
            Reply::created("Todo created")
                .with_payload(json!({ "todo": todo.payload() }))
                .with_redirect("/todos"),
        )
    }

    /// PUT /todos/:id
    pub async fn update(&self, mut req: Request, res: Responder) -> Result<Responder> {
        let Some(id) = req.param_i64("id") else {
            return res.reply(Reply::bad_request("Invalid todo id"));
        };

        if let Err(err) = req.parse_body().await {
            return body_rejection(res, err);
        }

        let update = match TodoUpdate::from_body(req.body()) {
            Ok(update) => update,
            Err(reason) => return res.reply(Reply::bad_request(reason)),
        };

        let todo = match Todo::update(&self.pool, id, &update).await {
            Ok(Some(todo)) => todo,
            Ok(None) => return res.reply(Reply::not_found("Todo not found")),
            Err(err) => return store_failure(res, err),
        };

        res.reply(
            Reply::ok("Todo updated")
                .with_payload(json!({ "todo": todo.payload() }))
                .with_redirect("/todos"),
        )
    }

    /// DELETE /todos/:id
    pub async fn destroy(&self, req: Request, res: Responder) -> Result<Responder> {
        let Some(id) = req.param_i64("id") else {
            return res.reply(Reply::bad_request("Invalid todo id"));
        };

        match Todo::delete(&self.pool, id).await {
            Ok(true) => res.reply(Reply::ok("Todo deleted").with_redirect("/todos")),
            Ok(false) => res.reply(Reply::not_found("Todo not found")),
            Err(err) => store_failure(res, err),
        }
    }

    /// PUT /todos/:id/complete
    pub async fn complete(&self, req: Request, res: Responder) -> Result<Responder> {
        let Some(id) = req.param_i64("id") else {
            return res.reply(Reply::bad_request("Invalid todo id"));
        };

        let todo = match Todo::set_complete(&self.pool, id).await {
            Ok(Some(todo)) => todo,
            Ok(None) => return res.reply(Reply::not_found("Todo not found")),
            Err(err) => return store_failure(res, err),
        };

        res.reply(
            Reply::ok("Todo completed")
                .with_payload(json!({ "todo": todo.payload() }))
                .with_redirect("/todos"),
        )
    }
}
