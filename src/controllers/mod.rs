//! Controllers: glue between routes and models.
//!
//! Controllers are constructed with the pool they should use and register
//! their own routes. Expected failures (bad input, missing rows) are
//! replies, never errors; only store failures cross the handler boundary,
//! and those surface as a generic 500 with the detail logged server-side.

mod subtodos;
mod todos;

use std::sync::Arc;

use http::StatusCode;
use sqlx::SqlitePool;
use tracing::error;

use crate::config::AppConfig;
use crate::core::{Reply, Request, Responder, Result};
use crate::models::{self, ListFilter};
use crate::router::Router;
use crate::templates::Templates;

pub use subtodos::SubTodosController;
pub use todos::TodosController;

/// Assemble the full route table.
///
/// Registration order matters: matching is first-match-wins, so the
/// literal `/todos/new` is registered before any `/todos/:id` route that
/// would otherwise shadow it.
pub fn build_router(pool: &SqlitePool, templates: Arc<Templates>, config: &AppConfig) -> Router {
    let mut router = Router::new(templates)
        .with_max_body_size(config.max_body_size)
        .with_handler_timeout(config.request_timeout.as_duration());

    router.get("/", |_req, res| async move {
        res.reply(Reply::new(StatusCode::FOUND, "Redirecting to /todos").with_redirect("/todos"))
    });

    router.get("/health", |_req, res| async move {
        res.reply(Reply::ok("ok"))
    });

    let todos = Arc::new(TodosController::new(pool.clone()));
    let subtodos = Arc::new(SubTodosController::new(pool.clone()));

    {
        let ctrl = Arc::clone(&todos);
        router.get("/todos", move |req, res| {
            let ctrl = Arc::clone(&ctrl);
            async move { ctrl.index(req, res).await }
        });
    }
    {
        let ctrl = Arc::clone(&todos);
        router.post("/todos", move |req, res| {
            let ctrl = Arc::clone(&ctrl);
            async move { ctrl.create(req, res).await }
        });
    }
    {
        // Literal route first: `/todos/:id` would swallow `new`.
        let ctrl = Arc::clone(&todos);
        router.get("/todos/new", move |req, res| {
            let ctrl = Arc::clone(&ctrl);
            async move { ctrl.new_form(req, res).await }
        });
    }
    {
        let ctrl = Arc::clone(&todos);
        router.get("/todos/:id/edit", move |req, res| {
            let ctrl = Arc::clone(&ctrl);
            async move { ctrl.edit_form(req, res).await }
        });
    }
    {
        let ctrl = Arc::clone(&todos);
        router.get("/todos/:id", move |req, res| {
            let ctrl = Arc::clone(&ctrl);
            async move { ctrl.show(req, res).await }
        });
    }
    {
        let ctrl = Arc::clone(&todos);
        router.put("/todos/:id", move |req, res| {
            let ctrl = Arc::clone(&ctrl);
            async move { ctrl.update(req, res).await }
        });
    }
    {
        let ctrl = Arc::clone(&todos);
        router.delete("/todos/:id", move |req, res| {
            let ctrl = Arc::clone(&ctrl);
            async move { ctrl.destroy(req, res).await }
        });
    }
    {
        let ctrl = Arc::clone(&todos);
        router.put("/todos/:id/complete", move |req, res| {
            let ctrl = Arc::clone(&ctrl);
            async move { ctrl.complete(req, res).await }
        });
    }
    {
        let ctrl = Arc::clone(&subtodos);
        router.post("/todos/:id/subtodos", move |req, res| {
            let ctrl = Arc::clone(&ctrl);
            async move { ctrl.create(req, res).await }
        });
    }
    {
        let ctrl = Arc::clone(&subtodos);
        router.get("/todos/:id/subtodos", move |req, res| {
            let ctrl = Arc::clone(&ctrl);
            async move { ctrl.index(req, res).await }
        });
    }
    {
        let ctrl = Arc::clone(&subtodos);
        router.put(
            "/todos/:id/subtodos/:subtodo_id/complete",
            move |req, res| {
                let ctrl = Arc::clone(&ctrl);
                async move { ctrl.complete(req, res).await }
            },
        );
    }

    router
}

/// Translate a store failure into a generic 500 reply. The error detail
/// stays in the server log.
pub(crate) fn store_failure(res: Responder, err: sqlx::Error) -> Result<Responder> {
    error!(error = %err, "store operation failed");
    res.reply(Reply::internal_error())
}

/// Build a [`ListFilter`] from `status` / `sortBy` / `orderBy` query
/// parameters, rejecting anything outside the accepted vocabulary.
pub(crate) fn parse_list_filter(req: &Request) -> std::result::Result<ListFilter, String> {
    let status = match req.query_param("status") {
        None => None,
        Some(value) if value == models::STATUS_INCOMPLETE || value == models::STATUS_COMPLETE => {
            Some(value)
        }
        Some(other) => return Err(format!("Invalid status filter: {}", other)),
    };

    let sort_by = match req.query_param("sortBy") {
        None => None,
        Some(value) => match models::sort_column(&value) {
            Some(column) => Some(column),
            None => return Err(format!("Invalid sortBy value: {}", value)),
        },
    };

    let descending = match req.query_param("orderBy").as_deref() {
        None | Some("asc") => false,
        Some("desc") => true,
        Some(other) => return Err(format!("Invalid orderBy value: {}", other)),
    };

    Ok(ListFilter {
        status,
        sort_by,
        descending,
    })
}

/// Reject a body-parse failure with the right client error.
pub(crate) fn body_rejection(res: Responder, err: crate::core::Error) -> Result<Responder> {
    match err {
        crate::core::Error::BodyTooLarge { .. } => res.reply(Reply::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "Request body too large",
        )),
        _ => res.reply(Reply::bad_request("Malformed request body")),
    }
}
