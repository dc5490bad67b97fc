//! End-to-end dispatch tests: router -> controllers -> models, driven
//! over an in-memory database without opening a socket.

use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;

use tokio_todos::config::AppConfig;
use tokio_todos::controllers::build_router;
use tokio_todos::core::request::buffered_body;
use tokio_todos::core::RequestBody;
use tokio_todos::router::Router;
use tokio_todos::templates::Templates;

/// Build a router over a fresh in-memory database.
///
/// The pool is pinned to one connection so every query sees the same
/// database; the templates are small stand-ins registered from strings.
async fn test_app() -> (Router, SqlitePool) {
    let pool = tokio_todos::db::connect("sqlite::memory:", 1)
        .await
        .expect("in-memory database");

    let mut templates = Templates::empty();
    templates
        .add_raw(
            "todos/index.html",
            "<ul>{% for todo in payload.todos %}<li>{{ todo.title }}</li>{% endfor %}</ul>",
        )
        .unwrap();
    templates
        .add_raw("todos/new.html", "<form action=\"/todos\">new</form>")
        .unwrap();
    templates
        .add_raw("todos/show.html", "<h1>{{ payload.todo.title }}</h1>")
        .unwrap();
    templates
        .add_raw("todos/edit.html", "<form>{{ payload.todo.title }}</form>")
        .unwrap();

    let router = build_router(&pool, Arc::new(templates), &AppConfig::default());
    (router, pool)
}

fn request(
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: &str,
) -> http::Request<RequestBody> {
    let mut builder = http::Request::builder().method(method).uri(path);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder
        .body(buffered_body(Bytes::from(body.to_string())))
        .unwrap()
}

fn json_request(method: &str, path: &str, body: &str) -> http::Request<RequestBody> {
    request(method, path, &[("content-type", "application/json")], body)
}

async fn body_json(response: http::Response<http_body_util::Full<Bytes>>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: http::Response<http_body_util::Full<Bytes>>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// POST a todo and return its id.
async fn create_todo(router: &Router, title: &str, description: &str) -> i64 {
    let body = serde_json::json!({ "title": title, "description": description }).to_string();
    let response = router.dispatch(json_request("POST", "/todos", &body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let value = body_json(response).await;
    value["payload"]["todo"]["id"].as_i64().expect("todo id")
}

/// POST a subtodo under a todo and return its id.
async fn create_subtodo(router: &Router, todo_id: i64, title: &str) -> i64 {
    let body = serde_json::json!({ "title": title }).to_string();
    let response = router
        .dispatch(json_request(
            "POST",
            &format!("/todos/{}/subtodos", todo_id),
            &body,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let value = body_json(response).await;
    value["payload"]["subtodo"]["id"].as_i64().expect("subtodo id")
}

#[tokio::test]
async fn invalid_route_is_404_with_exact_message() {
    let (router, _pool) = test_app().await;

    let response = router
        .dispatch(request("GET", "/unregistered", &[], ""))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Invalid route: GET /unregistered");
}

#[tokio::test]
async fn create_then_fetch_round_trip() {
    let (router, _pool) = test_app().await;
    let id = create_todo(&router, "Buy milk", "2 litres").await;

    let response = router
        .dispatch(request("GET", &format!("/todos/{}", id), &[], ""))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let todo = &body["payload"]["todo"];
    assert_eq!(todo["title"], "Buy milk");
    assert_eq!(todo["description"], "2 litres");
    assert_eq!(todo["status"], "incomplete");
    assert_eq!(todo["completedAt"], Value::Null);
    assert_eq!(todo["editedAt"], Value::Null);
    assert!(todo["createdAt"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn form_encoded_create_decodes_values() {
    let (router, _pool) = test_app().await;

    let response = router
        .dispatch(request(
            "POST",
            "/todos",
            &[("content-type", "application/x-www-form-urlencoded")],
            "title=Buy+milk&description=2%20litres",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["payload"]["todo"]["title"], "Buy milk");
    assert_eq!(body["payload"]["todo"]["description"], "2 litres");
}

#[tokio::test]
async fn html_client_create_gets_redirect_json_client_gets_201() {
    let (router, _pool) = test_app().await;

    // Browser-style client: 302 with Location, empty body.
    let response = router
        .dispatch(request(
            "POST",
            "/todos",
            &[
                ("content-type", "application/x-www-form-urlencoded"),
                ("accept", "text/html"),
            ],
            "title=From+a+form",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get("location").unwrap(), "/todos");
    assert!(body_text(response).await.is_empty());

    // JSON client: the descriptor's own status, no Location header.
    let response = router
        .dispatch(json_request("POST", "/todos", r#"{"title": "From json"}"#))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.headers().get("location").is_none());
}

#[tokio::test]
async fn html_client_index_renders_template() {
    let (router, _pool) = test_app().await;
    create_todo(&router, "Visible in HTML", "").await;

    let response = router
        .dispatch(request("GET", "/todos", &[("accept", "text/html")], ""))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/html; charset=utf-8"
    );
    let html = body_text(response).await;
    assert!(html.contains("<li>Visible in HTML</li>"));
}

#[tokio::test]
async fn method_override_routes_post_as_delete() {
    let (router, _pool) = test_app().await;
    let id = create_todo(&router, "Doomed", "").await;

    let response = router
        .dispatch(json_request(
            "POST",
            &format!("/todos/{}", id),
            r#"{"_method": "DELETE"}"#,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Todo deleted");

    let response = router
        .dispatch(request("GET", &format!("/todos/{}", id), &[], ""))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "Todo not found");
}

#[tokio::test]
async fn update_via_override_sets_edited_at() {
    let (router, _pool) = test_app().await;
    let id = create_todo(&router, "Old title", "").await;

    let response = router
        .dispatch(request(
            "POST",
            &format!("/todos/{}", id),
            &[("content-type", "application/x-www-form-urlencoded")],
            "_method=PUT&title=New+title",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["payload"]["todo"]["title"], "New title");
    assert!(body["payload"]["todo"]["editedAt"].is_string());
}

#[tokio::test]
async fn completing_twice_is_idempotent() {
    let (router, _pool) = test_app().await;
    let id = create_todo(&router, "Finish me", "").await;
    let complete_path = format!("/todos/{}/complete", id);

    let response = router.dispatch(request("PUT", &complete_path, &[], "")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_json(response).await;
    assert_eq!(first["payload"]["todo"]["status"], "complete");
    let stamp = first["payload"]["todo"]["completedAt"].clone();
    assert!(stamp.is_string());

    let response = router.dispatch(request("PUT", &complete_path, &[], "")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let second = body_json(response).await;
    assert_eq!(second["payload"]["todo"]["status"], "complete");
    assert_eq!(second["payload"]["todo"]["completedAt"], stamp);
}

#[tokio::test]
async fn deleting_a_todo_cascades_to_subtodos() {
    let (router, pool) = test_app().await;
    let id = create_todo(&router, "Parent", "").await;
    create_subtodo(&router, id, "step one").await;
    create_subtodo(&router, id, "step two").await;

    let response = router
        .dispatch(request("DELETE", &format!("/todos/{}", id), &[], ""))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subtodos WHERE todo_id = ?")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn non_numeric_id_is_rejected_with_400() {
    let (router, _pool) = test_app().await;

    let response = router.dispatch(request("GET", "/todos/abc", &[], "")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Invalid todo id");
}

#[tokio::test]
async fn todos_new_is_not_shadowed_by_the_id_route() {
    let (router, _pool) = test_app().await;

    let response = router.dispatch(request("GET", "/todos/new", &[], "")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "New todo");
}

#[tokio::test]
async fn list_filters_and_sorting() {
    let (router, _pool) = test_app().await;
    let first = create_todo(&router, "Alpha", "").await;
    create_todo(&router, "Beta", "").await;

    router
        .dispatch(request("PUT", &format!("/todos/{}/complete", first), &[], ""))
        .await;

    let response = router
        .dispatch(request("GET", "/todos?status=complete", &[], ""))
        .await;
    let body = body_json(response).await;
    let todos = body["payload"]["todos"].as_array().unwrap();
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0]["title"], "Alpha");

    let response = router
        .dispatch(request("GET", "/todos?sortBy=title&orderBy=desc", &[], ""))
        .await;
    let body = body_json(response).await;
    assert_eq!(body["payload"]["todos"][0]["title"], "Beta");

    // Out-of-vocabulary values are rejected, not silently ignored.
    for bad in ["/todos?status=done", "/todos?sortBy=bogus", "/todos?orderBy=up"] {
        let response = router.dispatch(request("GET", bad, &[], "")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn subtodo_listing_and_completion() {
    let (router, _pool) = test_app().await;
    let todo_id = create_todo(&router, "Parent", "").await;
    let subtodo_id = create_subtodo(&router, todo_id, "step one").await;

    let response = router
        .dispatch(request(
            "GET",
            &format!("/todos/{}/subtodos", todo_id),
            &[],
            "",
        ))
        .await;
    let body = body_json(response).await;
    assert_eq!(body["payload"]["subtodos"].as_array().unwrap().len(), 1);

    let response = router
        .dispatch(request(
            "PUT",
            &format!("/todos/{}/subtodos/{}/complete", todo_id, subtodo_id),
            &[],
            "",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["payload"]["subtodo"]["status"], "complete");
}

#[tokio::test]
async fn subtodo_completion_checks_ownership() {
    let (router, _pool) = test_app().await;
    let owner = create_todo(&router, "Owner", "").await;
    let other = create_todo(&router, "Other", "").await;
    let subtodo_id = create_subtodo(&router, owner, "step").await;

    let response = router
        .dispatch(request(
            "PUT",
            &format!("/todos/{}/subtodos/{}/complete", other, subtodo_id),
            &[],
            "",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "SubTodo not found");
}

#[tokio::test]
async fn subtodos_under_missing_todo_are_404() {
    let (router, _pool) = test_app().await;

    let response = router
        .dispatch(request("GET", "/todos/999/subtodos", &[], ""))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "Todo not found");
}

#[tokio::test]
async fn validation_failures_are_400_with_reasons() {
    let (router, _pool) = test_app().await;

    let response = router.dispatch(json_request("POST", "/todos", "{}")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "title is required");

    let id = create_todo(&router, "Valid", "").await;
    let response = router
        .dispatch(json_request("PUT", &format!("/todos/{}", id), "{}"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_body_is_400() {
    let (router, _pool) = test_app().await;

    let response = router
        .dispatch(json_request("POST", "/todos", "{broken"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Malformed request body");
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (router, _pool) = test_app().await;

    let response = router.dispatch(request("GET", "/health", &[], "")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "ok");
}

#[tokio::test]
async fn root_redirects_html_clients_to_todos() {
    let (router, _pool) = test_app().await;

    let response = router
        .dispatch(request("GET", "/", &[("accept", "text/html")], ""))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get("location").unwrap(), "/todos");

    // JSON clients get the descriptor as-is: 302 body, no Location.
    let response = router.dispatch(request("GET", "/", &[], "")).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(response.headers().get("location").is_none());
}
