//! Request routing and dispatch.
//!
//! The router owns the route table and drives the whole request lifecycle:
//! it builds the [`Request`]/[`Responder`] pair, pre-parses POST bodies so
//! `_method` overrides can influence matching, walks the routes in
//! registration order (first structural match wins), and translates every
//! failure mode into a response. Handlers never see a connection; they see
//! the pair and must perform exactly one terminal write.

mod pattern;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{self, HeaderValue};
use http::{Method, StatusCode};
use http_body_util::Full;
use futures_util::future::BoxFuture;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::core::{Error, Reply, Request, RequestBody, Responder, Result};
use crate::templates::Templates;

pub use pattern::{split_path, PathPattern, Segment};

/// Default request body cap (64 KiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024;

/// Default per-handler timeout.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

type BoxHandlerFuture = BoxFuture<'static, Result<Responder>>;
type BoxHandler = Box<dyn Fn(Request, Responder) -> BoxHandlerFuture + Send + Sync>;

/// A registered route: method + compiled pattern + handler.
struct Route {
    method: Method,
    pattern: PathPattern,
    handler: BoxHandler,
}

/// Route table and dispatcher.
///
/// Routes are tried in registration order and the first structural match
/// wins, so literal routes that a dynamic pattern could shadow (e.g.
/// `/todos/new` vs `/todos/:id`) must be registered first. The router does
/// not validate overlap; that ordering is the caller's responsibility.
pub struct Router {
    routes: Vec<Route>,
    templates: Arc<Templates>,
    max_body_size: usize,
    handler_timeout: Option<Duration>,
}

impl Router {
    /// Create an empty router rendering through the given template set.
    pub fn new(templates: Arc<Templates>) -> Self {
        Self {
            routes: Vec::new(),
            templates,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            handler_timeout: Some(DEFAULT_HANDLER_TIMEOUT),
        }
    }

    /// Set the request body size limit.
    pub fn with_max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = limit;
        self
    }

    /// Set the per-handler timeout (`None` disables it).
    pub fn with_handler_timeout(mut self, limit: Option<Duration>) -> Self {
        self.handler_timeout = limit;
        self
    }

    /// Register a route. Patterns use `:name` for dynamic segments.
    pub fn register<H, Fut>(&mut self, method: Method, pattern: &str, handler: H)
    where
        H: Fn(Request, Responder) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Responder>> + Send + 'static,
    {
        self.routes.push(Route {
            method,
            pattern: PathPattern::parse(pattern),
            handler: Box::new(move |req, res| -> BoxHandlerFuture {
                Box::pin(handler(req, res))
            }),
        });
    }

    /// Register a GET route.
    pub fn get<H, Fut>(&mut self, pattern: &str, handler: H)
    where
        H: Fn(Request, Responder) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Responder>> + Send + 'static,
    {
        self.register(Method::GET, pattern, handler);
    }

    /// Register a POST route.
    pub fn post<H, Fut>(&mut self, pattern: &str, handler: H)
    where
        H: Fn(Request, Responder) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Responder>> + Send + 'static,
    {
        self.register(Method::POST, pattern, handler);
    }

    /// Register a PUT route.
    pub fn put<H, Fut>(&mut self, pattern: &str, handler: H)
    where
        H: Fn(Request, Responder) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Responder>> + Send + 'static,
    {
        self.register(Method::PUT, pattern, handler);
    }

    /// Register a DELETE route.
    pub fn delete<H, Fut>(&mut self, pattern: &str, handler: H)
    where
        H: Fn(Request, Responder) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Responder>> + Send + 'static,
    {
        self.register(Method::DELETE, pattern, handler);
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatch one request to the first matching route.
    ///
    /// Every outcome becomes a response here: routing misses become 404s,
    /// unparseable POST bodies 400s, oversized bodies 413s, handler errors
    /// and handlers that never send 500s, timeouts 504s.
    pub async fn dispatch(&self, req: http::Request<RequestBody>) -> http::Response<Full<Bytes>> {
        let (parts, body) = req.into_parts();
        let path = parts.uri.path().to_string();

        let mut request = Request::new(parts, body, self.max_body_size);
        let accepts_html = request.accepts("text/html");
        let responder = Responder::new(accepts_html, Arc::clone(&self.templates));

        // POST bodies are parsed before matching so a `_method` override
        // can steer the request to a PUT/DELETE route. The body read runs
        // under the same clock as the handler: a stalled upload must not
        // pin the dispatch forever.
        if request.transport_method() == &Method::POST {
            let parsed = match self.handler_timeout {
                Some(limit) => match timeout(limit, request.parse_body()).await {
                    Ok(result) => result.map(|_| ()),
                    Err(_) => {
                        warn!(%path, "request body read timed out");
                        return error_response(
                            StatusCode::REQUEST_TIMEOUT,
                            "Request body timed out",
                        );
                    }
                },
                None => request.parse_body().await.map(|_| ()),
            };

            match parsed {
                Ok(()) => {}
                Err(Error::BodyTooLarge { .. }) => {
                    return finish(
                        responder,
                        Reply::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large"),
                    );
                }
                Err(err) => {
                    debug!(%path, error = %err, "rejecting unparseable request body");
                    return finish(responder, Reply::bad_request("Malformed request body"));
                }
            }
        }

        let method = request.method();
        let segments = split_path(&path);

        for route in &self.routes {
            if route.method != method {
                continue;
            }
            let Some(params) = route.pattern.matches(&segments) else {
                continue;
            };
            request.set_params(params);

            let future = (route.handler)(request, responder);
            let outcome = match self.handler_timeout {
                Some(limit) => match timeout(limit, future).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(%method, %path, "handler timed out");
                        return error_response(StatusCode::GATEWAY_TIMEOUT, "Request timed out");
                    }
                },
                None => future.await,
            };

            return match outcome {
                Ok(responder) => match responder.into_response() {
                    Ok(response) => response,
                    Err(_) => {
                        error!(%method, %path, "handler returned without sending a response");
                        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                    }
                },
                Err(err) => {
                    error!(%method, %path, error = %err, "handler failed");
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                }
            };
        }

        finish(
            responder,
            Reply::not_found(format!("Invalid route: {} {}", method, path)),
        )
    }
}

/// Send a reply through the responder, falling back to a bare JSON
/// response if encoding fails.
fn finish(mut responder: Responder, reply: Reply) -> http::Response<Full<Bytes>> {
    let status = reply.status();
    let message = reply.message().to_string();
    match responder.send(reply) {
        Ok(()) => match responder.into_response() {
            Ok(response) => response,
            Err(err) => {
                error!(error = %err, "responder produced no output");
                error_response(status, &message)
            }
        },
        Err(err) => {
            error!(error = %err, "failed to encode response");
            error_response(status, &message)
        }
    }
}

/// Bare JSON response for paths where no responder is available.
fn error_response(status: StatusCode, message: &str) -> http::Response<Full<Bytes>> {
    let body = serde_json::to_string_pretty(&serde_json::json!({ "message": message }))
        .unwrap_or_default();
    http::Response::builder()
        .status(status)
        .header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
