//! HTTP response abstraction for route handlers.
//!
//! Handlers describe the outcome of a request with a [`Reply`] value; the
//! [`Responder`] interprets it and performs exactly one terminal write
//! action: redirect, template render, or JSON emit. The responder is a
//! one-shot state machine (Unsent → Sent) and fails fast on a second send.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{self, HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::error::{Error, Result};
use crate::templates::Templates;

/// Common header name constants for fast lookup.
mod header_names {
    use super::*;
    pub static CONTENT_TYPE: HeaderName = header::CONTENT_TYPE;
    pub static LOCATION: HeaderName = header::LOCATION;
}

/// Pre-allocated static header values for the content types we emit.
mod content_types {
    use super::*;
    pub static TEXT_HTML: HeaderValue = HeaderValue::from_static("text/html; charset=utf-8");
    pub static APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");
}

/// Description of a response outcome, produced by a handler.
///
/// A reply is a plain value; the responder decides how it hits the wire.
/// For HTML-capable clients a redirect target wins over a template, and a
/// reply with neither falls through to JSON.
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    message: String,
    payload: Option<Value>,
    template: Option<String>,
    redirect: Option<String>,
}

impl Reply {
    /// Create a new reply with a status code and message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            payload: None,
            template: None,
            redirect: None,
        }
    }

    /// 200 OK reply.
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, message)
    }

    /// 201 Created reply.
    pub fn created(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, message)
    }

    /// 400 Bad Request reply.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 404 Not Found reply.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 500 Internal Server Error reply with the generic client message.
    pub fn internal_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    /// Attach a JSON payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Attach a template name for HTML-capable clients.
    pub fn with_template(mut self, name: impl Into<String>) -> Self {
        self.template = Some(name.into());
        self
    }

    /// Attach a redirect target for HTML-capable clients.
    pub fn with_redirect(mut self, target: impl Into<String>) -> Self {
        self.redirect = Some(target.into());
        self
    }

    /// Get the status code.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the payload, if any.
    #[inline]
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }
}

/// JSON body shape: `{"message": ..., "payload": ...}`, payload omitted
/// when absent.
#[derive(Serialize)]
struct JsonBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a Value>,
}

/// One-shot response writer for a single request.
///
/// Created by the router next to the [`Request`](super::Request); consumed
/// by exactly one `send`. The rendered response is handed back to the
/// dispatcher through [`into_response`](Responder::into_response).
pub struct Responder {
    accepts_html: bool,
    templates: Arc<Templates>,
    sent: bool,
    output: Option<http::Response<Full<Bytes>>>,
}

impl Responder {
    /// Create a responder. `accepts_html` is the content negotiation
    /// result, computed once per request from the `Accept` header.
    pub fn new(accepts_html: bool, templates: Arc<Templates>) -> Self {
        Self {
            accepts_html,
            templates,
            sent: false,
            output: None,
        }
    }

    /// Whether the client negotiated HTML.
    #[inline]
    pub fn accepts_html(&self) -> bool {
        self.accepts_html
    }

    /// Whether a terminal write action has already happened.
    #[inline]
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Perform the terminal write action for this request.
    ///
    /// Exactly one of redirect, template render, or JSON emit happens;
    /// a second call fails with [`Error::AlreadySent`] without touching
    /// the already-produced response.
    pub fn send(&mut self, reply: Reply) -> Result<()> {
        if self.sent {
            return Err(Error::AlreadySent);
        }

        debug!(
            status = reply.status.as_u16(),
            message = %reply.message,
            "sending response"
        );

        let response = if self.accepts_html && reply.redirect.is_some() {
            self.redirect_response(&reply)?
        } else if self.accepts_html && reply.template.is_some() {
            self.template_response(&reply)?
        } else {
            self.json_response(&reply)?
        };

        self.output = Some(response);
        self.sent = true;
        Ok(())
    }

    /// `send` and hand the responder back, for use as a handler tail call.
    pub fn reply(mut self, reply: Reply) -> Result<Self> {
        self.send(reply)?;
        Ok(self)
    }

    /// Take the rendered response. Fails with [`Error::NoResponse`] when
    /// the handler never sent.
    pub fn into_response(self) -> Result<http::Response<Full<Bytes>>> {
        self.output.ok_or(Error::NoResponse)
    }

    fn redirect_response(&self, reply: &Reply) -> Result<http::Response<Full<Bytes>>> {
        let target = reply.redirect.as_deref().unwrap_or("/");
        let response = http::Response::builder()
            .status(StatusCode::FOUND)
            .header(header_names::LOCATION.clone(), target)
            .body(Full::new(Bytes::new()))?;
        Ok(response)
    }

    fn template_response(&self, reply: &Reply) -> Result<http::Response<Full<Bytes>>> {
        let name = reply.template.as_deref().unwrap_or_default();
        let html = self
            .templates
            .render(name, &reply.message, reply.payload.as_ref())?;
        let response = http::Response::builder()
            .status(reply.status)
            .header(
                header_names::CONTENT_TYPE.clone(),
                content_types::TEXT_HTML.clone(),
            )
            .body(Full::new(Bytes::from(html)))?;
        Ok(response)
    }

    fn json_response(&self, reply: &Reply) -> Result<http::Response<Full<Bytes>>> {
        let body = serde_json::to_string_pretty(&JsonBody {
            message: &reply.message,
            payload: reply.payload.as_ref(),
        })?;
        let response = http::Response::builder()
            .status(reply.status)
            .header(
                header_names::CONTENT_TYPE.clone(),
                content_types::APPLICATION_JSON.clone(),
            )
            .body(Full::new(Bytes::from(body)))?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_responder() -> Responder {
        Responder::new(false, Arc::new(Templates::empty()))
    }

    fn html_responder() -> Responder {
        Responder::new(true, Arc::new(Templates::empty()))
    }

    fn body_string(response: http::Response<Full<Bytes>>) -> String {
        use http_body_util::BodyExt;
        let bytes = tokio_test::block_on(response.into_body().collect())
            .unwrap()
            .to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_json_response_shape() {
        let mut res = json_responder();
        res.send(
            Reply::ok("Todos fetched").with_payload(json!({"todos": []})),
        )
        .unwrap();

        let response = res.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );

        let body = body_string(response);
        // Pretty-printed output spans multiple lines.
        assert!(body.contains('\n'));
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["message"], "Todos fetched");
        assert_eq!(value["payload"]["todos"], json!([]));
    }

    #[test]
    fn test_json_response_omits_absent_payload() {
        let mut res = json_responder();
        res.send(Reply::not_found("Todo not found")).unwrap();

        let body = body_string(res.into_response().unwrap());
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["message"], "Todo not found");
        assert!(value.get("payload").is_none());
    }

    #[test]
    fn test_redirect_for_html_client() {
        let mut res = html_responder();
        res.send(Reply::created("Todo created").with_redirect("/todos/1"))
            .unwrap();

        let response = res.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get("location").unwrap(), "/todos/1");
        assert!(body_string(response).is_empty());
    }

    #[test]
    fn test_redirect_is_json_for_json_client() {
        // Same descriptor, JSON-only client: status survives, no Location.
        let mut res = json_responder();
        res.send(
            Reply::new(StatusCode::FOUND, "Redirecting").with_redirect("/todos/1"),
        )
        .unwrap();

        let response = res.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(response.headers().get("location").is_none());
        let value: Value = serde_json::from_str(&body_string(response)).unwrap();
        assert_eq!(value["message"], "Redirecting");
    }

    #[test]
    fn test_redirect_takes_priority_over_template() {
        let mut templates = Templates::empty();
        templates
            .add_raw("todos/index.html", "<p>{{ message }}</p>")
            .unwrap();
        let mut res = Responder::new(true, Arc::new(templates));

        res.send(
            Reply::ok("done")
                .with_template("todos/index.html")
                .with_redirect("/todos"),
        )
        .unwrap();

        let response = res.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get("location").unwrap(), "/todos");
    }

    #[test]
    fn test_template_render_for_html_client() {
        let mut templates = Templates::empty();
        templates
            .add_raw(
                "todos/index.html",
                "<h1>{{ message }}</h1><p>{{ payload.count }}</p>",
            )
            .unwrap();
        let mut res = Responder::new(true, Arc::new(templates));

        res.send(
            Reply::ok("Todos fetched")
                .with_payload(json!({"count": 3}))
                .with_template("todos/index.html"),
        )
        .unwrap();

        let response = res.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/html; charset=utf-8"
        );
        assert_eq!(body_string(response), "<h1>Todos fetched</h1><p>3</p>");
    }

    #[test]
    fn test_template_ignored_for_json_client() {
        let mut res = json_responder();
        res.send(Reply::ok("hello").with_template("does/not/exist.html"))
            .unwrap();

        let response = res.into_response().unwrap();
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_html_client_without_template_falls_through_to_json() {
        let mut res = html_responder();
        res.send(Reply::ok("no view")).unwrap();

        let response = res.into_response().unwrap();
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_missing_template_is_an_error_not_a_write() {
        let mut res = html_responder();
        let result = res.send(Reply::ok("x").with_template("missing.html"));

        assert!(matches!(result, Err(Error::Template(_))));
        assert!(!res.is_sent());
        assert!(matches!(res.into_response(), Err(Error::NoResponse)));
    }

    #[test]
    fn test_double_send_fails_fast() {
        let mut res = json_responder();
        res.send(Reply::ok("first")).unwrap();

        let second = res.send(Reply::ok("second"));
        assert!(matches!(second, Err(Error::AlreadySent)));

        // The first write is untouched.
        let body = body_string(res.into_response().unwrap());
        assert!(body.contains("first"));
    }

    #[test]
    fn test_into_response_without_send() {
        let res = json_responder();
        assert!(matches!(res.into_response(), Err(Error::NoResponse)));
    }
}
