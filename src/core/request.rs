//! HTTP request abstraction handed to route handlers.
//!
//! Wraps the pieces of an inbound hyper request and adds the application
//! conventions on top: lazy body parsing (JSON or form-encoded) with a size
//! guard, the `_method` override, percent-decoded query parameters, and the
//! named path captures filled in by the router.

use std::sync::LazyLock;

use bytes::Bytes;
use http::header::{self, HeaderName};
use http::{HeaderMap, Method, Uri};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use serde_json::{Map, Value};

use super::error::{Error, Result};

/// Header name constants for fast lookup.
mod header_names {
    use super::*;

    pub static ACCEPT: HeaderName = header::ACCEPT;
    pub static CONTENT_TYPE: HeaderName = header::CONTENT_TYPE;
    pub static CONTENT_LENGTH: HeaderName = header::CONTENT_LENGTH;
}

/// Boxed error type for type-erased request bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Type-erased request body, so the router can be driven by hyper's
/// `Incoming` in production and by buffered bytes in tests.
pub type RequestBody = UnsyncBoxBody<Bytes, BoxError>;

/// The body field a POST request may use to reach PUT/DELETE routes.
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

/// Parsed body map returned before `parse_body` has run.
static EMPTY_BODY: LazyLock<Map<String, Value>> = LazyLock::new(Map::new);

/// Wrap already-buffered bytes as a [`RequestBody`].
pub fn buffered_body(bytes: Bytes) -> RequestBody {
    Full::new(bytes).map_err(|never| match never {}).boxed_unsync()
}

/// HTTP request for route handlers.
///
/// Note: Clone is intentionally not derived; a request is owned by exactly
/// one dispatch and its body can be consumed only once.
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Option<RequestBody>,
    parsed: Option<Map<String, Value>>,
    params: Vec<(String, String)>,
    max_body: usize,
}

impl Request {
    /// Create a new request from decomposed hyper parts.
    pub fn new(parts: http::request::Parts, body: RequestBody, max_body: usize) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body: Some(body),
            parsed: None,
            params: Vec::new(),
            max_body,
        }
    }

    /// The method the transport actually carried.
    #[inline]
    pub fn transport_method(&self) -> &Method {
        &self.method
    }

    /// The effective method: the `_method` override from the parsed body
    /// when this is a POST carrying `PUT` or `DELETE`, else the transport
    /// method. Overrides only take effect once [`parse_body`] has run.
    ///
    /// [`parse_body`]: Request::parse_body
    pub fn method(&self) -> Method {
        if self.method == Method::POST {
            if let Some(Value::String(value)) = self
                .parsed
                .as_ref()
                .and_then(|map| map.get(METHOD_OVERRIDE_FIELD))
            {
                match value.to_ascii_uppercase().as_str() {
                    "PUT" => return Method::PUT,
                    "DELETE" => return Method::DELETE,
                    _ => {}
                }
            }
        }
        self.method.clone()
    }

    /// Get the request path.
    #[inline]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Get the full URI.
    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Get the headers.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a header value by name (fast path with HeaderName constant).
    #[inline]
    fn header_by_name(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get a header value by string name (case-insensitive).
    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Check whether the `Accept` header is present and contains the given
    /// MIME type as a substring.
    pub fn accepts(&self, mime: &str) -> bool {
        self.header_by_name(&header_names::ACCEPT)
            .map(|v| v.contains(mime))
            .unwrap_or(false)
    }

    /// Get Content-Type header.
    #[inline]
    pub fn content_type(&self) -> Option<&str> {
        self.header_by_name(&header_names::CONTENT_TYPE)
    }

    /// Get Content-Length header.
    #[inline]
    pub fn content_length(&self) -> Option<u64> {
        self.header_by_name(&header_names::CONTENT_LENGTH)
            .and_then(|v| v.parse().ok())
    }

    /// Percent-decoded query string parameters, in order of appearance.
    pub fn query_params(&self) -> Vec<(String, String)> {
        self.uri.query().map(parse_urlencoded).unwrap_or_default()
    }

    /// First query parameter with the given name.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query_params()
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Named path captures, set by the router after a successful match.
    pub(crate) fn set_params(&mut self, params: Vec<(String, String)>) {
        self.params = params;
    }

    /// A named path capture, e.g. `id` from a `/todos/:id` route.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// A named path capture parsed as an integer id. `None` when the
    /// capture is absent or not numeric; callers answer that with a 400.
    pub fn param_i64(&self, name: &str) -> Option<i64> {
        self.param(name).and_then(|v| v.parse().ok())
    }

    /// Collect and parse the request body, caching the result.
    ///
    /// This is the only suspension point in request handling: it buffers
    /// the remaining body (bounded by the configured limit), then parses it
    /// as form-encoding when the Content-Type says so and as a JSON object
    /// otherwise. An empty body parses to an empty map. Only the first
    /// parse touches the transport; later calls return the cache.
    pub async fn parse_body(&mut self) -> Result<&Map<String, Value>> {
        if self.parsed.is_none() {
            let form_encoded = self
                .content_type()
                .map(|ct| ct.contains("x-www-form-urlencoded"))
                .unwrap_or(false);
            let bytes = self.collect_body().await?;
            self.parsed = Some(parse_body_bytes(form_encoded, &bytes)?);
        }
        Ok(self.body())
    }

    /// The parsed body map; empty until [`parse_body`] has run.
    ///
    /// [`parse_body`]: Request::parse_body
    pub fn body(&self) -> &Map<String, Value> {
        self.parsed.as_ref().unwrap_or(&EMPTY_BODY)
    }

    async fn collect_body(&mut self) -> Result<Bytes> {
        if let Some(len) = self.content_length() {
            if len as usize > self.max_body {
                return Err(Error::BodyTooLarge {
                    limit: self.max_body,
                });
            }
        }

        let body = match self.body.take() {
            Some(body) => body,
            None => return Ok(Bytes::new()),
        };

        let bytes = body
            .collect()
            .await
            .map_err(|e| Error::Custom(format!("failed to read request body: {}", e)))?
            .to_bytes();

        if bytes.len() > self.max_body {
            return Err(Error::BodyTooLarge {
                limit: self.max_body,
            });
        }

        Ok(bytes)
    }
}

/// Parse a buffered body as form-encoding or a JSON object.
fn parse_body_bytes(form_encoded: bool, bytes: &Bytes) -> Result<Map<String, Value>> {
    if bytes.is_empty() {
        return Ok(Map::new());
    }

    if form_encoded {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| Error::MalformedBody("body is not valid UTF-8".to_string()))?;
        return Ok(parse_urlencoded(text)
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect());
    }

    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| Error::MalformedBody(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(Error::MalformedBody("expected a JSON object".to_string())),
    }
}

/// Parse a `key=value&...` string into decoded key-value pairs.
///
/// `+` and percent escapes decode to their byte values; pairs with an
/// empty key are skipped.
pub fn parse_urlencoded(input: &str) -> Vec<(String, String)> {
    let pair_count = input.matches('&').count() + 1;
    let mut params = Vec::with_capacity(pair_count.min(16));

    for pair in input.split('&') {
        if pair.is_empty() {
            continue;
        }

        let (key, value) = match pair.find('=') {
            Some(pos) => (&pair[..pos], &pair[pos + 1..]),
            None => (pair, ""),
        };

        if !key.is_empty() {
            params.push((decode_component(key), decode_component(value)));
        }
    }

    params
}

fn decode_component(s: &str) -> String {
    let s = s.replace('+', " ");
    percent_encoding::percent_decode_str(&s)
        .decode_utf8_lossy()
        .into_owned()
}
