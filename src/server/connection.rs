//! TCP connection handling.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::HeaderName;
use http::HeaderValue;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use tokio::net::TcpStream;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::request::BoxError;
use crate::router::Router;

static X_REQUEST_ID: LazyLock<HeaderName> =
    LazyLock::new(|| HeaderName::from_static("x-request-id"));

const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared state for serving connections.
pub struct ConnectionContext {
    /// The dispatcher every request goes through.
    pub router: Arc<Router>,
    /// Active connections counter, for shutdown draining.
    pub active_connections: Arc<AtomicUsize>,
    /// Per-request access log lines (ACCESS_LOG=1).
    pub access_log_enabled: bool,
}

impl ConnectionContext {
    /// Serve one accepted connection until the peer goes away.
    pub async fn handle_connection(self: Arc<Self>, stream: TcpStream, remote_addr: SocketAddr) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);

        let ctx = Arc::clone(&self);
        let service = service_fn(move |req| {
            let ctx = Arc::clone(&ctx);
            async move { ctx.handle_request(req, remote_addr).await }
        });

        let io = TokioIo::new(stream);
        if let Err(err) = auto::Builder::new(TokioExecutor::new())
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(Some(HEADER_READ_TIMEOUT))
            .keep_alive(true)
            .http2()
            .max_concurrent_streams(250)
            .serve_connection(io, service)
            .await
        {
            let err_str = format!("{:?}", err);
            if !is_connection_error(&err_str) {
                debug!("Connection error: {:?}", err);
            }
        }

        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    async fn handle_request(
        &self,
        req: Request<Incoming>,
        remote_addr: SocketAddr,
    ) -> Result<http::Response<Full<Bytes>>, Infallible> {
        let started = Instant::now();
        let request_id = Uuid::new_v4();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let req = req.map(|body| body.map_err(|e| Box::new(e) as BoxError).boxed_unsync());
        let mut response = self.router.dispatch(req).await;

        if let Ok(value) = HeaderValue::try_from(request_id.to_string()) {
            response.headers_mut().insert(X_REQUEST_ID.clone(), value);
        }

        if self.access_log_enabled {
            info!(
                target: "access",
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                ip = %remote_addr.ip(),
                request_id = %request_id,
                "request"
            );
        }

        Ok(response)
    }
}

/// Check if an error string is a routine client disconnect not worth
/// logging.
fn is_connection_error(err: &str) -> bool {
    err.contains("connection reset")
        || err.contains("broken pipe")
        || err.contains("IncompleteMessage")
        || err.contains("connection closed")
        || err.contains("NotConnected")
}
