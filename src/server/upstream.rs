//! Default downstream handler: relays clean requests to the protected origin.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error, warn};

use crate::error::{GuardError, Result};

/// Headers that describe a single connection and must not be relayed.
static HOP_BY_HOP: [header::HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// HTTP client bound to one upstream origin.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: reqwest::Client,
    base_url: String,
}

impl Upstream {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GuardError::Server(format!("failed to build upstream client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Router that sends every request to `upstream`.
pub fn router(upstream: Arc<Upstream>) -> Router {
    Router::new().fallback(forward).with_state(upstream)
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}

async fn forward(State(upstream): State<Arc<Upstream>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read request body for {}: {}", parts.uri, e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let path_and_query = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
    let url = format!("{}{}", upstream.base_url, path_and_query);

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);

    debug!("Forwarding {} {}", parts.method, url);
    let result = upstream
        .client
        .request(parts.method, &url)
        .headers(headers)
        .body(bytes)
        .send()
        .await;

    let upstream_response = match result {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            warn!("Timeout waiting for upstream {}", url);
            return StatusCode::GATEWAY_TIMEOUT.into_response();
        }
        Err(e) => {
            error!("Upstream request to {} failed: {}", url, e);
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let status = upstream_response.status();
    let mut headers = upstream_response.headers().clone();
    strip_hop_by_hop(&mut headers);

    match upstream_response.bytes().await {
        Ok(body) => {
            let mut response = Response::new(Body::from(body));
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            response
        }
        Err(e) => {
            error!("Failed to read upstream response from {}: {}", url, e);
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}
