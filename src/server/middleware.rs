use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::guard::{InspectedRequest, Interceptor, Verdict, sampler};

/// Wrap every route of `router` with the SQL-injection guard.
pub fn guard_router<S>(router: Router<S>, interceptor: Arc<Interceptor>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(interceptor, guard_request))
}

/// Axum middleware: buffer the body, evaluate the request, then either
/// short-circuit with a 403 or pass the rebuilt request to `next`.
pub async fn guard_request(
    State(interceptor): State<Arc<Interceptor>>,
    request: Request,
    next: Next,
) -> Response {
    let started_at = Instant::now();
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read request body for {}: {}", parts.uri.path(), e);
            return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
        }
    };

    let verdict = {
        // Path decoded, query left raw.
        let path = sampler::decode_path(parts.uri.path());
        let inspected = InspectedRequest {
            path: &path,
            query: parts.uri.query(),
            body: Some(&bytes),
        };
        interceptor.evaluate(&inspected, started_at)
    };

    match verdict {
        Verdict::Block(rejection) => rejection.into_response(),
        Verdict::Forward(_) => next.run(Request::from_parts(parts, Body::from(bytes))).await,
    }
}
