//! Per-request orchestration: sample, scan, then block or forward.
//!
//! Every request walks the same path:
//!
//! ```text
//! Idle -> Sampling -> Scanning -> Blocked
//!                              \-> Forwarded
//! ```
//!
//! [`Interceptor::evaluate`] covers everything up to the decision. Callers
//! either act on the returned [`Verdict`] themselves (the axum middleware
//! does) or hand a downstream handler to [`Interceptor::intercept`].

use std::sync::Arc;
use std::time::Instant;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, trace, warn};

use super::registry::PatternRegistry;
use super::sampler::{self, InspectedRequest};
use super::scanner::{ScanResult, ThreatScanner};

/// Header carrying the detection time on rejected requests.
pub const DEFAULT_TIMING_HEADER: &str = "X-Detection-Time-ms";

const REJECTION_PREFIX: &str = "Acceso no autorizado - intento de inyección SQL bloqueado.";

/// Response produced when a request is blocked.
#[derive(Debug, Clone)]
pub struct Rejection {
    scan: ScanResult,
    timing_header: HeaderName,
}

impl Rejection {
    pub fn scan(&self) -> &ScanResult {
        &self.scan
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::FORBIDDEN
    }

    pub fn message(&self) -> String {
        format!(
            "{REJECTION_PREFIX} Tiempo de detección: {} ms",
            self.scan.elapsed_display()
        )
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.message()).into_response();
        // Two-decimal float text is always a valid header value.
        if let Ok(value) = HeaderValue::from_str(&self.scan.elapsed_display()) {
            response.headers_mut().insert(self.timing_header, value);
        }
        response
    }
}

/// Decision for one request.
#[derive(Debug, Clone)]
pub enum Verdict {
    Block(Rejection),
    Forward(ScanResult),
}

/// Terminal state of an intercepted request.
#[derive(Debug)]
pub enum Outcome<R> {
    /// Short-circuited; the downstream handler never ran.
    Blocked(Rejection),
    /// The downstream handler's response, untouched.
    Forwarded(R),
}

/// Stateless guard shared by all requests. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Interceptor {
    registry: Arc<PatternRegistry>,
    timing_header: HeaderName,
}

impl Interceptor {
    pub fn new(registry: Arc<PatternRegistry>) -> Self {
        Self {
            registry,
            timing_header: HeaderName::from_static("x-detection-time-ms"),
        }
    }

    /// Use a different header name for the detection time.
    pub fn with_timing_header(mut self, name: HeaderName) -> Self {
        self.timing_header = name;
        self
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    pub fn timing_header(&self) -> &HeaderName {
        &self.timing_header
    }

    /// Sample and scan `request`. `started_at` is the moment the request
    /// entered the guard.
    pub fn evaluate(&self, request: &InspectedRequest<'_>, started_at: Instant) -> Verdict {
        trace!(path = request.path, "sampling");
        let target = sampler::sample(request);

        trace!(path = request.path, len = target.len(), "scanning");
        let scan = ThreatScanner::scan(&target, &self.registry, started_at);

        match scan.matched_rule {
            Some(index) => {
                let pattern = self.registry.rules()[index].pattern();
                warn!(
                    path = request.path,
                    query = %sampler::truncate(request.query.unwrap_or(""), 200),
                    rule = index,
                    pattern,
                    elapsed_ms = scan.elapsed_ms,
                    "BLOCKED SQL injection attempt"
                );
                Verdict::Block(Rejection {
                    scan,
                    timing_header: self.timing_header.clone(),
                })
            }
            None => {
                debug!(path = request.path, elapsed_ms = scan.elapsed_ms, "forwarding");
                Verdict::Forward(scan)
            }
        }
    }

    /// Evaluate `request` and run `handle` only if it is clean.
    ///
    /// `handle` is called at most once. Its error is returned as-is.
    pub fn intercept<R, E, F>(
        &self,
        request: &InspectedRequest<'_>,
        handle: F,
    ) -> Result<Outcome<R>, E>
    where
        F: FnOnce() -> Result<R, E>,
    {
        let started_at = Instant::now();
        match self.evaluate(request, started_at) {
            Verdict::Block(rejection) => Ok(Outcome::Blocked(rejection)),
            Verdict::Forward(_) => handle().map(Outcome::Forwarded),
        }
    }
}
