pub mod middleware;
pub mod upstream;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::guard::Interceptor;

pub use middleware::{guard_request, guard_router};
pub use upstream::Upstream;

/// HTTP server that runs every request through the [`Interceptor`] before
/// handing it to the downstream router.
pub struct GuardServer {
    listen_addr: String,
    interceptor: Option<Arc<Interceptor>>,
    downstream: Router,
}

impl GuardServer {
    /// A server whose downstream answers `404` to everything until
    /// [`GuardServer::with_router`] or [`GuardServer::with_upstream`] is set.
    pub fn new(listen_addr: String) -> Self {
        Self {
            listen_addr,
            interceptor: None,
            downstream: Router::new(),
        }
    }

    pub fn with_interceptor(mut self, interceptor: Interceptor) -> Self {
        self.interceptor = Some(Arc::new(interceptor));
        self
    }

    /// Serve `router` behind the guard.
    pub fn with_router(mut self, router: Router) -> Self {
        self.downstream = router;
        self
    }

    /// Relay clean requests to an upstream origin.
    pub fn with_upstream(self, upstream: Upstream) -> Self {
        self.with_router(upstream::router(Arc::new(upstream)))
    }

    /// The guarded application router.
    ///
    /// Without an explicit interceptor, one built from the default patterns is used.
    pub fn app(&self) -> Result<Router> {
        let interceptor = match &self.interceptor {
            Some(interceptor) => interceptor.clone(),
            None => Arc::new(Interceptor::new(Arc::new(
                crate::guard::PatternRegistry::with_defaults()?,
            ))),
        };
        Ok(guard_router(self.downstream.clone(), interceptor))
    }

    /// Start the server and return the actual bound address.
    pub async fn start(&self) -> Result<SocketAddr> {
        let app = self.app()?;
        let listener = TcpListener::bind(&self.listen_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("SQLGuard listening on {}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("SQLGuard server stopped: {}", e);
            }
        });

        Ok(local_addr)
    }
}
