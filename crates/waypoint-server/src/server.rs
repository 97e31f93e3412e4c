//! `WaypointServer`: Axum HTTP server.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::Router;
use axum::routing::get;
use rusqlite::Connection;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use waypoint_core::DomainError;
use waypoint_settings::ServerSettings;
use waypoint_store::ConnectionPool;

use crate::envelope::ApiError;
use crate::health;
use crate::routes;
use crate::shutdown::Shutdown;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database pool.
    pub pool: ConnectionPool,
    /// Expose unexpected-error detail in responses.
    pub debug: bool,
    /// When the server started.
    pub start_time: Instant,
}

impl AppState {
    /// Run a service call on the blocking pool with a pooled connection.
    ///
    /// Errors come back ready to render, carrying the `debug` flag.
    pub async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Connection) -> waypoint_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await
        .map_err(|e| DomainError::Internal(format!("blocking task failed: {e}")))
        .and_then(|r| r);
        outcome.map_err(|e| ApiError::new(e, self.debug))
    }
}

/// The Waypoint HTTP server.
pub struct WaypointServer {
    settings: ServerSettings,
    pool: ConnectionPool,
    shutdown: Shutdown,
    start_time: Instant,
}

impl WaypointServer {
    /// Create a server over a migrated pool.
    pub fn new(settings: ServerSettings, pool: ConnectionPool) -> Self {
        Self {
            shutdown: Shutdown::with_grace(Duration::from_secs(settings.shutdown_grace_secs)),
            settings,
            pool,
            start_time: Instant::now(),
        }
    }

    /// Build the router with every route, CORS, tracing, and the body limit.
    pub fn router(&self) -> Router {
        let state = AppState {
            pool: self.pool.clone(),
            debug: self.settings.debug,
            start_time: self.start_time,
        };

        let v1 = routes::router()
            .route("/health", get(health::handler))
            .with_state(state);

        Router::new()
            .nest("/v1", v1)
            .layer(RequestBodyLimitLayer::new(self.settings.request_body_limit_bytes))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind `host:port` and serve until [`Shutdown::trigger`] runs.
    ///
    /// Returns the bound address (port 0 picks a free one) and the server
    /// task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = tokio::net::TcpListener::bind((self.settings.host.as_str(), self.settings.port)).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.signal();

        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = served {
                error!(error = %e, "server stopped with an error");
            }
        });
        info!(%addr, "waypoint listening");
        Ok((addr, handle))
    }

    /// The listener's shutdown signal.
    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// The server settings.
    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use waypoint_store::ConnectionConfig;

    fn make_server() -> WaypointServer {
        let pool = waypoint_store::connection::new_in_memory(&ConnectionConfig::default()).unwrap();
        let _ = waypoint_store::run_migrations(&pool.get().unwrap()).unwrap();
        let settings = ServerSettings {
            port: 0,
            ..ServerSettings::default()
        };
        WaypointServer::new(settings, pool)
    }

    #[tokio::test]
    async fn health_reports_schema_version() {
        let app = make_server().router();
        let req = Request::builder().uri("/v1/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["schema_current"], true);
        assert_eq!(parsed["schema_version"], waypoint_store::migrations::latest_version());
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = make_server().router();
        let req = Request::builder().uri("/nonexistent").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_binds_and_drains() {
        let server = make_server();
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert!(server.shutdown().drain(handle).await);
        assert!(server.shutdown().is_triggered());
    }
}
