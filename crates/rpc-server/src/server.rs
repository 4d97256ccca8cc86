//! HTTP server implementation using Axum.

use crate::handler::{handle_health, handle_rpc};
use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use rpc_dispatch::{attach, DispatchConfig, Dispatcher, Driver, Entrypoint, MethodDescriptor};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// State shared across handlers.
pub struct AppState {
    pub entry: Entrypoint,
}

/// HTTP transport options.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    /// 0 = auto-assign
    pub port: u16,
    /// Mounted in front of `/rpc`, e.g. `/api` serves `/api/rpc`.
    pub route_prefix: String,
    pub cors: bool,
    pub body_limit: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            route_prefix: String::new(),
            cors: false,
            body_limit: DispatchConfig::MAX_BODY_BYTES,
        }
    }
}

impl ServerOptions {
    /// Path of the RPC route.
    pub fn rpc_path(&self) -> String {
        let prefix = self.route_prefix.trim_matches('/');
        if prefix.is_empty() {
            "/rpc".to_string()
        } else {
            format!("/{}/rpc", prefix)
        }
    }
}

/// Axum transport for the dispatcher.
pub struct AxumDriver {
    options: ServerOptions,
    router: Option<Router>,
}

impl AxumDriver {
    /// Driver that has not been registered yet.
    pub fn new(options: ServerOptions) -> Self {
        Self {
            options,
            router: None,
        }
    }

    /// Bind and serve in the background.
    ///
    /// Returns the actual address the server is bound to (useful when port=0).
    pub async fn serve(self) -> anyhow::Result<SocketAddr> {
        let app = self
            .router
            .context("No dispatcher registered with the HTTP driver")?;

        // Parse the address
        let addr: SocketAddr = format!("{}:{}", self.options.host, self.options.port).parse()?;

        // Bind to the address
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let actual_addr = listener.local_addr()?;

        info!("Server listening on {}", actual_addr);

        // Spawn the server in the background
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Server error: {}", e);
            }
        });

        Ok(actual_addr)
    }
}

impl Driver for AxumDriver {
    type Error = anyhow::Error;

    fn register(
        &mut self,
        methods: Vec<Arc<MethodDescriptor>>,
        entry: Entrypoint,
    ) -> anyhow::Result<()> {
        for method in &methods {
            debug!("Exposing {} at {}", method.full_name, self.options.rpc_path());
        }
        info!("Registered {} RPC methods", methods.len());

        self.router = Some(build_router(&self.options, entry));
        Ok(())
    }
}

fn build_router(options: &ServerOptions, entry: Entrypoint) -> Router {
    let state = Arc::new(AppState { entry });

    let app = Router::new()
        .route("/health", get(handle_health))
        .route(&options.rpc_path(), post(handle_rpc))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(options.body_limit)),
        );

    if options.cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app.layer(cors)
    } else {
        app
    }
}

/// Start the JSON-RPC HTTP server for `dispatcher`.
pub async fn start_server(
    dispatcher: Arc<Dispatcher>,
    options: ServerOptions,
) -> anyhow::Result<SocketAddr> {
    let mut driver = AxumDriver::new(options);
    attach(dispatcher, &mut driver)?;
    driver.serve().await
}
