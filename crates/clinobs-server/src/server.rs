use std::{any::Any, net::SocketAddr, sync::Arc};

use axum::{
    Router, middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use clinobs_api::ApiError;
use clinobs_db_memory::create_memory_store;
use clinobs_storage::DynStore;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer,
    trace::TraceLayer,
};

use crate::{
    config::AppConfig, fixtures, handlers, middleware as app_middleware,
    service::ObservationService,
};

/// Shared handler state. Cloned per request; everything inside is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub observations: ObservationService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: DynStore, config: AppConfig) -> Self {
        Self {
            observations: ObservationService::new(store, config.validation_options()),
            config: Arc::new(config),
        }
    }
}

pub struct ClinobsServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route(
            handlers::OBSERVATION_PATH,
            get(handlers::search_observations).post(handlers::create_observation),
        )
        .route("/fhir/Observation/{id}", get(handlers::read_observation))
        .fallback(handlers::fallback)
        .with_state(state)
        // Outermost first: request id -> trace -> panic boundary -> cors -> compression
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(app_middleware::request_id))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &axum::http::Request<_>| {
                            use tracing::field::Empty;
                            let req_id = req
                                .extensions()
                                .get::<axum::http::HeaderValue>()
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or("")
                                .to_string();
                            tracing::info_span!(
                                "http.request",
                                http.method = %req.method(),
                                http.target = %req.uri(),
                                http.status_code = Empty,
                                request_id = %req_id
                            )
                        })
                        .on_response(
                            |res: &axum::http::Response<_>,
                             latency: std::time::Duration,
                             span: &tracing::Span| {
                                span.record(
                                    "http.status_code",
                                    tracing::field::display(res.status().as_u16()),
                                );
                                tracing::info!(
                                    http.status = %res.status().as_u16(),
                                    elapsed_ms = %latency.as_millis(),
                                    "request handled"
                                );
                            },
                        ),
                )
                .layer(CatchPanicLayer::custom(panic_response))
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new()),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    ApiError::internal(format!("handler panicked: {detail}")).into_response()
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    store: Option<DynStore>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            store: None,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Use an existing store instead of a fresh in-memory one.
    pub fn with_store(mut self, store: DynStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Create the store, seed it and assemble the router.
    pub async fn build(self) -> anyhow::Result<ClinobsServer> {
        let store = self.store.unwrap_or_else(create_memory_store);
        let seed_count = self.config.storage.seed_observations;
        tracing::info!(
            backend = store.backend_name(),
            variant = %self.config.validation.variant,
            "initializing observation store"
        );

        let state = AppState::new(store, self.config);
        fixtures::seed(&state.observations, seed_count)
            .await
            .map_err(|e| anyhow::anyhow!("seeding failed: {e}"))?;

        Ok(ClinobsServer {
            addr: self.addr,
            app: build_app(state),
        })
    }
}

impl ClinobsServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn into_router(self) -> Router {
        self.app
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
