#![allow(dead_code)]

use clinobs_db_memory::create_memory_store;
use clinobs_server::{AppConfig, ObservationService, ServerBuilder};
use clinobs_core::SchemaVariant;
use tokio::task::JoinHandle;

pub struct TestServer {
    pub base: String,
    /// Shares the server's store, for seeding without HTTP.
    pub service: ObservationService,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

pub async fn start_server() -> TestServer {
    start_server_with(AppConfig::default()).await
}

pub async fn start_extended_server() -> TestServer {
    let mut cfg = AppConfig::default();
    cfg.validation.variant = SchemaVariant::Extended;
    start_server_with(cfg).await
}

pub async fn start_server_with(cfg: AppConfig) -> TestServer {
    let store = create_memory_store();
    let service = ObservationService::new(store.clone(), cfg.validation_options());
    let app = ServerBuilder::new()
        .with_config(cfg)
        .with_store(store)
        .build()
        .await
        .expect("build server")
        .into_router();

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        base: format!("http://{addr}"),
        service,
        shutdown: Some(tx),
        handle: Some(handle),
    }
}
