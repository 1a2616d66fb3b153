use crate::{
    config::{Config, DisplayConfig},
    prediction::LeafPredictor,
    routes::api_routes,
    session::Session,
    telemetry::Metrics,
};
use axum::Router;
use axum_otel_metrics::HttpMetricsLayerBuilder;
use std::sync::Arc;
use tokio::{
    net::TcpListener,
    sync::{broadcast::Receiver, Mutex},
    task::JoinHandle,
};

/// Handed to every route; the session is the only mutable piece.
#[derive(Clone)]
pub struct SharedState {
    pub session: Arc<Mutex<Session>>,
    pub predictor: Arc<dyn LeafPredictor>,
    pub display: DisplayConfig,
    pub metrics: Arc<Metrics>,
}

impl SharedState {
    pub fn new(
        predictor: Arc<dyn LeafPredictor>,
        display: DisplayConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::new())),
            predictor,
            display,
            metrics,
        }
    }
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new(predictor: Arc<dyn LeafPredictor>, config: &Config) -> anyhow::Result<Self> {
        let addr = config.server.get_address();

        let metrics = Arc::new(Metrics::new()?);
        metrics.install_global();
        let metrics_layer = HttpMetricsLayerBuilder::new().build();

        let app_state = SharedState::new(predictor, config.display.clone(), metrics);

        let router = Router::new()
            .merge(api_routes(config.server.max_upload_bytes))
            .with_state(app_state)
            .layer(metrics_layer);

        let listener = TcpListener::bind(addr).await?;

        Ok(Self { router, listener })
    }

    pub async fn run(
        self,
        shutdown_rx: Receiver<()>,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
        tracing::info!("Starting app on {}", self.listener.local_addr()?);

        let listener = self.listener;
        let router = self.router;
        let server_handle = tokio::spawn({
            let mut shutdown_rx = shutdown_rx;
            async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        shutdown_rx.recv().await.ok();
                    })
                    .await?;
                Ok(())
            }
        });

        Ok(server_handle)
    }
}
