use crate::{
    config::Config,
    inference_service::InferenceService,
    model_service::ModelService,
    ort_service::OrtModelService,
    pipeline::Classifier,
    state::{ServiceState, State},
};
use leaf_proto::leaf_service_server::LeafServiceServer;
use std::{error::Error, net::SocketAddr};
use tokio::signal;
use tonic::transport::Server;

pub struct GrpcServer<M: ModelService, S: State> {
    inference_service: InferenceService<M, S>,
    addr: String,
    max_message_bytes: usize,
}

impl<M: ModelService, S: State> GrpcServer<M, S> {
    pub fn new(
        classifier: Classifier<M>,
        service_state: S,
        addr: &str,
        max_message_bytes: usize,
    ) -> Self {
        Self {
            inference_service: InferenceService::new(classifier, service_state),
            addr: addr.to_string(),
            max_message_bytes,
        }
    }

    pub async fn run(self) -> Result<(), Box<dyn Error>> {
        let addr: SocketAddr = self.addr.parse()?;

        let reflection_service = tonic_reflection::server::Builder::configure()
            .register_encoded_file_descriptor_set(leaf_proto::FILE_DESCRIPTOR_SET)
            .build_v1alpha()?;

        let (health_reporter, health_service) = tonic_health::server::health_reporter();
        health_reporter
            .set_serving::<LeafServiceServer<InferenceService<M, S>>>()
            .await;

        tracing::info!("Inference service listening on {}", self.addr);

        let shutdown = async {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown")
        };

        Server::builder()
            .add_service(health_service)
            .add_service(reflection_service)
            .add_service(leaf_service_server(
                self.inference_service,
                self.max_message_bytes,
            ))
            .serve_with_shutdown(addr, shutdown)
            .await?;
        Ok(())
    }
}

/// Message limits apply to both directions; tonic's default is 4 MiB.
fn leaf_service_server<M: ModelService, S: State>(
    inference_service: InferenceService<M, S>,
    max_message_bytes: usize,
) -> LeafServiceServer<InferenceService<M, S>> {
    LeafServiceServer::new(inference_service)
        .max_decoding_message_size(max_message_bytes)
        .max_encoding_message_size(max_message_bytes)
}

pub fn build_classifier(config: &Config) -> Result<Classifier<OrtModelService>, Box<dyn Error>> {
    let ort_model_service = OrtModelService::new(&config.model).inspect_err(|e| {
        tracing::error!("Failed to instantiate ort model service: {}", e);
    })?;

    Ok(Classifier::new(
        ort_model_service,
        config.model.input.clone(),
        config.model.threshold,
    ))
}

pub async fn start_server(config: Config) -> Result<(), Box<dyn Error>> {
    let classifier = build_classifier(&config)?;
    let service_state = ServiceState::new(&config.labels).inspect_err(|e| {
        tracing::error!("{}", e);
    })?;

    let addr = config.server.get_address();
    let grpc_server = GrpcServer::new(
        classifier,
        service_state,
        &addr,
        config.server.max_message_bytes,
    );

    grpc_server.run().await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
