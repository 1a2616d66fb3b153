use crate::config::PredictionServiceConfig;
use leaf_proto::{leaf_service_client::LeafServiceClient, ColorLabel, Empty, ImageFrame};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::{
    sync::Mutex,
    time::{sleep, timeout, Duration},
};
use tonic::{
    async_trait,
    transport::{Channel, Error},
    Request, Status,
};
use tracing::instrument;

#[derive(Error, Debug)]
pub enum PredictionServiceError {
    #[error("Failed to connect to gRPC server: {0}")]
    ConnectionFailed(#[from] Error),
    #[error("Maximum connection retries exceeded.")]
    MaxRetriesExceeded,
    #[error("gRPC request failed: {0}")]
    GrpcRequestFailed(#[from] Status),
}

/// A prediction joined with the label and color of its class.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledPrediction {
    pub confidence: f32,
    pub class_label: String,
    pub red: u32,
    pub green: u32,
    pub blue: u32,
}

impl LabeledPrediction {
    fn from_class(confidence: f32, class_id: u32, class_labels: &[ColorLabel]) -> Self {
        match class_labels.get(class_id as usize) {
            Some(color_label) => LabeledPrediction {
                confidence,
                class_label: color_label.label.clone(),
                red: color_label.red,
                green: color_label.green,
                blue: color_label.blue,
            },
            None => LabeledPrediction {
                confidence,
                class_label: format!("Unknown class {}", class_id),
                red: 0x33,
                green: 0x33,
                blue: 0x33,
            },
        }
    }
}

#[async_trait]
pub trait LeafPredictor: Send + Sync + 'static {
    async fn predict(&self, image_data: Vec<u8>)
        -> Result<LabeledPrediction, PredictionServiceError>;
}

pub struct PredictionService {
    client: Mutex<LeafServiceClient<Channel>>,
    class_labels: Vec<ColorLabel>,
}

impl PredictionService {
    pub async fn new(
        prediction_config: &PredictionServiceConfig,
    ) -> Result<Self, PredictionServiceError> {
        let mut client =
            Self::get_client(prediction_config.get_address(), prediction_config.max_retries)
                .await?
                .max_encoding_message_size(prediction_config.max_message_bytes)
                .max_decoding_message_size(prediction_config.max_message_bytes);

        let response = client.get_class_labels(Request::new(Empty {})).await?;
        let class_labels = response.into_inner().class_labels;
        tracing::info!(
            "Fetched class labels: {:?}",
            class_labels.iter().map(|l| &l.label).collect::<Vec<_>>()
        );

        Ok(Self {
            client: Mutex::new(client),
            class_labels,
        })
    }

    async fn get_client(
        address: String,
        max_retries: u32,
    ) -> Result<LeafServiceClient<Channel>, PredictionServiceError> {
        let mut retry_delay = Duration::from_millis(50);
        let max_retry_delay = Duration::from_secs(1);
        let mut retry_count = 0;

        while retry_count < max_retries {
            match timeout(
                Duration::from_secs(1),
                LeafServiceClient::connect(address.clone()),
            )
            .await
            {
                Ok(Ok(client)) => return Ok(client),
                Ok(Err(e)) => {
                    tracing::error!("Failed to connect to gRPC server: {:?}", e);
                }
                Err(_) => {
                    tracing::error!("Connection timeout");
                }
            }

            retry_count += 1;
            let jitter = rand::random::<f32>() * 0.2 + 0.9;
            sleep(retry_delay.mul_f32(jitter)).await;
            retry_delay = (retry_delay * 2).min(max_retry_delay);
        }

        Err(PredictionServiceError::MaxRetriesExceeded)
    }
}

#[async_trait]
impl LeafPredictor for PredictionService {
    #[instrument(skip(self, image_data))]
    async fn predict(
        &self,
        image_data: Vec<u8>,
    ) -> Result<LabeledPrediction, PredictionServiceError> {
        let mut client = self.client.lock().await;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;

        let request = Request::new(ImageFrame {
            image_data,
            timestamp,
        });

        let prediction = client.classify(request).await?.into_inner();
        tracing::debug!(
            confidence = prediction.confidence,
            class_id = prediction.class_id,
            "Received prediction"
        );

        Ok(LabeledPrediction::from_class(
            prediction.confidence,
            prediction.class_id,
            &self.class_labels,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_MESSAGE_BYTES;
    use leaf_proto::{
        leaf_service_server::{LeafService, LeafServiceServer},
        ClassLabels, ModelInfo, Prediction,
    };
    use tokio::net::TcpListener;
    use tokio_stream::wrappers::TcpListenerStream;
    use tonic::{transport::Server, Response};

    struct HealthyLeafService;

    #[async_trait]
    impl LeafService for HealthyLeafService {
        async fn classify(
            &self,
            request: Request<ImageFrame>,
        ) -> Result<Response<Prediction>, Status> {
            let frame = request.into_inner();
            Ok(Response::new(Prediction {
                confidence: 0.83,
                class_id: 1,
                timestamp: frame.timestamp,
            }))
        }

        async fn get_class_labels(
            &self,
            _request: Request<Empty>,
        ) -> Result<Response<ClassLabels>, Status> {
            Ok(Response::new(ClassLabels {
                class_labels: labels(),
            }))
        }

        async fn get_model_info(
            &self,
            _request: Request<Empty>,
        ) -> Result<Response<ModelInfo>, Status> {
            Err(Status::unimplemented("not needed"))
        }
    }

    fn labels() -> Vec<ColorLabel> {
        vec![
            ColorLabel {
                label: "Unhealthy".to_string(),
                red: 211,
                green: 47,
                blue: 47,
            },
            ColorLabel {
                label: "Healthy".to_string(),
                red: 56,
                green: 142,
                blue: 60,
            },
        ]
    }

    #[test]
    fn test_labels_by_class_id() {
        let prediction = LabeledPrediction::from_class(0.83, 1, &labels());
        assert_eq!(prediction.class_label, "Healthy");
        assert_eq!((prediction.red, prediction.green, prediction.blue), (56, 142, 60));

        let prediction = LabeledPrediction::from_class(0.2, 0, &labels());
        assert_eq!(prediction.class_label, "Unhealthy");
    }

    #[test]
    fn test_unknown_class_id() {
        let prediction = LabeledPrediction::from_class(0.9, 7, &labels());
        assert_eq!(prediction.class_label, "Unknown class 7");
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let result = PredictionService::get_client("http://127.0.0.1:1".to_string(), 2).await;
        assert!(matches!(
            result,
            Err(PredictionServiceError::MaxRetriesExceeded)
        ));
    }

    #[tokio::test]
    async fn test_predict_sends_images_larger_than_4_mib() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(
            Server::builder()
                .add_service(
                    LeafServiceServer::new(HealthyLeafService)
                        .max_decoding_message_size(DEFAULT_MAX_MESSAGE_BYTES),
                )
                .serve_with_incoming(TcpListenerStream::new(listener)),
        );

        let service = PredictionService::new(&PredictionServiceConfig {
            host: "127.0.0.1".to_string(),
            port,
            max_retries: 3,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        })
        .await
        .unwrap();

        let prediction = service.predict(vec![0u8; 5 * 1024 * 1024]).await.unwrap();
        assert_eq!(prediction.class_label, "Healthy");
        assert!((prediction.confidence - 0.83).abs() < f32::EPSILON);

        server.abort();
    }
}
