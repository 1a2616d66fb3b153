use crate::{model_service::ModelService, pipeline::Classifier, state::State};
use leaf_proto::{
    leaf_service_server::LeafService, ClassLabels, Empty, ImageFrame, ModelInfo, Prediction,
};
use std::sync::Arc;
use tonic::{async_trait, Request, Response, Status};

pub struct InferenceService<M: ModelService, S: State> {
    classifier: Arc<Classifier<M>>,
    service_state: Arc<S>,
}

impl<M: ModelService, S: State> Clone for InferenceService<M, S> {
    fn clone(&self) -> Self {
        Self {
            classifier: self.classifier.clone(),
            service_state: self.service_state.clone(),
        }
    }
}

impl<M: ModelService, S: State> InferenceService<M, S> {
    pub fn new(classifier: Classifier<M>, state: S) -> Self {
        Self {
            classifier: Arc::new(classifier),
            service_state: Arc::new(state),
        }
    }
}

#[async_trait]
impl<M: ModelService, S: State> LeafService for InferenceService<M, S> {
    async fn classify(&self, request: Request<ImageFrame>) -> Result<Response<Prediction>, Status> {
        let image_frame = request.into_inner();
        let prediction = self.classifier.predict(&image_frame.image_data)?;

        tracing::debug!(
            confidence = prediction.confidence.value(),
            health = ?prediction.health,
            "Classified image of {} bytes",
            image_frame.image_data.len()
        );

        Ok(Response::new(Prediction {
            confidence: prediction.confidence.value(),
            class_id: prediction.health.class_id(),
            timestamp: image_frame.timestamp,
        }))
    }

    async fn get_class_labels(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<ClassLabels>, Status> {
        let labels = self.service_state.get_labels().clone();
        let response = ClassLabels {
            class_labels: labels,
        };

        Ok(Response::new(response))
    }

    async fn get_model_info(&self, _request: Request<Empty>) -> Result<Response<ModelInfo>, Status> {
        let input_config = self.classifier.input_config();
        Ok(Response::new(ModelInfo {
            model_name: self.classifier.model_name().to_string(),
            input_width: input_config.width,
            input_height: input_config.height,
            threshold: self.classifier.threshold(),
        }))
    }
}
