use crate::{
    prediction::PredictionServiceError, server::SharedState, session::SessionView,
    verdict::Verdict,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Prediction service failed: {0}")]
    PredictionService(#[from] PredictionServiceError),
}

impl IntoResponse for ClassifyError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_GATEWAY,
            format!("Something went wrong: {}", self),
        )
            .into_response()
    }
}

/// Classifies the selected image. Without a selection nothing happens.
#[instrument(skip(state))]
pub async fn classify(State(state): State<SharedState>) -> Result<Json<SessionView>, ClassifyError> {
    state.metrics.record_request("/classify");

    let mut session = state.session.lock().await;
    let Some(image_data) = session.selected().map(|selected| selected.data.clone()) else {
        tracing::debug!("Classify requested without a selected image");
        return Ok(Json(session.view()));
    };

    session.start_classification();
    let started = Instant::now();
    let result = state.predictor.predict(image_data).await;
    state
        .metrics
        .record_prediction_duration(started.elapsed().as_millis() as u64, "/classify");

    match result {
        Ok(prediction) => {
            let verdict = Verdict::from(&prediction);
            tracing::info!(
                label = %verdict.label,
                confidence = verdict.confidence,
                "{}",
                verdict.text
            );
            state.metrics.record_verdict(&verdict.label);
            session.record_verdict(verdict);
            Ok(Json(session.view()))
        }
        Err(e) => {
            tracing::error!("Classification failed: {:?}", e);
            session.record_failure();
            Err(e.into())
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        config::DisplayConfig,
        prediction::{LabeledPrediction, LeafPredictor},
        session::{tests::leaf_jpg, SelectedImage, STATUS_COMPLETE, STATUS_FAILED},
        telemetry::Metrics,
    };
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use tonic::{async_trait, Status};

    pub struct MockPredictor {
        confidence: Option<f32>,
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl LeafPredictor for MockPredictor {
        async fn predict(
            &self,
            _image_data: Vec<u8>,
        ) -> Result<LabeledPrediction, PredictionServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let confidence = self
                .confidence
                .ok_or_else(|| Status::unavailable("prediction service is down"))?;
            let (class_label, red, green, blue) = if confidence >= 0.5 {
                ("Healthy", 56, 142, 60)
            } else {
                ("Unhealthy", 211, 47, 47)
            };
            Ok(LabeledPrediction {
                confidence,
                class_label: class_label.to_string(),
                red,
                green,
                blue,
            })
        }
    }

    fn state_with(confidence: Option<f32>) -> (SharedState, Arc<MockPredictor>) {
        let predictor = Arc::new(MockPredictor {
            confidence,
            calls: AtomicUsize::new(0),
        });
        let metrics = Arc::new(Metrics::new().unwrap());
        let state = SharedState::new(predictor.clone(), DisplayConfig::default(), metrics);
        (state, predictor)
    }

    pub fn shared_state(confidence: f32) -> (SharedState, Arc<MockPredictor>) {
        state_with(Some(confidence))
    }

    async fn select_sample(state: &SharedState) {
        let selected = SelectedImage::from_bytes("leaf_sample.jpg", leaf_jpg()).unwrap();
        state.session.lock().await.select(selected);
    }

    #[tokio::test]
    async fn test_end_to_end_healthy_leaf() {
        let (state, predictor) = shared_state(0.83);
        select_sample(&state).await;

        let Json(view) = classify(State(state)).await.unwrap();
        let verdict = view.verdict.unwrap();

        assert_eq!(verdict.text, "Prediction: Healthy (0.83)");
        assert_eq!(verdict.color, "#388e3c");
        assert_eq!(view.progress, 83);
        assert_eq!(view.status, STATUS_COMPLETE);
        assert_eq!(predictor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unhealthy_leaf() {
        let (state, _) = shared_state(0.31);
        select_sample(&state).await;

        let Json(view) = classify(State(state)).await.unwrap();
        assert_eq!(view.verdict.unwrap().text, "Prediction: Unhealthy (0.31)");
        assert_eq!(view.progress, 31);
    }

    #[tokio::test]
    async fn test_classify_without_selection_is_skipped() {
        let (state, predictor) = shared_state(0.83);
        let before = state.session.lock().await.view();

        let Json(view) = classify(State(state)).await.unwrap();

        assert_eq!(view, before);
        assert_eq!(view.progress, 0);
        assert!(view.verdict.is_none());
        assert_eq!(predictor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_classify_twice_is_idempotent() {
        let (state, _) = shared_state(0.83);
        select_sample(&state).await;

        let Json(first) = classify(State(state.clone())).await.unwrap();
        let Json(second) = classify(State(state)).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_clear_after_classify() {
        let (state, _) = shared_state(0.83);
        select_sample(&state).await;
        classify(State(state.clone())).await.unwrap();

        let Json(view) = crate::routes::clear(State(state.clone())).await;

        assert!(view.image.is_none());
        assert!(view.verdict.is_none());
        assert_eq!(view.progress, 0);
        assert!(crate::routes::image_preview(State(state)).await.is_err());
    }

    #[tokio::test]
    async fn test_service_failure_keeps_progress() {
        let (state, _) = state_with(None);
        select_sample(&state).await;

        let err = classify(State(state.clone())).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);

        let view = state.session.lock().await.view();
        assert_eq!(view.status, STATUS_FAILED);
        assert_eq!(view.progress, 0);
        assert!(view.image.is_some());
    }
}
