use crate::{
    config::InputConfig,
    error::ClassifierError,
    model_service::ModelService,
    prediction::{ClassPrediction, Confidence, LeafHealth},
    preprocess::transform_image,
};
use std::{path::Path, sync::Arc};

/// Image in, confidence out. Holds the loaded model for the process lifetime.
pub struct Classifier<M: ModelService> {
    model_service: Arc<M>,
    input_config: InputConfig,
    threshold: f32,
}

impl<M: ModelService> Classifier<M> {
    pub fn new(model_service: M, input_config: InputConfig, threshold: f32) -> Self {
        Self {
            model_service: Arc::new(model_service),
            input_config,
            threshold,
        }
    }

    pub fn classify(&self, image_path: impl AsRef<Path>) -> Result<Confidence, ClassifierError> {
        let image_path = image_path.as_ref();
        let image_data = std::fs::read(image_path).map_err(|source| ClassifierError::ImageRead {
            path: image_path.to_path_buf(),
            source,
        })?;
        self.classify_bytes(&image_data)
    }

    pub fn classify_bytes(&self, image_data: &[u8]) -> Result<Confidence, ClassifierError> {
        let input = transform_image(image_data, &self.input_config)?;
        let raw = self.model_service.forward(&input)?;
        Confidence::new(raw)
    }

    pub fn predict(&self, image_data: &[u8]) -> Result<ClassPrediction, ClassifierError> {
        let confidence = self.classify_bytes(image_data)?;
        Ok(ClassPrediction {
            confidence,
            health: LeafHealth::from_confidence(confidence, self.threshold),
        })
    }

    pub fn input_config(&self) -> &InputConfig {
        &self.input_config
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn model_name(&self) -> &str {
        self.model_service.name()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{config::TensorLayout, prediction::DEFAULT_THRESHOLD};
    use image::{ImageBuffer, ImageFormat, Rgb};
    use ndarray::{Array, Ix4};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct FixedModelService {
        pub output: f32,
        pub calls: AtomicUsize,
    }

    impl FixedModelService {
        pub fn new(output: f32) -> Self {
            Self {
                output,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ModelService for FixedModelService {
        fn forward(&self, input: &Array<f32, Ix4>) -> Result<f32, ClassifierError> {
            assert_eq!(input.shape(), &[1, 128, 128, 3]);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output)
        }

        fn name(&self) -> &str {
            "fixed.onnx"
        }
    }

    pub fn leaf_png() -> Vec<u8> {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(240, 180, Rgb([56, 142, 60]));
        let mut cursor = std::io::Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    fn classifier(output: f32) -> Classifier<FixedModelService> {
        Classifier::new(
            FixedModelService::new(output),
            InputConfig::default(),
            DEFAULT_THRESHOLD,
        )
    }

    #[test]
    fn test_classify_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("leaf_sample.png");
        std::fs::write(&image_path, leaf_png()).unwrap();

        let confidence = classifier(0.83).classify(&image_path).unwrap();
        assert_eq!(confidence.value(), 0.83);
        assert_eq!(confidence.percent(), 83);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let classifier = classifier(0.27);
        let image_data = leaf_png();

        let first = classifier.predict(&image_data).unwrap();
        let second = classifier.predict(&image_data).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.health, LeafHealth::Unhealthy);
        assert_eq!(classifier.model_service.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_boundary_is_healthy() {
        let prediction = classifier(0.5).predict(&leaf_png()).unwrap();
        assert_eq!(prediction.health, LeafHealth::Healthy);
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let result = classifier(0.9).classify("/nonexistent/leaf.jpg");
        assert!(matches!(result, Err(ClassifierError::ImageRead { .. })));
    }

    #[test]
    fn test_bad_image_never_reaches_the_model() {
        let classifier = classifier(0.9);
        let result = classifier.classify_bytes(b"not an image");

        assert!(matches!(result, Err(ClassifierError::ImageDecode(_))));
        assert_eq!(classifier.model_service.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_out_of_range_output_is_rejected() {
        let result = classifier(3.2).classify_bytes(&leaf_png());
        assert!(matches!(
            result,
            Err(ClassifierError::ConfidenceOutOfRange(_))
        ));
    }

    #[test]
    fn test_exposes_model_metadata() {
        let classifier = Classifier::new(
            FixedModelService::new(0.1),
            InputConfig {
                width: 128,
                height: 128,
                layout: TensorLayout::Nhwc,
            },
            0.6,
        );
        assert_eq!(classifier.model_name(), "fixed.onnx");
        assert_eq!(classifier.threshold(), 0.6);
        assert_eq!(classifier.input_config().width, 128);
    }
}
