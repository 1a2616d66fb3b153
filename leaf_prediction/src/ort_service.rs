use crate::{
    config::{ModelConfig, Validatable},
    error::ClassifierError,
    model_service::ModelService,
};
use ndarray::{Array, Ix4};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

#[derive(Clone)]
pub struct OrtModelService {
    sessions: Arc<Vec<Arc<Mutex<Session>>>>,
    counter: Arc<AtomicUsize>,
    model_name: String,
    input_name: String,
    output_name: String,
}

impl OrtModelService {
    pub fn new(model_config: &ModelConfig) -> Result<Self, ClassifierError> {
        let model_path = model_config.get_path();
        let load_error = |source: ort::Error| ClassifierError::ModelLoad {
            path: model_path.clone(),
            source,
        };

        ort::init().commit().map_err(load_error)?;

        let num_instances = model_config.num_instances.max(1);
        let sessions = (0..num_instances)
            .map(|_| {
                let session = Session::builder()?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .with_intra_threads(model_config.intra_threads)?
                    .commit_from_file(&model_path)?;
                Ok(session)
            })
            .collect::<Result<Vec<_>, ort::Error>>()
            .map_err(load_error)?;

        let first = &sessions[0];
        let input_name = first
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or(ClassifierError::ModelSignature("input"))?;
        let output_name = first
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or(ClassifierError::ModelSignature("output"))?;

        tracing::info!(
            model = %model_config.onnx_file,
            input = %input_name,
            output = %output_name,
            "Created {} ONNX sessions",
            num_instances
        );

        Ok(Self {
            sessions: Arc::new(
                sessions
                    .into_iter()
                    .map(|session| Arc::new(Mutex::new(session)))
                    .collect(),
            ),
            counter: Arc::new(AtomicUsize::new(0)),
            model_name: model_config.onnx_file.clone(),
            input_name,
            output_name,
        })
    }
}

impl ModelService for OrtModelService {
    fn forward(&self, input: &Array<f32, Ix4>) -> Result<f32, ClassifierError> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst) % self.sessions.len();
        let mut session = self.sessions[index]
            .lock()
            .map_err(|e| ClassifierError::Inference(format!("session mutex poisoned: {}", e)))?;

        tracing::debug!("Handling request with session {}", index);
        let owned_buffer;
        let input_view = if input.view().is_standard_layout() {
            input.view()
        } else {
            owned_buffer = input.as_standard_layout().into_owned();
            owned_buffer.view()
        };

        let tensor_ref = TensorRef::from_array_view(input_view)
            .map_err(|e| ClassifierError::Inference(format!("failed to build tensor: {}", e)))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor_ref])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let (shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("failed to extract tensor: {}", e)))?;

        match data {
            [value] => Ok(*value),
            _ => {
                let dims: &[i64] = shape;
                Err(ClassifierError::OutputShape(dims.to_vec()))
            }
        }
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputConfig;

    #[test]
    fn test_missing_model_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let model_config = ModelConfig {
            onnx_file: "missing.onnx".to_string(),
            model_dir: dir.path().to_path_buf(),
            num_instances: 2,
            intra_threads: 1,
            threshold: 0.5,
            input: InputConfig::default(),
        };

        let result = OrtModelService::new(&model_config);
        assert!(matches!(result, Err(ClassifierError::ModelLoad { .. })));
    }
}
