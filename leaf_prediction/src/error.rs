use std::path::PathBuf;
use thiserror::Error;
use tonic::Status;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Failed to load model from {path:?}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: ort::Error,
    },
    #[error("Model exposes no {0} tensor")]
    ModelSignature(&'static str),
    #[error("Failed to read image {path:?}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Error decoding image: {0}")]
    ImageDecode(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Expected a single output value, got shape {0:?}")]
    OutputShape(Vec<i64>),
    #[error("Model output {0} is not a probability")]
    ConfidenceOutOfRange(f32),
}

impl From<ClassifierError> for Status {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::ImageDecode(_) | ClassifierError::ImageRead { .. } => {
                Status::invalid_argument(format!("Image transformation error: {}", err))
            }
            other => Status::internal(other.to_string()),
        }
    }
}
