mod inference_service;
mod ort_service;
mod server;
mod state;

pub mod config;
pub mod error;
pub mod model_service;
pub mod pipeline;
pub mod prediction;
pub mod preprocess;

pub use error::ClassifierError;
pub use ort_service::OrtModelService;
pub use pipeline::Classifier;
pub use server::{build_classifier, start_server};
pub use state::{load_color_labels, ServiceState, State};
