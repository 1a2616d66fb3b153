use crate::error::ClassifierError;
use ndarray::{Array, Ix4};

/// One forward pass of a binary classifier producing a single scalar.
pub trait ModelService: Send + Sync + 'static {
    fn forward(&self, input: &Array<f32, Ix4>) -> Result<f32, ClassifierError>;

    fn name(&self) -> &str;
}
