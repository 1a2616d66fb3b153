use crate::prediction::LabeledPrediction;
use serde::Serialize;

/// What the result area shows after a classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub label: String,
    pub confidence: f32,
    pub progress: u8,
    pub color: String,
    pub text: String,
}

impl From<&LabeledPrediction> for Verdict {
    fn from(prediction: &LabeledPrediction) -> Self {
        Verdict {
            label: prediction.class_label.clone(),
            confidence: prediction.confidence,
            progress: progress_value(prediction.confidence),
            color: format!(
                "#{:02x}{:02x}{:02x}",
                prediction.red.min(255),
                prediction.green.min(255),
                prediction.blue.min(255)
            ),
            text: format!(
                "Prediction: {} ({:.2})",
                prediction.class_label, prediction.confidence
            ),
        }
    }
}

/// Value for a 0..=100 progress bar, rounded down.
pub fn progress_value(confidence: f32) -> u8 {
    if confidence.is_nan() {
        return 0;
    }
    (confidence * 100.0).floor().clamp(0.0, 100.0) as u8
}
