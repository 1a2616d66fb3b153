use crate::error::ClassifierError;

pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Raw model output, guaranteed to lie in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Confidence(f32);

impl Confidence {
    pub fn new(value: f32) -> Result<Self, ClassifierError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ClassifierError::ConfidenceOutOfRange(value))
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Whole percent, rounded down.
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).floor().clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafHealth {
    Unhealthy,
    Healthy,
}

impl LeafHealth {
    pub fn from_confidence(confidence: Confidence, threshold: f32) -> Self {
        if confidence.value() >= threshold {
            LeafHealth::Healthy
        } else {
            LeafHealth::Unhealthy
        }
    }

    /// Index into the class labels list.
    pub fn class_id(self) -> u32 {
        match self {
            LeafHealth::Unhealthy => 0,
            LeafHealth::Healthy => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassPrediction {
    pub confidence: Confidence,
    pub health: LeafHealth,
}
