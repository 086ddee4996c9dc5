// src/features.rs
//
// Landmark flattening for the pose classifiers.
//
// Batch models were trained on 2D coordinates only, live models also see
// the per-landmark visibility score:
//   batch: [x0, y0, x1, y1, ...]          33 × 2 = 66
//   live:  [x0, y0, v0, x1, y1, v1, ...]  33 × 3 = 99

use crate::types::{AnalysisMode, PoseLandmarks, NUM_LANDMARKS};

/// Flattened landmark values fed to a classifier
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    pub fn from_values(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True only when the length matches the mode exactly
    pub fn is_valid_for(&self, mode: AnalysisMode) -> bool {
        self.values.len() == expected_len(mode)
    }
}

/// Result of running the extractor on one detection
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Features(FeatureVector),
    NoLandmarks,
}

pub fn values_per_landmark(mode: AnalysisMode) -> usize {
    match mode {
        AnalysisMode::Batch => 2,
        AnalysisMode::Live => 3,
    }
}

pub fn expected_len(mode: AnalysisMode) -> usize {
    NUM_LANDMARKS * values_per_landmark(mode)
}

/// Flatten a detection into a feature vector.
///
/// Length is not checked here; a detector that returned a partial body
/// yields a short vector which the frame processor rejects.
pub fn extract_features(detection: Option<&PoseLandmarks>, mode: AnalysisMode) -> Extraction {
    let pose = match detection {
        Some(pose) if !pose.is_empty() => pose,
        _ => return Extraction::NoLandmarks,
    };

    let mut values = Vec::with_capacity(pose.len() * values_per_landmark(mode));
    for lm in &pose.landmarks {
        values.push(lm.x);
        values.push(lm.y);
        if mode == AnalysisMode::Live {
            values.push(lm.visibility);
        }
    }

    Extraction::Features(FeatureVector::from_values(values))
}
