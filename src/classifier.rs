// src/classifier.rs
//
// Pose classifier capabilities and the ONNX-backed implementation.
//
// Models are scikit-learn exports (skl2onnx with zipmap disabled):
//   output 0: predicted label (class index or class name)
//   output 1: per-class scores / probabilities, [1, n_classes]

use crate::features::FeatureVector;
use crate::inference::{InferenceEngine, OutputTensor};
use crate::types::{AnalysisMode, ClassifierConfig};
use anyhow::{anyhow, bail, Result};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

/// Label-only classifier, used for recorded videos
pub trait PoseClassifier: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<String>;
}

/// Classifier that also reports a class distribution, used for live frames
pub trait ProbabilisticClassifier: PoseClassifier {
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f32>>;

    /// Label and class distribution for the same feature vector
    fn predict_scored(&self, features: &FeatureVector) -> Result<(String, Vec<f32>)> {
        Ok((self.predict(features)?, self.predict_proba(features)?))
    }
}

/// Highest class probability as a percentage
pub fn confidence_from_probabilities(probabilities: &[f32]) -> Option<f64> {
    probabilities
        .iter()
        .copied()
        .fold(None, |best: Option<f32>, p| match best {
            Some(b) if b >= p => Some(b),
            _ => Some(p),
        })
        .map(|max| max as f64 * 100.0)
}

/// Index of the highest score, first one on ties
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if b >= v => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

pub struct OnnxPoseClassifier {
    engine: Mutex<InferenceEngine>,
    labels: Vec<String>,
    mode: AnalysisMode,
}

impl OnnxPoseClassifier {
    pub fn new(config: &ClassifierConfig, mode: AnalysisMode) -> Result<Self> {
        let engine = InferenceEngine::new(&config.path, config.num_threads)?;
        Ok(Self {
            engine: Mutex::new(engine),
            labels: config.labels.clone(),
            mode,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    fn run(&self, features: &FeatureVector) -> Result<Vec<OutputTensor>> {
        if !features.is_valid_for(self.mode) {
            bail!(
                "{} classifier expects {} features, got {}",
                self.mode,
                crate::features::expected_len(self.mode),
                features.len()
            );
        }

        let mut engine = self
            .engine
            .lock()
            .map_err(|_| anyhow!("{} classifier session poisoned", self.mode))?;
        engine.infer(&[1, features.len()], features.as_slice())
    }
}

impl PoseClassifier for OnnxPoseClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<String> {
        let outputs = self.run(features)?;
        resolve_label(&outputs, &self.labels)
    }
}

impl ProbabilisticClassifier for OnnxPoseClassifier {
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f32>> {
        let outputs = self.run(features)?;
        resolve_probabilities(&outputs, &self.labels)
    }

    fn predict_scored(&self, features: &FeatureVector) -> Result<(String, Vec<f32>)> {
        let outputs = self.run(features)?;
        let label = resolve_label(&outputs, &self.labels)?;
        let probabilities = resolve_probabilities(&outputs, &self.labels)?;
        Ok((label, probabilities))
    }
}

/// Class distribution from the second model output
pub fn resolve_probabilities(outputs: &[OutputTensor], labels: &[String]) -> Result<Vec<f32>> {
    let probabilities = outputs
        .get(1)
        .and_then(OutputTensor::as_f32)
        .ok_or_else(|| anyhow!("Model has no probability output"))?;

    if probabilities.len() != labels.len() {
        bail!(
            "Model reports {} classes but {} labels are configured",
            probabilities.len(),
            labels.len()
        );
    }
    Ok(probabilities.to_vec())
}

/// Map raw model outputs to a class name
pub fn resolve_label(outputs: &[OutputTensor], labels: &[String]) -> Result<String> {
    match outputs.first() {
        Some(OutputTensor::Strings(names)) => names
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("Empty label output")),
        Some(OutputTensor::I64(indices)) => {
            let idx = *indices.first().ok_or_else(|| anyhow!("Empty label output"))?;
            usize::try_from(idx)
                .ok()
                .and_then(|i| labels.get(i))
                .cloned()
                .ok_or_else(|| anyhow!("Class index {} outside {} labels", idx, labels.len()))
        }
        // Some exports only emit scores
        Some(OutputTensor::F32(_)) | None => {
            let scores = outputs
                .iter()
                .find_map(OutputTensor::as_f32)
                .ok_or_else(|| anyhow!("Model produced no label or score output"))?;
            argmax(scores)
                .and_then(|i| labels.get(i))
                .cloned()
                .ok_or_else(|| anyhow!("Score output does not match {} labels", labels.len()))
        }
    }
}

/// Load a classifier, logging instead of failing when the model is unusable
pub fn load_classifier(
    config: &ClassifierConfig,
    mode: AnalysisMode,
) -> Option<Arc<OnnxPoseClassifier>> {
    match OnnxPoseClassifier::new(config, mode) {
        Ok(classifier) => {
            info!(
                "✓ {} classifier loaded ({} classes)",
                mode,
                classifier.labels().len()
            );
            Some(Arc::new(classifier))
        }
        Err(e) => {
            error!("Failed to load {} classifier from {}: {:#}", mode, config.path, e);
            debug!("{} analysis will report ModelNotLoaded", mode);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["Tadasana".into(), "Vrikshasana".into(), "Shavasana".into()]
    }

    #[test]
    fn test_confidence_is_max_probability() {
        let conf = confidence_from_probabilities(&[0.7, 0.2, 0.1]).unwrap();
        assert!((conf - 70.0).abs() < 1e-4);
        assert!(confidence_from_probabilities(&[]).is_none());
    }

    #[test]
    fn test_argmax_prefers_first_on_tie() {
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), Some(0));
        assert_eq!(argmax(&[0.1, 0.3, 0.6]), Some(2));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_resolve_label_from_index() {
        let outputs = vec![OutputTensor::I64(vec![1]), OutputTensor::F32(vec![0.1, 0.8, 0.1])];
        assert_eq!(resolve_label(&outputs, &labels()).unwrap(), "Vrikshasana");
    }

    #[test]
    fn test_resolve_label_from_name() {
        let outputs = vec![OutputTensor::Strings(vec!["Padmasana".into()])];
        assert_eq!(resolve_label(&outputs, &labels()).unwrap(), "Padmasana");
    }

    #[test]
    fn test_resolve_label_from_scores_only() {
        let outputs = vec![OutputTensor::F32(vec![-0.3, 0.2, 1.4])];
        assert_eq!(resolve_label(&outputs, &labels()).unwrap(), "Shavasana");
    }

    #[test]
    fn test_resolve_label_index_out_of_range() {
        let outputs = vec![OutputTensor::I64(vec![7])];
        assert!(resolve_label(&outputs, &labels()).is_err());
        let outputs = vec![OutputTensor::I64(vec![-1])];
        assert!(resolve_label(&outputs, &labels()).is_err());
    }

    #[test]
    fn test_probabilities_come_from_one_output_set() {
        let outputs = vec![OutputTensor::I64(vec![2]), OutputTensor::F32(vec![0.1, 0.2, 0.7])];
        assert_eq!(resolve_label(&outputs, &labels()).unwrap(), "Shavasana");
        assert_eq!(
            resolve_probabilities(&outputs, &labels()).unwrap(),
            vec![0.1, 0.2, 0.7]
        );
    }

    #[test]
    fn test_probabilities_must_match_labels() {
        let outputs = vec![OutputTensor::I64(vec![0]), OutputTensor::F32(vec![0.5, 0.5])];
        assert!(resolve_probabilities(&outputs, &labels()).is_err());
        let outputs = vec![OutputTensor::I64(vec![0])];
        assert!(resolve_probabilities(&outputs, &labels()).is_err());
    }

    #[test]
    fn test_missing_model_degrades_to_none() {
        let config = ClassifierConfig {
            path: "does/not/exist.onnx".into(),
            labels: labels(),
            num_threads: 1,
        };
        assert!(load_classifier(&config, AnalysisMode::Live).is_none());
    }
}
