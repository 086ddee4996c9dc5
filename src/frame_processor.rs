// src/frame_processor.rs
//
// Per-frame chain: detect → extract → length gate → classify.

use crate::classifier::{confidence_from_probabilities, PoseClassifier, ProbabilisticClassifier};
use crate::features::{expected_len, extract_features, Extraction};
use crate::landmark_detection::LandmarkDetector;
use crate::result::{round_score, AnalysisFailure};
use crate::types::{AnalysisMode, Frame};
use anyhow::{anyhow, Result};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Batch classification
    Label(String),
    /// Live classification with the class probability as a percentage
    Scored { label: String, confidence: f64 },
    NoLandmarks,
    /// Feature vector had the wrong length for the mode
    InvalidFeatures { len: usize },
}

impl FrameOutcome {
    pub fn is_classified(&self) -> bool {
        matches!(self, FrameOutcome::Label(_) | FrameOutcome::Scored { .. })
    }
}

/// One video frame. Err means a detector or classifier runtime error;
/// the caller decides whether that skips the frame.
pub fn process_batch_frame(
    detector: &mut dyn LandmarkDetector,
    classifier: &dyn PoseClassifier,
    frame: &Frame,
) -> Result<FrameOutcome> {
    let detection = detector.detect(frame)?;
    let extraction = extract_features(detection.as_ref(), AnalysisMode::Batch);
    classify_batch(classifier, extraction)
}

/// Length gate plus label prediction for an already extracted frame
pub fn classify_batch(
    classifier: &dyn PoseClassifier,
    extraction: Extraction,
) -> Result<FrameOutcome> {
    let features = match extraction {
        Extraction::Features(features) => features,
        Extraction::NoLandmarks => return Ok(FrameOutcome::NoLandmarks),
    };

    if !features.is_valid_for(AnalysisMode::Batch) {
        debug!(
            "Rejecting feature vector of length {} (expected {})",
            features.len(),
            expected_len(AnalysisMode::Batch)
        );
        return Ok(FrameOutcome::InvalidFeatures {
            len: features.len(),
        });
    }

    let label = classifier.predict(&features)?;
    Ok(FrameOutcome::Label(label))
}

/// The single live frame. Anything short of a classified pose ends the call.
pub fn process_live_frame(
    detector: &mut dyn LandmarkDetector,
    classifier: &dyn ProbabilisticClassifier,
    frame: &Frame,
) -> Result<FrameOutcome, AnalysisFailure> {
    let detection = detector
        .detect(frame)
        .map_err(|e| AnalysisFailure::Inference(format!("{:#}", e)))?;
    let extraction = extract_features(detection.as_ref(), AnalysisMode::Live);

    match classify_live(classifier, extraction) {
        Ok(outcome @ FrameOutcome::Scored { .. }) => Ok(outcome),
        Ok(other) => {
            debug!("Live frame unusable: {:?}", other);
            Err(AnalysisFailure::NoPoseDetected)
        }
        Err(e) => Err(AnalysisFailure::Inference(format!("{:#}", e))),
    }
}

pub fn classify_live(
    classifier: &dyn ProbabilisticClassifier,
    extraction: Extraction,
) -> Result<FrameOutcome> {
    let features = match extraction {
        Extraction::Features(features) => features,
        Extraction::NoLandmarks => return Ok(FrameOutcome::NoLandmarks),
    };

    debug!("Live landmark vector length: {}", features.len());
    if !features.is_valid_for(AnalysisMode::Live) {
        return Ok(FrameOutcome::InvalidFeatures {
            len: features.len(),
        });
    }

    let (label, probabilities) = classifier.predict_scored(&features)?;
    let confidence = confidence_from_probabilities(&probabilities)
        .ok_or_else(|| anyhow!("Classifier returned an empty distribution"))?;

    Ok(FrameOutcome::Scored {
        label,
        confidence: round_score(confidence),
    })
}

#[cfg(test)]
pub(crate) mod testing {
    //! Spy collaborators shared by the pipeline tests

    use super::*;
    use crate::features::FeatureVector;
    use crate::types::{Landmark, PoseLandmarks, NUM_LANDMARKS};
    use anyhow::bail;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub fn frame(timestamp_ms: f64) -> Frame {
        Frame {
            data: vec![0; 4 * 4 * 3],
            width: 4,
            height: 4,
            timestamp_ms,
        }
    }

    pub fn body(count: usize) -> PoseLandmarks {
        PoseLandmarks::new(vec![
            Landmark {
                x: 0.5,
                y: 0.5,
                visibility: 0.9,
            };
            count
        ])
    }

    /// Replays scripted detections in order, counting calls
    pub struct ScriptedDetector {
        script: VecDeque<Result<Option<PoseLandmarks>>>,
        pub calls: usize,
        pub resets: usize,
    }

    impl ScriptedDetector {
        pub fn new(script: Vec<Option<PoseLandmarks>>) -> Self {
            Self {
                script: script.into_iter().map(Ok).collect(),
                calls: 0,
                resets: 0,
            }
        }

        pub fn always_body(frames: usize) -> Self {
            Self::new((0..frames).map(|_| Some(body(NUM_LANDMARKS))).collect())
        }

        pub fn failing() -> Self {
            Self {
                script: VecDeque::from(vec![Err(anyhow!("camera glitch"))]),
                calls: 0,
                resets: 0,
            }
        }
    }

    impl LandmarkDetector for ScriptedDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Option<PoseLandmarks>> {
            self.calls += 1;
            self.script.pop_front().unwrap_or(Ok(None))
        }

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    /// Returns scripted labels in order and a fixed distribution
    pub struct SpyClassifier {
        labels: Mutex<VecDeque<String>>,
        probabilities: Vec<f32>,
        pub predict_calls: AtomicUsize,
        pub proba_calls: AtomicUsize,
    }

    impl SpyClassifier {
        pub fn with_labels(labels: &[&str]) -> Self {
            Self {
                labels: Mutex::new(labels.iter().map(|l| l.to_string()).collect()),
                probabilities: vec![1.0],
                predict_calls: AtomicUsize::new(0),
                proba_calls: AtomicUsize::new(0),
            }
        }

        pub fn live(label: &str, probabilities: Vec<f32>) -> Self {
            Self {
                probabilities,
                ..Self::with_labels(&[label])
            }
        }

        pub fn predictions(&self) -> usize {
            self.predict_calls.load(Ordering::SeqCst)
        }
    }

    impl PoseClassifier for SpyClassifier {
        fn predict(&self, _features: &FeatureVector) -> Result<String> {
            self.predict_calls.fetch_add(1, Ordering::SeqCst);
            let mut labels = self.labels.lock().unwrap();
            match labels.len() {
                0 => bail!("no scripted label left"),
                // the last label repeats
                1 => Ok(labels[0].clone()),
                _ => Ok(labels.pop_front().unwrap()),
            }
        }
    }

    impl ProbabilisticClassifier for SpyClassifier {
        fn predict_proba(&self, _features: &FeatureVector) -> Result<Vec<f32>> {
            self.proba_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.probabilities.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::features::FeatureVector;
    use crate::types::NUM_LANDMARKS;

    #[test]
    fn test_batch_frame_classified() {
        let mut detector = ScriptedDetector::always_body(1);
        let classifier = SpyClassifier::with_labels(&["Tadasana"]);
        let outcome = process_batch_frame(&mut detector, &classifier, &frame(0.0)).unwrap();
        assert_eq!(outcome, FrameOutcome::Label("Tadasana".into()));
        assert_eq!(detector.calls, 1);
    }

    #[test]
    fn test_batch_length_gate() {
        let classifier = SpyClassifier::with_labels(&["Tadasana"]);

        for len in [65, 67] {
            let extraction = Extraction::Features(FeatureVector::from_values(vec![0.1; len]));
            assert_eq!(
                classify_batch(&classifier, extraction).unwrap(),
                FrameOutcome::InvalidFeatures { len }
            );
        }
        assert_eq!(classifier.predictions(), 0);

        let extraction = Extraction::Features(FeatureVector::from_values(vec![0.1; 66]));
        assert!(classify_batch(&classifier, extraction).unwrap().is_classified());
        assert_eq!(classifier.predictions(), 1);
    }

    #[test]
    fn test_batch_no_body() {
        let mut detector = ScriptedDetector::new(vec![None]);
        let classifier = SpyClassifier::with_labels(&["Tadasana"]);
        let outcome = process_batch_frame(&mut detector, &classifier, &frame(0.0)).unwrap();
        assert_eq!(outcome, FrameOutcome::NoLandmarks);
        assert_eq!(classifier.predictions(), 0);
    }

    #[test]
    fn test_live_confidence_from_probability() {
        let mut detector = ScriptedDetector::always_body(1);
        let classifier = SpyClassifier::live("Vrikshasana", vec![0.7, 0.2, 0.1]);
        let outcome = process_live_frame(&mut detector, &classifier, &frame(0.0)).unwrap();
        assert_eq!(
            outcome,
            FrameOutcome::Scored {
                label: "Vrikshasana".into(),
                confidence: 70.0
            }
        );
    }

    #[test]
    fn test_live_partial_body_is_no_pose() {
        let mut detector = ScriptedDetector::new(vec![Some(body(NUM_LANDMARKS - 2))]);
        let classifier = SpyClassifier::live("Vrikshasana", vec![0.9, 0.1]);
        assert_eq!(
            process_live_frame(&mut detector, &classifier, &frame(0.0)),
            Err(AnalysisFailure::NoPoseDetected)
        );
        assert_eq!(classifier.predictions(), 0);
    }

    #[test]
    fn test_live_detector_error_is_inference_failure() {
        let mut detector = ScriptedDetector::failing();
        let classifier = SpyClassifier::live("Vrikshasana", vec![0.9, 0.1]);
        assert!(matches!(
            process_live_frame(&mut detector, &classifier, &frame(0.0)),
            Err(AnalysisFailure::Inference(_))
        ));
    }

    /// Only answers through the combined call
    struct SingleRunClassifier;

    impl PoseClassifier for SingleRunClassifier {
        fn predict(&self, _features: &FeatureVector) -> Result<String> {
            anyhow::bail!("label requested separately")
        }
    }

    impl ProbabilisticClassifier for SingleRunClassifier {
        fn predict_proba(&self, _features: &FeatureVector) -> Result<Vec<f32>> {
            anyhow::bail!("distribution requested separately")
        }

        fn predict_scored(&self, _features: &FeatureVector) -> Result<(String, Vec<f32>)> {
            Ok(("Trikonasana".into(), vec![0.25, 0.75]))
        }
    }

    #[test]
    fn test_live_uses_one_combined_prediction() {
        let extraction = Extraction::Features(FeatureVector::from_values(vec![0.1; 99]));
        assert_eq!(
            classify_live(&SingleRunClassifier, extraction).unwrap(),
            FrameOutcome::Scored {
                label: "Trikonasana".into(),
                confidence: 75.0
            }
        );
    }

    #[test]
    fn test_live_empty_distribution_is_error() {
        let classifier = SpyClassifier::live("Vrikshasana", vec![]);
        let extraction = Extraction::Features(FeatureVector::from_values(vec![0.1; 99]));
        assert!(classify_live(&classifier, extraction).is_err());
    }
}
