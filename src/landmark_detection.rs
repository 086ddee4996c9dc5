// src/landmark_detection.rs
//
// Body landmark detection. The detector is owned by one analysis session
// at a time: implementations are free to keep tracking state between
// frames, so two sessions must never share an instance.
//
// BlazePoseDetector runs the landmark model on the whole frame with no
// ROI tracking, so it keeps nothing between frames.

use crate::inference::{InferenceEngine, OutputTensor};
use crate::preprocessing::preprocess_landmark_input;
use crate::types::{DetectorConfig, Frame, Landmark, PoseLandmarks, NUM_LANDMARKS};
use anyhow::{anyhow, bail, Result};
use ort::value::Tensor;
use tracing::debug;

/// BlazePose emits 33 body landmarks plus 6 auxiliary ones
const MODEL_LANDMARKS: usize = 39;
/// x, y, z, visibility, presence
const VALUES_PER_LANDMARK: usize = 5;

pub trait LandmarkDetector {
    /// Landmarks of the body in the frame, or None when nobody is visible
    fn detect(&mut self, frame: &Frame) -> Result<Option<PoseLandmarks>>;

    /// Drop any state carried over from earlier frames
    fn reset(&mut self) {}
}

pub struct BlazePoseDetector {
    engine: InferenceEngine,
    input_size: usize,
    min_presence: f32,
}

impl BlazePoseDetector {
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        let engine = InferenceEngine::new(&config.path, config.num_threads)?;
        Ok(Self {
            engine,
            input_size: config.input_size,
            min_presence: config.min_presence,
        })
    }
}

impl LandmarkDetector for BlazePoseDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<PoseLandmarks>> {
        let input =
            preprocess_landmark_input(&frame.data, frame.width, frame.height, self.input_size)?;
        let outputs = self.engine.run(Tensor::from_array(input)?)?;

        let raw = outputs
            .first()
            .and_then(OutputTensor::as_f32)
            .ok_or_else(|| anyhow!("Landmark model returned no landmark tensor"))?;
        let presence_logit = outputs
            .get(1)
            .and_then(OutputTensor::as_f32)
            .and_then(|v| v.first().copied())
            .ok_or_else(|| anyhow!("Landmark model returned no presence score"))?;

        decode_landmarks(raw, presence_logit, self.input_size, self.min_presence)
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Turn the raw landmark tensor into normalized body landmarks
pub fn decode_landmarks(
    raw: &[f32],
    presence_logit: f32,
    input_size: usize,
    min_presence: f32,
) -> Result<Option<PoseLandmarks>> {
    if raw.len() < MODEL_LANDMARKS * VALUES_PER_LANDMARK {
        bail!(
            "Landmark tensor has {} values, expected {}",
            raw.len(),
            MODEL_LANDMARKS * VALUES_PER_LANDMARK
        );
    }

    let presence = sigmoid(presence_logit);
    if presence < min_presence {
        debug!("No body in frame (presence={:.2})", presence);
        return Ok(None);
    }

    let scale = input_size as f32;
    let landmarks = raw
        .chunks_exact(VALUES_PER_LANDMARK)
        .take(NUM_LANDMARKS)
        .map(|v| Landmark {
            x: v[0] / scale,
            y: v[1] / scale,
            visibility: sigmoid(v[3]),
        })
        .collect();

    Ok(Some(PoseLandmarks::new(landmarks)))
}
