// src/types.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of body landmarks produced by the pose landmark model.
pub const NUM_LANDMARKS: usize = 33;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub models: ModelsConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub video: VideoConfig,
    /// Extra or replacement feedback entries, keyed by pose name
    #[serde(default)]
    pub feedback: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub batch_classifier: ClassifierConfig,
    pub live_classifier: ClassifierConfig,
    pub landmark_detector: DetectorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub path: String,
    /// Class names in the order the model emits them
    pub labels: Vec<String>,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub path: String,
    #[serde(default = "default_input_size")]
    pub input_size: usize,
    #[serde(default = "default_min_presence")]
    pub min_presence: f32,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_max_video_frames")]
    pub max_video_frames: u64,
    #[serde(default = "default_max_video_seconds")]
    pub max_video_seconds: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_video_frames: default_max_video_frames(),
            max_video_seconds: default_max_video_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    #[serde(default = "default_input_dir")]
    pub input_dir: String,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            extensions: default_extensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_num_threads() -> usize {
    1
}

fn default_input_size() -> usize {
    256
}

fn default_min_presence() -> f32 {
    0.3
}

fn default_max_video_frames() -> u64 {
    9000
}

fn default_max_video_seconds() -> f64 {
    300.0
}

fn default_input_dir() -> String {
    "videos".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_extensions() -> Vec<String> {
    ["mp4", "avi", "mov", "mkv", "webm"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Decoded RGB frame, row-major HWC
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub timestamp_ms: f64,
}

/// A single body keypoint in normalized image coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Landmark {
    pub x: f32, // 0-1 normalized
    pub y: f32, // 0-1 normalized
    pub visibility: f32,
}

/// Landmarks for the one body found in a frame
#[derive(Debug, Clone, Default)]
pub struct PoseLandmarks {
    pub landmarks: Vec<Landmark>,
}

impl PoseLandmarks {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}

/// Which call shape a vector, classifier or result belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Recorded video: 2D landmarks, majority vote
    Batch,
    /// Single camera frame: landmarks with visibility, class probability
    Live,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Batch => "batch",
            AnalysisMode::Live => "live",
        }
    }
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
