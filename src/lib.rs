// src/lib.rs
//
// Yoga pose analysis from body landmarks.
//
// Signal flow:
//   Frame → landmark_detection → features → frame_processor ─┬→ (live) class probability ─┐
//                                                             └→ (video) aggregation ───────┼→ feedback → result
//
// analyzer::AnalysisContext ties the pieces together for callers.

pub mod aggregation;
pub mod analyzer;
pub mod classifier;
pub mod config;
pub mod feedback;
pub mod features;
pub mod frame_decode;
pub mod frame_processor;
pub mod inference;
pub mod landmark_detection;
pub mod metrics;
pub mod preprocessing;
pub mod result;
pub mod types;
pub mod video_processor;

pub use aggregation::{majority_vote, VoteSummary, VoteTally};
pub use analyzer::{AnalysisContext, CancelToken, ScanLimits, ScanStats, StopReason};
pub use classifier::{PoseClassifier, ProbabilisticClassifier};
pub use feedback::FeedbackResolver;
pub use features::{extract_features, Extraction, FeatureVector};
pub use landmark_detection::{BlazePoseDetector, LandmarkDetector};
pub use result::{into_response, AnalysisFailure, AnalysisOutcome, AnalysisResult, ScoreSource};
pub use types::{AnalysisMode, Config, Frame, Landmark, PoseLandmarks};
