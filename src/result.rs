// src/result.rs
//
// The one response shape handed to callers, plus the failure taxonomy.
// Failures convert into the same shape (score 0.0, diagnostic label) so
// consumers never branch on which pipeline or outcome produced a value.

use crate::types::AnalysisMode;
use serde::Serialize;
use thiserror::Error;

/// Score at or above which a pose counts as performed correctly
pub const VERDICT_THRESHOLD: f64 = 60.0;

/// What a score measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// Share of valid video frames agreeing with the majority label
    VoteAgreement,
    /// Classifier's probability for the predicted class
    ClassProbability,
    /// Failure results carry no measurement
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub label: String,
    pub score: f64,
    pub verdict: bool,
    pub feedback: Vec<String>,
    pub score_source: ScoreSource,
}

impl AnalysisResult {
    pub fn new(label: String, score: f64, source: ScoreSource, feedback: Vec<String>) -> Self {
        Self {
            label,
            score,
            verdict: passes(score),
            feedback,
            score_source: source,
        }
    }

    pub fn verdict_message(&self) -> &'static str {
        match (self.score_source, self.verdict) {
            (ScoreSource::VoteAgreement, true) => "Pose performed correctly!",
            (ScoreSource::VoteAgreement, false) => "Pose performed incorrectly!",
            (ScoreSource::ClassProbability, true) => "Live pose detected!",
            (ScoreSource::ClassProbability, false) => "Low confidence in prediction",
            (ScoreSource::None, _) => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisFailure {
    #[error("{mode} classifier not loaded")]
    ModelNotLoaded { mode: AnalysisMode },

    #[error("invalid video source {path}: {reason}")]
    InvalidSource { path: String, reason: String },

    #[error("no pose detected in frame")]
    NoPoseDetected,

    #[error("no pose detected in any of {frames_scanned} video frames")]
    NoValidFramesInVideo { frames_scanned: u64 },

    #[error("analysis cancelled after {frames_scanned} frames")]
    Cancelled { frames_scanned: u64 },

    #[error("inference failed: {0}")]
    Inference(String),
}

impl AnalysisFailure {
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisFailure::ModelNotLoaded { mode: AnalysisMode::Batch } => {
                "Video model not loaded"
            }
            AnalysisFailure::ModelNotLoaded { mode: AnalysisMode::Live } => {
                "Live model not loaded"
            }
            AnalysisFailure::InvalidSource { .. } => "Invalid video path",
            AnalysisFailure::NoPoseDetected => "No pose detected in frame",
            AnalysisFailure::NoValidFramesInVideo { .. } => "No pose detected in video",
            AnalysisFailure::Cancelled { .. } => "Analysis cancelled",
            AnalysisFailure::Inference(_) => "Analysis failed",
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            AnalysisFailure::ModelNotLoaded { .. } | AnalysisFailure::Inference(_) => {
                "Pose analysis is unavailable right now, please try again later."
            }
            AnalysisFailure::InvalidSource { .. } => {
                "The video could not be opened, please upload it again."
            }
            AnalysisFailure::NoPoseDetected | AnalysisFailure::NoValidFramesInVideo { .. } => {
                "Make sure your whole body is visible to the camera."
            }
            AnalysisFailure::Cancelled { .. } => {
                "The analysis was stopped before any pose was found."
            }
        }
    }

    pub fn to_result(&self) -> AnalysisResult {
        AnalysisResult {
            label: self.label().to_string(),
            score: 0.0,
            verdict: false,
            feedback: vec![self.hint().to_string()],
            score_source: ScoreSource::None,
        }
    }
}

pub type AnalysisOutcome = Result<AnalysisResult, AnalysisFailure>;

/// Collapse success and failure into the single response shape
pub fn into_response(outcome: AnalysisOutcome) -> AnalysisResult {
    outcome.unwrap_or_else(|failure| failure.to_result())
}

pub fn passes(score: f64) -> bool {
    score >= VERDICT_THRESHOLD
}

/// Round a percentage to two decimal places
pub fn round_score(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
