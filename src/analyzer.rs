// src/analyzer.rs
//
// The two entry points: one live camera frame, or a whole recorded video.
//
//   live:  frame → detect → extract(99) → classifier + probabilities ──┐
//   batch: frames → detect → extract(66) → classifier → VoteTally ─────┼→ feedback → AnalysisResult
//
// AnalysisContext is built once at startup and only read afterwards.
// Landmark detectors are passed in per call because they may carry
// tracking state and belong to exactly one session.

use crate::aggregation::VoteTally;
use crate::classifier::{load_classifier, PoseClassifier, ProbabilisticClassifier};
use crate::feedback::FeedbackResolver;
use crate::frame_processor::{process_batch_frame, process_live_frame, FrameOutcome};
use crate::landmark_detection::{BlazePoseDetector, LandmarkDetector};
use crate::metrics::PipelineMetrics;
use crate::result::{AnalysisFailure, AnalysisOutcome, AnalysisResult, ScoreSource};
use crate::types::{AnalysisConfig, AnalysisMode, Config, DetectorConfig, Frame};
use crate::video_processor::open_video;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Upper bounds on the work one video analysis may do
#[derive(Debug, Clone, Copy)]
pub struct ScanLimits {
    pub max_frames: u64,
    pub max_duration: Duration,
}

impl From<&AnalysisConfig> for ScanLimits {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            max_frames: config.max_video_frames,
            max_duration: duration_from_secs(config.max_video_seconds),
        }
    }
}

/// Values past what Duration holds saturate, anything else unusable means no time at all
fn duration_from_secs(seconds: f64) -> Duration {
    match Duration::try_from_secs_f64(seconds) {
        Ok(duration) => duration,
        Err(_) if seconds > 0.0 => Duration::MAX,
        Err(_) => Duration::ZERO,
    }
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

/// Shared flag for stopping a video scan between frames
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfVideo,
    FrameLimit,
    TimeLimit,
    Cancelled,
    DecodeError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub frames_scanned: u64,
    pub frames_classified: u64,
    pub frames_skipped: u64,
    pub frames_without_pose: u64,
    pub stop: StopReason,
}

impl ScanStats {
    /// Share of scanned frames where a body was found
    pub fn detection_rate(&self) -> f32 {
        if self.frames_scanned == 0 {
            return 0.0;
        }
        1.0 - self.frames_without_pose as f32 / self.frames_scanned as f32
    }
}

impl Default for ScanStats {
    fn default() -> Self {
        Self {
            frames_scanned: 0,
            frames_classified: 0,
            frames_skipped: 0,
            frames_without_pose: 0,
            stop: StopReason::EndOfVideo,
        }
    }
}

pub struct AnalysisContext {
    batch_classifier: Option<Arc<dyn PoseClassifier>>,
    live_classifier: Option<Arc<dyn ProbabilisticClassifier>>,
    feedback: FeedbackResolver,
    limits: ScanLimits,
    detector_config: Option<DetectorConfig>,
    metrics: PipelineMetrics,
}

impl AnalysisContext {
    pub fn new(
        batch_classifier: Option<Arc<dyn PoseClassifier>>,
        live_classifier: Option<Arc<dyn ProbabilisticClassifier>>,
    ) -> Self {
        Self {
            batch_classifier,
            live_classifier,
            feedback: FeedbackResolver::new(),
            limits: ScanLimits::default(),
            detector_config: None,
            metrics: PipelineMetrics::new(),
        }
    }

    /// Load both classifiers. A model that fails to load only disables its mode.
    pub fn from_config(config: &Config) -> Self {
        let batch = load_classifier(&config.models.batch_classifier, AnalysisMode::Batch)
            .map(|c| c as Arc<dyn PoseClassifier>);
        let live = load_classifier(&config.models.live_classifier, AnalysisMode::Live)
            .map(|c| c as Arc<dyn ProbabilisticClassifier>);

        if batch.is_none() && live.is_none() {
            warn!("No classifier available, every analysis will report ModelNotLoaded");
        }

        Self {
            feedback: FeedbackResolver::with_overrides(&config.feedback),
            limits: ScanLimits::from(&config.analysis),
            detector_config: Some(config.models.landmark_detector.clone()),
            ..Self::new(batch, live)
        }
    }

    pub fn with_feedback(mut self, feedback: FeedbackResolver) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn with_limits(mut self, limits: ScanLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn is_ready(&self, mode: AnalysisMode) -> bool {
        match mode {
            AnalysisMode::Batch => self.batch_classifier.is_some(),
            AnalysisMode::Live => self.live_classifier.is_some(),
        }
    }

    /// A fresh detector for one camera stream or one video
    pub fn open_detector_session(&self) -> Result<BlazePoseDetector> {
        let config = self
            .detector_config
            .as_ref()
            .context("No landmark detector configured")?;
        BlazePoseDetector::new(config)
    }

    pub fn analyze_live_frame(
        &self,
        detector: &mut dyn LandmarkDetector,
        frame: &Frame,
    ) -> AnalysisOutcome {
        self.metrics.inc(&self.metrics.live_calls);

        let classifier = self.require_live()?;
        let outcome = process_live_frame(detector, classifier.as_ref(), frame)
            .map_err(|failure| self.record_failure(failure))?;

        match outcome {
            FrameOutcome::Scored { label, confidence } => {
                let feedback = self.feedback.resolve(&label);
                let result =
                    AnalysisResult::new(label, confidence, ScoreSource::ClassProbability, feedback);
                log_summary(&result);
                Ok(result)
            }
            other => {
                debug!("Unexpected live outcome {:?}", other);
                Err(self.record_failure(AnalysisFailure::NoPoseDetected))
            }
        }
    }

    pub fn analyze_video(
        &self,
        detector: &mut dyn LandmarkDetector,
        path: &Path,
        cancel: &CancelToken,
    ) -> AnalysisOutcome {
        self.require_batch()?;

        let reader = open_video(path).map_err(|e| {
            self.record_failure(AnalysisFailure::InvalidSource {
                path: path.display().to_string(),
                reason: format!("{:#}", e),
            })
        })?;

        self.analyze_frames(detector, reader, cancel)
    }

    pub fn analyze_frames<I>(
        &self,
        detector: &mut dyn LandmarkDetector,
        frames: I,
        cancel: &CancelToken,
    ) -> AnalysisOutcome
    where
        I: IntoIterator<Item = Result<Frame>>,
    {
        self.scan(detector, frames, cancel).0
    }

    /// Batch analysis that also reports how the scan went
    pub fn scan<I>(
        &self,
        detector: &mut dyn LandmarkDetector,
        frames: I,
        cancel: &CancelToken,
    ) -> (AnalysisOutcome, ScanStats)
    where
        I: IntoIterator<Item = Result<Frame>>,
    {
        let classifier = match self.require_batch() {
            Ok(classifier) => classifier,
            Err(failure) => return (Err(failure), ScanStats::default()),
        };

        let started = Instant::now();
        let mut tally = VoteTally::new();
        let mut stats = ScanStats::default();

        detector.reset();
        self.metrics.inc(&self.metrics.videos_analyzed);

        for frame in frames {
            if cancel.is_cancelled() {
                stats.stop = StopReason::Cancelled;
                break;
            }
            if stats.frames_scanned >= self.limits.max_frames {
                warn!(
                    "Frame limit ({}) reached, voting on frames so far",
                    self.limits.max_frames
                );
                stats.stop = StopReason::FrameLimit;
                break;
            }
            if started.elapsed() >= self.limits.max_duration {
                warn!(
                    "Time limit ({:?}) reached, voting on frames so far",
                    self.limits.max_duration
                );
                stats.stop = StopReason::TimeLimit;
                break;
            }

            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(
                        "Stopping scan, failed to decode frame {}: {:#}",
                        stats.frames_scanned + 1,
                        e
                    );
                    stats.stop = StopReason::DecodeError;
                    break;
                }
            };

            stats.frames_scanned += 1;
            self.metrics.inc(&self.metrics.frames_scanned);

            match process_batch_frame(detector, classifier.as_ref(), &frame) {
                Ok(FrameOutcome::Label(label)) => {
                    debug!("Frame {}: {}", stats.frames_scanned, label);
                    tally.push(&label);
                    stats.frames_classified += 1;
                    self.metrics.inc(&self.metrics.frames_classified);
                }
                Ok(skipped) => {
                    debug!("Frame {}: skipped ({:?})", stats.frames_scanned, skipped);
                    if skipped == FrameOutcome::NoLandmarks {
                        stats.frames_without_pose += 1;
                    }
                    stats.frames_skipped += 1;
                    self.metrics.inc(&self.metrics.frames_skipped);
                }
                Err(e) => {
                    warn!("Frame {}: skipped after error: {:#}", stats.frames_scanned, e);
                    stats.frames_skipped += 1;
                    self.metrics.inc(&self.metrics.frames_skipped);
                }
            }
        }

        self.metrics
            .set_timing(&self.metrics.last_video_time_us, started.elapsed().as_micros() as u64);
        info!(
            "Scanned {} frames: {} classified, {} skipped, body found in {:.0}% ({:?})",
            stats.frames_scanned,
            stats.frames_classified,
            stats.frames_skipped,
            stats.detection_rate() * 100.0,
            stats.stop
        );

        if stats.stop == StopReason::Cancelled && tally.is_empty() {
            let failure = AnalysisFailure::Cancelled {
                frames_scanned: stats.frames_scanned,
            };
            return (Err(self.record_failure(failure)), stats);
        }

        let outcome = tally
            .decide(stats.frames_scanned)
            .map(|vote| {
                let feedback = self.feedback.resolve(&vote.label);
                let result = AnalysisResult::new(
                    vote.label,
                    vote.score,
                    ScoreSource::VoteAgreement,
                    feedback,
                );
                log_summary(&result);
                result
            })
            .map_err(|failure| self.record_failure(failure));

        (outcome, stats)
    }

    fn require_batch(&self) -> Result<&Arc<dyn PoseClassifier>, AnalysisFailure> {
        self.batch_classifier.as_ref().ok_or_else(|| {
            self.record_failure(AnalysisFailure::ModelNotLoaded {
                mode: AnalysisMode::Batch,
            })
        })
    }

    fn require_live(&self) -> Result<&Arc<dyn ProbabilisticClassifier>, AnalysisFailure> {
        self.live_classifier.as_ref().ok_or_else(|| {
            self.record_failure(AnalysisFailure::ModelNotLoaded {
                mode: AnalysisMode::Live,
            })
        })
    }

    fn record_failure(&self, failure: AnalysisFailure) -> AnalysisFailure {
        self.metrics.inc(&self.metrics.failures);
        warn!("Analysis failed: {}", failure);
        failure
    }
}

fn log_summary(result: &AnalysisResult) {
    info!(
        "Predicted pose: {} | confidence {:.2}% ({:?}) | {}",
        result.label,
        result.score,
        result.score_source,
        result.verdict_message()
    );
    info!("Feedback: {}", result.feedback.join("; "));
}
