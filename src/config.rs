use crate::types::{ClassifierConfig, Config};
use anyhow::{bail, Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_classifier("batch_classifier", &self.models.batch_classifier)?;
        check_classifier("live_classifier", &self.models.live_classifier)?;

        if self.models.landmark_detector.input_size == 0 {
            bail!("models.landmark_detector.input_size must be positive");
        }
        if self.analysis.max_video_frames == 0 {
            bail!("analysis.max_video_frames must be positive");
        }
        let seconds = self.analysis.max_video_seconds;
        if !seconds.is_finite() || seconds <= 0.0 {
            bail!("analysis.max_video_seconds must be a positive number, got {}", seconds);
        }
        Ok(())
    }
}

fn check_classifier(name: &str, config: &ClassifierConfig) -> Result<()> {
    if config.labels.is_empty() {
        bail!("models.{}.labels must list the model's classes", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
models:
  batch_classifier:
    path: models/svm_asana.onnx
    labels: [Tadasana, Vrikshasana]
  live_classifier:
    path: models/random_forest.onnx
    labels: [Tadasana, Vrikshasana]
  landmark_detector:
    path: models/pose_landmark_full.onnx
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.models.landmark_detector.input_size, 256);
        assert!((config.models.landmark_detector.min_presence - 0.3).abs() < 1e-6);
        assert_eq!(config.analysis.max_video_frames, 9000);
        assert_eq!(config.logging.level, "info");
        assert!(config.feedback.is_empty());
        assert!(config.video.extensions.iter().any(|e| e == "webm"));
    }

    #[test]
    fn test_empty_labels_rejected() {
        let yaml = MINIMAL.replacen("[Tadasana, Vrikshasana]", "[]", 1);
        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_non_finite_time_limit_rejected() {
        for value in [".inf", ".nan", "-1.0", "0"] {
            let yaml = format!("{}analysis:\n  max_video_seconds: {}\n", MINIMAL, value);
            assert!(Config::from_yaml(&yaml).is_err(), "accepted {}", value);
        }
    }

    #[test]
    fn test_huge_time_limit_accepted() {
        let yaml = format!("{}analysis:\n  max_video_seconds: 1e300\n", MINIMAL);
        let config = Config::from_yaml(&yaml).unwrap();
        let limits = crate::analyzer::ScanLimits::from(&config.analysis);
        assert_eq!(limits.max_duration, std::time::Duration::MAX);
    }

    #[test]
    fn test_feedback_overrides_parsed() {
        let yaml = format!(
            "{}feedback:\n  Garudasana:\n    - Wrap your arms tightly\n",
            MINIMAL
        );
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(
            config.feedback.get("Garudasana").map(|v| v.len()),
            Some(1)
        );
    }
}
