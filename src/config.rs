//! Pipeline configuration: thresholds and seeds, passed in at construction.
//!
//! Deliberately not a global singleton — the source system kept these as a
//! process-wide config object and a module-level random seed. Per-component
//! construction-time injection lets tests set a seed without racing a
//! global, and lets multiple pipelines coexist in one process with
//! different thresholds.

use serde::{Deserialize, Serialize};

/// Thresholds and seeds shared by every component in one pipeline instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum winning score for `ClassDetector` to commit to a class
    /// instead of falling back to `Unknown`.
    pub class_detection_confidence: f64,
    /// Minimum anomaly probability for a row to become an `AnomalyEvent`.
    pub event_probability_threshold: f64,
    /// Probability above which an event's severity is `Critical`.
    pub severity_critical_threshold: f64,
    /// Number of events a renderer/caller should show by default; the
    /// extractor itself never truncates (spec'd: "no truncation at this
    /// layer").
    pub event_display_cap: usize,
    /// Max rows sampled by the attribution explainer.
    pub explainer_sample_size: usize,
    /// Assumed sample rate in Hz, used when no usable timestamp column
    /// is present.
    pub sample_rate_hz: f64,
    /// Frames shorter than this are `INVALID_INPUT`.
    pub min_frame_len: usize,
    /// Seed for the synthetic training-data generator.
    pub trainer_seed: u64,
    /// Seed for the attribution explainer's row sampling.
    pub explainer_sample_seed: u64,
    /// Number of gradient-boosted trees per class model.
    pub gbm_n_estimators: usize,
    /// Max depth of each tree.
    pub gbm_max_depth: usize,
    /// Shrinkage / learning rate applied to each tree's contribution.
    pub gbm_learning_rate: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            class_detection_confidence: 0.8,
            event_probability_threshold: 0.7,
            severity_critical_threshold: 0.9,
            event_display_cap: 10,
            explainer_sample_size: 100,
            sample_rate_hz: 10.0,
            min_frame_len: 10,
            trainer_seed: 42,
            explainer_sample_seed: 42,
            gbm_n_estimators: 100,
            gbm_max_depth: 6,
            gbm_learning_rate: 0.1,
        }
    }
}

impl PipelineConfig {
    /// Parse a config from a TOML document, falling back to defaults for
    /// any field left unspecified.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// The fixed 0.1s/row time factor implied by `sample_rate_hz`.
    #[must_use]
    pub fn seconds_per_row(&self) -> f64 {
        1.0 / self.sample_rate_hz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_thresholds() {
        let cfg = PipelineConfig::default();
        assert!((cfg.class_detection_confidence - 0.8).abs() < f64::EPSILON);
        assert!((cfg.event_probability_threshold - 0.7).abs() < f64::EPSILON);
        assert!((cfg.severity_critical_threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(cfg.event_display_cap, 10);
        assert_eq!(cfg.explainer_sample_size, 100);
        assert_eq!(cfg.min_frame_len, 10);
    }

    #[test]
    fn partial_toml_overrides_fill_in_defaults() {
        let cfg = PipelineConfig::from_toml_str("class_detection_confidence = 0.9\n").unwrap();
        assert!((cfg.class_detection_confidence - 0.9).abs() < f64::EPSILON);
        assert_eq!(cfg.event_display_cap, 10);
    }
}
