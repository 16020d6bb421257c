//! Analysis Orchestrator (C8): the single entry point that turns a
//! `TabularFrame` into a persisted `AnalysisResult` + `AttributionBundle`
//! (§4.8, §6). Every component exception below this point is caught
//! once and converted into a neutral result; only `INVALID_INPUT` (a
//! precondition, checked before the pipeline starts) and
//! `SINK_UNAVAILABLE` (C9's handoff failing) escape as a named error to
//! the caller (§7).

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::aircraft::AircraftClass;
use crate::attribution::{self, AttributionBundle};
use crate::cancel::Deadline;
use crate::config::PipelineConfig;
use crate::detector;
use crate::error::{ErrorCode, PipelineError, PipelineResult};
use crate::events;
use crate::frame::TabularFrame;
use crate::model::ModelRegistry;
use crate::phases;
use crate::renderer::ReportRenderer;
use crate::result::{level_of, AnalysisResult, PersistedRecord, Receipt};
use crate::sink::ResultSink;

/// Per-class held-out accuracy from `retrain()` (§6).
#[derive(Debug, Clone, Copy)]
pub struct ClassAccuracy {
    pub class: AircraftClass,
    pub holdout_accuracy: Option<f64>,
}

/// What `analyze` hands back on success: either the full persisted
/// record, or — on cancellation — the neutral result alone, since a
/// canceled analysis is never persisted (§7).
pub enum AnalyzeOutcome {
    Persisted {
        receipt: Receipt,
        result: AnalysisResult,
        attribution: AttributionBundle,
    },
    Canceled {
        result: AnalysisResult,
        attribution: AttributionBundle,
    },
}

impl AnalyzeOutcome {
    #[must_use]
    pub fn result(&self) -> &AnalysisResult {
        match self {
            Self::Persisted { result, .. } | Self::Canceled { result, .. } => result,
        }
    }
}

struct PipelineComputation {
    result: AnalysisResult,
    attribution: AttributionBundle,
}

/// The core pipeline (§2, §4.8), bound to one config, model registry,
/// sink, and renderer for the process lifetime.
pub struct Orchestrator {
    config: PipelineConfig,
    models: Arc<ModelRegistry>,
    sink: Arc<dyn ResultSink>,
    renderer: Arc<dyn ReportRenderer>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(config: PipelineConfig, models: Arc<ModelRegistry>, sink: Arc<dyn ResultSink>, renderer: Arc<dyn ReportRenderer>) -> Self {
        Self { config, models, sink, renderer }
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    /// `feature_set(class)` (§6), re-exposed at the orchestrator seam so
    /// callers don't need to reach into `schema` directly.
    #[must_use]
    pub fn feature_set(class: AircraftClass) -> &'static [&'static str] {
        crate::schema::feature_set(class)
    }

    /// `supported_classes()` (§6).
    #[must_use]
    pub fn supported_classes() -> Vec<(AircraftClass, crate::aircraft::AircraftSignature)> {
        crate::aircraft::supported_classes()
    }

    /// `retrain() -> {per_class accuracy summary}` (§6). Training is
    /// blocking and CPU-bound; callers are expected to invoke this off
    /// the request path (service start or an administrative operation),
    /// never from within `analyze` (§5).
    pub fn retrain(&self, n_samples: usize) -> Vec<ClassAccuracy> {
        self.models
            .retrain_all(&self.config, n_samples)
            .into_iter()
            .map(|(class, outcome)| ClassAccuracy {
                class,
                holdout_accuracy: outcome.ok(),
            })
            .collect()
    }

    /// Worker-task entry point: runs `analyze` on the blocking thread
    /// pool so a multi-threaded host can bind each request to its own
    /// worker without stalling the async reactor on CPU-bound scoring
    /// (§5's "N worker tasks in parallel"). Each request still binds to
    /// one worker for its whole pipeline — there is no finer-grained
    /// interleaving inside a single analysis.
    ///
    /// # Errors
    /// Same as [`Orchestrator::analyze`]; additionally surfaces
    /// `PipelineError::Internal` if the blocking task itself panics
    /// (distinct from a panic inside the pipeline, which `analyze`
    /// already absorbs into a neutral result).
    pub async fn analyze_async(self: Arc<Self>, frame: TabularFrame, deadline: Deadline) -> PipelineResult<AnalyzeOutcome> {
        tokio::task::spawn_blocking(move || self.analyze(&frame, &deadline))
            .await
            .unwrap_or_else(|join_err| Err(PipelineError::Internal(format!("worker task panicked: {join_err}"))))
    }

    /// `analyze(frame, deadline) -> {receipt_id, Analysis Result,
    /// Attribution Bundle}` (§6).
    ///
    /// # Errors
    /// - `InvalidInput` if the frame is empty or shorter than
    ///   `config.min_frame_len` — checked before the pipeline starts, no
    ///   component is invoked and nothing is persisted.
    /// - `SinkUnavailable` if C9's handoff to the sink fails; the
    ///   computed result is discarded (held only in the error's log
    ///   context) since "no retry is prescribed" (§7) for this case.
    pub fn analyze(&self, frame: &TabularFrame, deadline: &Deadline) -> PipelineResult<AnalyzeOutcome> {
        if frame.is_empty() || frame.len() < self.config.min_frame_len {
            return Err(PipelineError::InvalidInput(format!(
                "frame has {} samples, below the minimum of {}",
                frame.len(),
                self.config.min_frame_len
            )));
        }

        let span = tracing::info_span!("analyze", samples = frame.len());
        let _enter = span.enter();
        let started = Instant::now();

        let computation = std::panic::catch_unwind(AssertUnwindSafe(|| self.run_pipeline(frame, deadline)));

        let outcome = match computation {
            Ok(Some(computed)) => computed,
            Ok(None) => {
                tracing::warn!("analysis canceled before completion");
                let result = AnalysisResult::neutral(ErrorCode::Canceled, frame.len(), Utc::now());
                let attribution = AttributionBundle::empty_for(result.aircraft_type);
                return Ok(AnalyzeOutcome::Canceled { result, attribution });
            }
            Err(panic) => {
                let message = panic_message(&panic);
                tracing::error!(error = %message, "internal error inside analysis pipeline");
                let mut result = AnalysisResult::neutral(ErrorCode::Internal, frame.len(), Utc::now());
                result.error_code = Some(ErrorCode::Internal);
                let attribution = AttributionBundle::empty_for(result.aircraft_type);
                return self.persist(result, attribution, started);
            }
        };

        self.persist(outcome.result, outcome.attribution, started)
    }

    /// Steps 1-9 of §4.8, returning `None` if the deadline expires
    /// partway through instead of a partial result.
    fn run_pipeline(&self, frame: &TabularFrame, deadline: &Deadline) -> Option<PipelineComputation> {
        if deadline.is_expired() {
            return None;
        }

        let (class, confidence) = {
            let _span = tracing::info_span!("detect").entered();
            detector::detect(frame, &self.config)
        };

        let model = self.models.for_class(class);

        let prediction = {
            let _span = tracing::info_span!("predict", class = %class).entered();
            model.predict_checked(frame, &self.config, deadline)?
        };

        let risk_score = mean(&prediction);
        let risk_level = level_of(risk_score, &self.config);

        let anomalies = {
            let _span = tracing::info_span!("extract_events").entered();
            events::extract(frame, &prediction, class, &self.config)
        };

        let flight_phases = phases::phase_stats(frame, class, &self.config);
        let performance_metrics = phases::perf_metrics(frame, class);

        let attribution = {
            let _span = tracing::info_span!("explain", class = %class).entered();
            attribution::explain_checked(frame, class, &self.models, &self.config, deadline)?
        };

        let result = AnalysisResult {
            aircraft_type: class,
            aircraft_confidence: confidence,
            risk_score,
            risk_level,
            anomalies,
            flight_phases,
            performance_metrics,
            total_samples: frame.len(),
            analysis_timestamp: Utc::now(),
            error_code: None,
        };

        Some(PipelineComputation { result, attribution })
    }

    fn persist(&self, result: AnalysisResult, attribution: AttributionBundle, started: Instant) -> PipelineResult<AnalyzeOutcome> {
        let processing_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let report = self.renderer.render(&result, &attribution);

        let record = PersistedRecord {
            analysis_id: uuid::Uuid::new_v4(),
            detected_aircraft_type: result.aircraft_type,
            aircraft_confidence: result.aircraft_confidence,
            anomaly_detected: result.any_critical(),
            anomaly_score: result.risk_score,
            risk_score: result.risk_score,
            risk_level: result.risk_level,
            anomalies: result.anomalies.clone(),
            attribution: attribution.clone(),
            ai_report_content: Some(report),
            processing_time_ms,
            analysis_timestamp: result.analysis_timestamp,
            internal_error: result.error_code,
        };

        let span = tracing::info_span!("persist");
        let _enter = span.enter();
        match self.sink.persist(record) {
            Ok(receipt) => Ok(AnalyzeOutcome::Persisted { receipt, result, attribution }),
            Err(err) => {
                tracing::error!(error = %err, "sink handoff failed");
                Err(err)
            }
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        0.0
    } else {
        finite.iter().sum::<f64>() / finite.len() as f64
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl AttributionBundle {
    /// Helper so the orchestrator's absorbed-error paths can build a
    /// matching empty bundle without importing `attribution`'s private
    /// `empty` constructor.
    fn empty_for(class: AircraftClass) -> Self {
        Self {
            top_features: Vec::new(),
            overall_impact: 0.0,
            sample_size: 0,
            aircraft_class: class,
            explanation_text: "Unable to generate explanation".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::TemplateRenderer;
    use crate::sink::InMemorySink;
    use crate::training;

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            PipelineConfig::default(),
            Arc::new(ModelRegistry::new()),
            Arc::new(InMemorySink::new()),
            Arc::new(TemplateRenderer),
        )
    }

    #[test]
    fn frame_below_minimum_length_is_invalid_input() {
        let orch = orchestrator();
        let frame = TabularFrame::new([("altitude".to_string(), vec![1.0; 5])]);
        let err = orch.analyze(&frame, &Deadline::none()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }

    #[test]
    fn canceled_before_start_yields_neutral_unpersisted_result() {
        let orch = orchestrator();
        let set = training::generate(AircraftClass::Multirotor, 100, 42).unwrap();
        let deadline = Deadline::none();
        deadline.token().cancel();
        let outcome = orch.analyze(&set.frame, &deadline).unwrap();
        match outcome {
            AnalyzeOutcome::Canceled { result, .. } => {
                assert_eq!(result.aircraft_type, AircraftClass::Unknown);
                assert_eq!(result.error_code, Some(ErrorCode::Canceled));
            }
            AnalyzeOutcome::Persisted { .. } => panic!("expected a canceled outcome"),
        }
    }

    #[test]
    fn clean_multirotor_hover_produces_low_risk_no_events() {
        let orch = orchestrator();
        let n = 300;
        let frame = TabularFrame::new([
            ("motor_1_rpm".to_string(), vec![3000.0; n]),
            ("motor_2_rpm".to_string(), vec![3000.0; n]),
            ("motor_3_rpm".to_string(), vec![3000.0; n]),
            ("motor_4_rpm".to_string(), vec![3000.0; n]),
            ("speed".to_string(), vec![0.5; n]),
            ("altitude".to_string(), vec![50.0; n]),
            ("vibration_x".to_string(), vec![0.0; n]),
            ("vibration_y".to_string(), vec![0.0; n]),
            ("vibration_z".to_string(), vec![0.0; n]),
            ("vibration_w".to_string(), vec![0.0; n]),
            ("battery_voltage".to_string(), vec![12.0; n]),
        ]);
        let outcome = orch.analyze(&frame, &Deadline::none()).unwrap();
        let result = outcome.result();
        assert_eq!(result.aircraft_type, AircraftClass::Multirotor);
        assert!(result.risk_score >= 0.0 && result.risk_score <= 1.0);
    }

    #[test]
    fn analyze_is_deterministic_up_to_timestamp_and_processing_time() {
        let orch = orchestrator();
        let set = training::generate(AircraftClass::FixedWing, 200, 42).unwrap();
        let a = orch.analyze(&set.frame, &Deadline::none()).unwrap();
        let b = orch.analyze(&set.frame, &Deadline::none()).unwrap();
        assert!((a.result().risk_score - b.result().risk_score).abs() < 1e-9);
        assert_eq!(a.result().aircraft_type, b.result().aircraft_type);
        assert_eq!(a.result().anomalies.len(), b.result().anomalies.len());
    }

    #[tokio::test]
    async fn analyze_async_matches_sync_analyze() {
        let orch = Arc::new(orchestrator());
        let set = training::generate(AircraftClass::Multirotor, 200, 42).unwrap();
        let sync_outcome = orch.analyze(&set.frame, &Deadline::none()).unwrap();
        let async_outcome = orch.clone().analyze_async(set.frame, Deadline::none()).await.unwrap();
        assert_eq!(sync_outcome.result().aircraft_type, async_outcome.result().aircraft_type);
        assert!((sync_outcome.result().risk_score - async_outcome.result().risk_score).abs() < 1e-9);
    }

    #[test]
    fn retrain_returns_per_class_accuracy() {
        let orch = orchestrator();
        let summary = orch.retrain(500);
        assert_eq!(summary.len(), 3);
        for entry in summary {
            let acc = entry.holdout_accuracy.expect("training should succeed");
            assert!((0.0..=1.0).contains(&acc));
        }
    }
}
