//! Anomaly Model (C4): one gradient-boosted classifier plus feature
//! scaler per concrete aircraft class.
//!
//! Training mutates model state and is serialized by a per-class write
//! lock (`Mutex`); readers take a lock-free snapshot of the published
//! artifact through `ArcSwapOption` (§5: "train-then-publish"). A
//! `predict` call that races a `train` call always sees either the old
//! artifact or the new one in full, never a half-updated one.

pub mod gbm;
pub mod scaler;

use std::sync::Mutex;

use arc_swap::ArcSwapOption;

use crate::aircraft::AircraftClass;
use crate::cancel::Deadline;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::frame::TabularFrame;
use crate::schema::feature_set;
use crate::training;

/// Batch size `predict_checked` checks the deadline at (§5: "at least
/// once per 1024 samples for predict").
const PREDICT_CANCEL_BATCH: usize = 1024;

use gbm::GradientBoostedClassifier;
use scaler::StandardScaler;

/// The fitted artifact published after a successful `train()`: the
/// scaler and classifier together, plus a held-out accuracy figure from
/// the 80/20 split used to fit them.
#[derive(Clone)]
struct Trained {
    scaler: StandardScaler,
    classifier: GradientBoostedClassifier,
    holdout_accuracy: f64,
}

/// One class's anomaly model. `train()` is blocking and CPU-bound and
/// must not run on the request path in a multi-tenant deployment; a
/// single-process deployment may instead rely on lazy self-training on
/// first `predict` (§4.4), which is what `predict` does here, guarded by
/// the same write lock `train()` uses so concurrent first-callers don't
/// each fit their own copy.
pub struct AnomalyModel {
    class: AircraftClass,
    published: ArcSwapOption<Trained>,
    write_lock: Mutex<()>,
}

impl AnomalyModel {
    #[must_use]
    pub fn new(class: AircraftClass) -> Self {
        assert!(
            class != AircraftClass::Unknown,
            "AnomalyModel is only defined for concrete classes"
        );
        Self {
            class,
            published: ArcSwapOption::from(None),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn class(&self) -> AircraftClass {
        self.class
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.published.load().is_some()
    }

    /// `feature_names()` (§4.4): the training schema in training order,
    /// equal to `schema::feature_set` for this class.
    #[must_use]
    pub fn feature_names(&self) -> &'static [&'static str] {
        feature_set(self.class)
    }

    /// (Re)fit the scaler and classifier on freshly generated synthetic
    /// data, then publish atomically. Deterministic under `config`'s
    /// trainer seed. Returns the held-out accuracy for the retrain
    /// summary (§6 `retrain()`).
    ///
    /// # Errors
    /// Propagates `PipelineError::Internal` if synthetic data generation
    /// fails (only possible via a misconfigured sample size — guarded by
    /// `n_samples` below, so this is effectively infallible in practice).
    pub fn train(&self, config: &PipelineConfig, n_samples: usize) -> PipelineResult<f64> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let set = training::generate(self.class, n_samples, config.trainer_seed)?;
        let (train_set, test_set) = set.train_test_split();
        let features = feature_set(self.class);

        let train_rows = to_rows(&train_set.frame, features);
        let scaler = StandardScaler::fit(&train_rows, features.len());
        let scaled_train = scaler.transform(&train_rows);

        let classifier = GradientBoostedClassifier::fit(
            &scaled_train,
            &train_set.labels,
            features.len(),
            config.gbm_n_estimators,
            config.gbm_max_depth,
            config.gbm_learning_rate,
        );

        let test_rows = to_rows(&test_set.frame, features);
        let scaled_test = scaler.transform(&test_rows);
        let holdout_accuracy = accuracy(&classifier, &scaled_test, &test_set.labels);

        self.published.store(Some(std::sync::Arc::new(Trained {
            scaler,
            classifier,
            holdout_accuracy,
        })));

        tracing::info!(
            class = %self.class,
            holdout_accuracy,
            "anomaly model trained"
        );

        Ok(holdout_accuracy)
    }

    /// `predict(frame) -> prediction_vector` (§4.4). Lazily trains on
    /// first call if not yet published. Missing schema columns are
    /// zero-filled by `TabularFrame::get`; output values are in `[0, 1]`.
    pub fn predict(&self, frame: &TabularFrame, config: &PipelineConfig) -> Vec<f64> {
        self.predict_checked(frame, config, &Deadline::none())
            .unwrap_or_else(|| vec![0.5; frame.len()])
    }

    /// Same contract as `predict`, but checks `deadline` between
    /// batches of `PREDICT_CANCEL_BATCH` rows (§5) and returns `None`
    /// if it expires partway through — the orchestrator turns that into
    /// the `CANCELED` neutral result rather than a partial prediction.
    pub fn predict_checked(&self, frame: &TabularFrame, config: &PipelineConfig, deadline: &Deadline) -> Option<Vec<f64>> {
        if frame.is_empty() {
            return Some(Vec::new());
        }
        if deadline.is_expired() {
            return None;
        }
        if !self.is_ready() {
            if let Err(err) = self.train(config, default_training_size(config)) {
                tracing::warn!(class = %self.class, error = %err, "lazy self-train failed");
                return Some(vec![0.5; frame.len()]);
            }
        }

        let Some(trained) = self.published.load_full() else {
            return Some(vec![0.5; frame.len()]);
        };

        let features = feature_set(self.class);
        let rows = to_rows(frame, features);
        let scaled = trained.scaler.transform(&rows);

        let mut out = Vec::with_capacity(scaled.len());
        for batch in scaled.chunks(PREDICT_CANCEL_BATCH) {
            if deadline.is_expired() {
                return None;
            }
            out.extend(batch.iter().map(|row| trained.classifier.predict_proba(row)));
        }
        Some(out)
    }

    /// Per-feature Saabas contributions for one row, in the class's
    /// feature order, used by the attribution explainer (C7). Empty if
    /// the model is not yet trained (the explainer degrades gracefully
    /// on an empty result rather than forcing a train here).
    #[must_use]
    pub fn contributions(&self, scaled_row: &[f64]) -> Vec<f64> {
        self.published
            .load_full()
            .map_or_else(|| vec![0.0; scaled_row.len()], |t| t.classifier.contributions(scaled_row))
    }

    /// Scale a single raw row using the published scaler (identity if
    /// not yet trained), for use by the explainer.
    #[must_use]
    pub fn scale_row(&self, row: &[f64]) -> Vec<f64> {
        self.published
            .load_full()
            .map_or_else(|| row.to_vec(), |t| t.scaler.transform_row(row))
    }
}

fn default_training_size(config: &PipelineConfig) -> usize {
    (config.min_frame_len * 200).max(2000)
}

fn to_rows(frame: &TabularFrame, features: &[&str]) -> Vec<Vec<f64>> {
    let columns: Vec<Vec<f64>> = features.iter().map(|f| frame.get(f)).collect();
    (0..frame.len())
        .map(|i| columns.iter().map(|c| c[i]).collect())
        .collect()
}

fn accuracy(classifier: &GradientBoostedClassifier, rows: &[Vec<f64>], labels: &[f64]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let correct = rows
        .iter()
        .zip(labels.iter())
        .filter(|(row, &label)| {
            let predicted = if classifier.predict_proba(row) > 0.5 { 1.0 } else { 0.0 };
            (predicted - label).abs() < f64::EPSILON
        })
        .count();
    correct as f64 / rows.len() as f64
}

/// Registry of the three concrete classes' models, keyed by
/// `AircraftClass` (§4.8's explicit `Unknown -> Multirotor` fallback is
/// resolved by the caller before indexing this registry, not hidden in a
/// dictionary default).
pub struct ModelRegistry {
    fixed_wing: AnomalyModel,
    multirotor: AnomalyModel,
    vtol: AnomalyModel,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fixed_wing: AnomalyModel::new(AircraftClass::FixedWing),
            multirotor: AnomalyModel::new(AircraftClass::Multirotor),
            vtol: AnomalyModel::new(AircraftClass::Vtol),
        }
    }

    /// The model for `class`, substituting Multirotor for Unknown.
    ///
    /// # Panics
    /// Never: `or_multirotor_fallback` guarantees a concrete class.
    #[must_use]
    pub fn for_class(&self, class: AircraftClass) -> &AnomalyModel {
        match class.or_multirotor_fallback() {
            AircraftClass::FixedWing => &self.fixed_wing,
            AircraftClass::Multirotor => &self.multirotor,
            AircraftClass::Vtol => &self.vtol,
            AircraftClass::Unknown => unreachable!("or_multirotor_fallback never returns Unknown"),
        }
    }

    /// Train all three concrete-class models, returning a per-class
    /// held-out accuracy summary (§6 `retrain()`).
    pub fn retrain_all(
        &self,
        config: &PipelineConfig,
        n_samples: usize,
    ) -> Vec<(AircraftClass, PipelineResult<f64>)> {
        AircraftClass::concrete_classes()
            .into_iter()
            .map(|class| (class, self.for_class(class).train(config, n_samples)))
            .collect()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
