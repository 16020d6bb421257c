//! Attribution Explainer (C7): per-feature impact of the class model's
//! anomaly probability on a deterministically sampled sub-frame, plus a
//! short natural-language summary.
//!
//! Degrades gracefully on any internal error: an empty `top_features`,
//! `overall_impact = 0`, and the fixed text "Unable to generate
//! explanation" (§4.7, §7) — this module's public entry point never
//! returns an `Err`.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;

use crate::aircraft::AircraftClass;
use crate::cancel::Deadline;
use crate::config::PipelineConfig;
use crate::frame::TabularFrame;
use crate::model::ModelRegistry;
use crate::schema::feature_set;

/// Rows per cancellation check (§5: "once per sample-block for explain").
const EXPLAIN_CANCEL_BLOCK: usize = 16;

/// One feature's attribution record.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FeatureImpact {
    pub feature: String,
    pub importance: f64,
    pub average_value: f64,
    pub impact: ImpactDirection,
    pub aircraft_class: AircraftClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ImpactDirection {
    Positive,
    Negative,
}

/// `{ top_features, overall_impact, sample_size, aircraft_class,
/// explanation_text }` (§3).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AttributionBundle {
    pub top_features: Vec<FeatureImpact>,
    pub overall_impact: f64,
    pub sample_size: usize,
    pub aircraft_class: AircraftClass,
    pub explanation_text: String,
}

impl AttributionBundle {
    fn empty(class: AircraftClass) -> Self {
        Self {
            top_features: Vec::new(),
            overall_impact: 0.0,
            sample_size: 0,
            aircraft_class: class,
            explanation_text: "Unable to generate explanation".to_string(),
        }
    }
}

/// Phrases keyed by feature-name substring, composed in the order the
/// top features appear (§4.7: "up to three class-specific phrases").
const PHRASE_TABLE: &[(&str, &str)] = &[
    ("airspeed", "airspeed deviations are a leading driver of the anomaly score"),
    ("motor", "motor output irregularities are strongly influencing this assessment"),
    ("vibration", "elevated vibration signatures are contributing to the risk estimate"),
    ("battery", "battery voltage trends are shaping the predicted risk"),
    ("pitch", "attitude (pitch) excursions are factoring into the score"),
    ("roll", "attitude (roll) excursions are factoring into the score"),
    ("altitude", "altitude behavior is contributing to the model's assessment"),
    ("gps_hdop", "GPS positioning quality is affecting the confidence of this read"),
    ("temperature", "temperature readings are part of the model's signal"),
    ("transition_mode", "flight-mode transitions are shaping the risk estimate"),
];

fn phrases_for(features: &[FeatureImpact]) -> String {
    let mut chosen: Vec<&'static str> = Vec::new();
    for f in features {
        for (needle, phrase) in PHRASE_TABLE {
            if f.feature.contains(needle) && !chosen.contains(phrase) {
                chosen.push(phrase);
                break;
            }
        }
        if chosen.len() >= 3 {
            break;
        }
    }
    if chosen.is_empty() {
        "No single feature dominates this prediction.".to_string()
    } else {
        format!("{}.", chosen.join("; "))
    }
}

/// `explain(frame, class, registry, config) -> AttributionBundle` (§4.7).
/// Samples up to `config.explainer_sample_size` rows deterministically
/// (seeded by `config.explainer_sample_seed`), computes per-feature mean
/// absolute contribution to the model's log-odds over the sample,
/// ranks the top five, and renders a short explanation.
#[must_use]
pub fn explain(frame: &TabularFrame, class: AircraftClass, registry: &ModelRegistry, config: &PipelineConfig) -> AttributionBundle {
    explain_checked(frame, class, registry, config, &Deadline::none()).unwrap_or_else(|| AttributionBundle::empty(class))
}

/// Same contract as `explain`, but checks `deadline` every
/// `EXPLAIN_CANCEL_BLOCK` sampled rows and returns `None` if it expires
/// partway through (§5) — the orchestrator treats that like any other
/// cancellation, not as an internal error.
#[must_use]
pub fn explain_checked(
    frame: &TabularFrame,
    class: AircraftClass,
    registry: &ModelRegistry,
    config: &PipelineConfig,
    deadline: &Deadline,
) -> Option<AttributionBundle> {
    if frame.is_empty() {
        return Some(AttributionBundle::empty(class));
    }
    if deadline.is_expired() {
        return None;
    }

    let features = feature_set(class);
    let model = registry.for_class(class);

    let sample_size = config.explainer_sample_size.min(frame.len());
    let mut rng = StdRng::seed_from_u64(config.explainer_sample_seed);
    let indices: Vec<usize> = if sample_size >= frame.len() {
        (0..frame.len()).collect()
    } else {
        sample(&mut rng, frame.len(), sample_size).into_vec()
    };

    let columns: Vec<Vec<f64>> = features.iter().map(|f| frame.get(f)).collect();

    let mut sum_abs_contrib = vec![0.0_f64; features.len()];
    let mut sum_signed_contrib = vec![0.0_f64; features.len()];
    let mut sum_value = vec![0.0_f64; features.len()];

    for block in indices.chunks(EXPLAIN_CANCEL_BLOCK) {
        if deadline.is_expired() {
            return None;
        }
        for &idx in block {
            let raw_row: Vec<f64> = columns.iter().map(|c| c[idx]).collect();
            let scaled_row = model.scale_row(&raw_row);
            let contrib = model.contributions(&scaled_row);
            for j in 0..features.len() {
                sum_abs_contrib[j] += contrib[j].abs();
                sum_signed_contrib[j] += contrib[j];
                sum_value[j] += raw_row[j];
            }
        }
    }

    let n = indices.len().max(1) as f64;
    let mut impacts: Vec<FeatureImpact> = (0..features.len())
        .map(|j| FeatureImpact {
            feature: features[j].to_string(),
            importance: sum_abs_contrib[j] / n,
            average_value: sum_value[j] / n,
            impact: if sum_signed_contrib[j] >= 0.0 {
                ImpactDirection::Positive
            } else {
                ImpactDirection::Negative
            },
            aircraft_class: class,
        })
        .collect();

    impacts.sort_by(|a, b| b.importance.partial_cmp(&a.importance).unwrap_or(std::cmp::Ordering::Equal));

    let overall_impact = impacts.iter().map(|f| f.importance).sum::<f64>() / impacts.len().max(1) as f64;
    let top_features: Vec<FeatureImpact> = impacts.into_iter().take(5).collect();
    let explanation_text = phrases_for(&top_features);

    Some(AttributionBundle {
        top_features,
        overall_impact,
        sample_size: indices.len(),
        aircraft_class: class,
        explanation_text,
    })
}
