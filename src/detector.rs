//! Class Detector (C5): assigns an `AircraftClass` and confidence to a
//! frame from heuristic feature summaries.
//!
//! Every public entry point degrades gracefully rather than raising —
//! `detect` never panics on ragged or empty input, returning
//! `(Unknown, 0.0)` instead (§4.5, §7: "C5 ... never raises").

use crate::aircraft::AircraftClass;
use crate::config::PipelineConfig;
use crate::frame::TabularFrame;

const MOTOR_COLUMNS: &[&str] = &[
    "motor_rpm",
    "motor_1_rpm",
    "motor_2_rpm",
    "motor_3_rpm",
    "motor_4_rpm",
    "motor_5_rpm",
];

const CONTROL_SURFACES: &[&str] = &["elevator_position", "aileron_position", "rudder_position", "throttle_position"];

/// Intermediate feature summary computed once per `detect` call and fed
/// into every class's scoring function, so the three scorers read from
/// one consistent snapshot of the frame.
#[derive(Debug, Clone, Default)]
struct DetectionFeatures {
    active_motors: usize,
    motor_symmetry: f64,
    hover_ratio: f64,
    cruise_ratio: f64,
    vertical_transitions: f64,
    transition_events: usize,
    has_elevator: bool,
    has_aileron: bool,
    has_rudder: bool,
    has_throttle: bool,
    avg_speed: f64,
}

fn motor_analysis(frame: &TabularFrame) -> (usize, f64) {
    let mut active_means = Vec::new();
    for col in MOTOR_COLUMNS {
        if frame.has_column(col) && frame.mean(col) > 500.0 {
            active_means.push(frame.mean(col));
        }
    }
    let active_motors = active_means.len();
    if active_motors < 2 {
        return (active_motors, 0.0);
    }
    let mean_of_means = active_means.iter().sum::<f64>() / active_motors as f64;
    let variance = active_means
        .iter()
        .map(|m| (m - mean_of_means).powi(2))
        .sum::<f64>()
        / active_motors as f64;
    let std = variance.sqrt();
    let symmetry = if mean_of_means.abs() < f64::EPSILON {
        0.0
    } else {
        (1.0 - std / mean_of_means).max(0.0)
    };
    (active_motors, symmetry)
}

fn flight_pattern_analysis(frame: &TabularFrame) -> (f64, f64, f64, usize) {
    let n = frame.len();
    if n == 0 {
        return (0.0, 0.0, 0.0, 0);
    }
    let speed = frame.get("speed");
    let altitude = frame.get("altitude");
    let altitude_diff = frame.diff("altitude");
    let rolling_std_alt = frame.rolling_std("altitude", 10);

    let hover = frame.count_where(|i| speed[i] < 2.0 && altitude_diff[i].abs() < 2.0);
    let cruise = frame.count_where(|i| speed[i] > 10.0 && rolling_std_alt[i] < 5.0);
    let vertical = frame.count_where(|i| altitude_diff[i].abs() > 5.0);

    let mut transition_events = 0;
    if n > 15 {
        for i in 10..n.saturating_sub(5) {
            if (altitude[i + 5] - altitude[i]).abs() > 20.0 && (speed[i + 5] - speed[i]).abs() > 5.0 {
                transition_events += 1;
            }
        }
    }

    (
        hover as f64 / n as f64,
        cruise as f64 / n as f64,
        vertical as f64 / n as f64,
        transition_events,
    )
}

fn has_variance_surface(frame: &TabularFrame, col: &str) -> bool {
    frame.has_column(col) && frame.var(col) > 1.0
}

fn speed_analysis(frame: &TabularFrame) -> f64 {
    if !frame.has_column("speed") {
        return 0.0;
    }
    frame.mean("speed")
}

fn compute_features(frame: &TabularFrame) -> DetectionFeatures {
    let (active_motors, motor_symmetry) = motor_analysis(frame);
    let (hover_ratio, cruise_ratio, vertical_transitions, transition_events) = flight_pattern_analysis(frame);

    DetectionFeatures {
        active_motors,
        motor_symmetry,
        hover_ratio,
        cruise_ratio,
        vertical_transitions,
        transition_events,
        has_elevator: has_variance_surface(frame, "elevator_position"),
        has_aileron: has_variance_surface(frame, "aileron_position"),
        has_rudder: has_variance_surface(frame, "rudder_position"),
        has_throttle: has_variance_surface(frame, "throttle_position"),
        avg_speed: speed_analysis(frame),
    }
}

fn fixed_wing_score(f: &DetectionFeatures) -> f64 {
    let mut score = 0.0;
    if f.active_motors == 1 {
        score += 0.3;
    }
    if f.has_elevator || f.has_aileron {
        score += 0.2;
    }
    if f.cruise_ratio > 0.6 {
        score += 0.2;
    }
    if f.avg_speed > 15.0 {
        score += 0.2;
    }
    if f.vertical_transitions < 0.2 {
        score += 0.1;
    }
    score.min(1.0)
}

fn multirotor_score(f: &DetectionFeatures) -> f64 {
    let mut score = 0.0;
    if f.active_motors >= 4 {
        score += 0.3;
    }
    if f.hover_ratio > 0.3 {
        score += 0.2;
    }
    if f.vertical_transitions > 0.4 {
        score += 0.2;
    }
    if f.avg_speed < 15.0 {
        score += 0.1;
    }
    if f.motor_symmetry > 0.7 {
        score += 0.2;
    }
    score.min(1.0)
}

fn vtol_score(f: &DetectionFeatures) -> f64 {
    let mut score = 0.0;
    if f.active_motors >= 5 {
        score += 0.2;
    }
    if f.hover_ratio > 0.2 && f.cruise_ratio > 0.3 {
        score += 0.3;
    }
    if f.has_elevator && f.active_motors >= 4 {
        score += 0.2;
    }
    if f.transition_events > 0 {
        score += 0.3;
    }
    score.min(1.0)
}

/// Per-class scores behind `detect`, exposed for diagnostics/tests — not
/// part of the public pipeline contract (§6 only names `detect`).
#[derive(Debug, Clone, Copy)]
pub struct ClassScores {
    pub fixed_wing: f64,
    pub multirotor: f64,
    pub vtol: f64,
}

/// `detect(frame) -> (class, confidence)` (§4.5). Never panics; any
/// internal arithmetic anomaly (e.g. all-zero/all-NaN frame) simply
/// produces low scores and the result falls through to `Unknown`.
#[must_use]
pub fn detect(frame: &TabularFrame, config: &PipelineConfig) -> (AircraftClass, f64) {
    let (class, confidence, _) = detect_with_scores(frame, config);
    (class, confidence)
}

/// Same as `detect`, additionally returning the raw per-class scores
/// used for the tie-break and threshold decision (useful for tests that
/// check monotonicity, P6).
#[must_use]
pub fn detect_with_scores(frame: &TabularFrame, config: &PipelineConfig) -> (AircraftClass, f64, ClassScores) {
    if frame.is_empty() {
        return (AircraftClass::Unknown, 0.0, ClassScores { fixed_wing: 0.0, multirotor: 0.0, vtol: 0.0 });
    }

    let features = compute_features(frame);
    let scores = ClassScores {
        fixed_wing: fixed_wing_score(&features),
        multirotor: multirotor_score(&features),
        vtol: vtol_score(&features),
    };

    // Tie-break order documented as arbitrary (§4.5): FixedWing > Multirotor > VTOL.
    let candidates = [
        (AircraftClass::FixedWing, scores.fixed_wing),
        (AircraftClass::Multirotor, scores.multirotor),
        (AircraftClass::Vtol, scores.vtol),
    ];
    let (winner, winning_score) = candidates
        .into_iter()
        .fold((AircraftClass::FixedWing, f64::MIN), |best, candidate| {
            if candidate.1 > best.1 {
                candidate
            } else {
                best
            }
        });

    if winning_score < config.class_detection_confidence {
        (AircraftClass::Unknown, winning_score, scores)
    } else {
        (winner, winning_score, scores)
    }
}
