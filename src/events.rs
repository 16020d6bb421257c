//! Event Extractor (C6): turns a prediction vector into an ordered list
//! of anomaly events, describing each flagged row with the class's rule
//! set.

use crate::aircraft::AircraftClass;
use crate::config::PipelineConfig;
use crate::frame::TabularFrame;

/// Severity bucket for a single anomaly event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Critical,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Critical => "CRITICAL",
            Self::Warning => "WARNING",
        })
    }
}

/// A single row-level anomaly, described in human-readable text.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnomalyEvent {
    pub timestamp: f64,
    pub risk_score: f64,
    pub severity: Severity,
    pub description: String,
    pub aircraft_specific: bool,
    pub aircraft_class: AircraftClass,
}

const DEFAULT_DESCRIPTION: &str = "Flight parameter anomaly detected";

fn row_timestamp(frame: &TabularFrame, config: &PipelineConfig, idx: usize) -> f64 {
    if let Some(ts) = frame.timestamps() {
        if let Some(&v) = ts.get(idx) {
            return v;
        }
    }
    idx as f64 * config.seconds_per_row()
}

fn fixed_wing_rules(frame: &TabularFrame, idx: usize) -> Vec<&'static str> {
    let mut hits = Vec::new();
    let airspeed = frame.value_at("airspeed", idx);
    let motor_rpm = frame.value_at("motor_rpm", idx);
    let elevator = frame.value_at("elevator_position", idx);
    let aoa = frame.value_at("angle_of_attack", idx);
    let battery = frame.value_at("battery_voltage", idx);

    if airspeed < 12.0 {
        hits.push("CRITICAL: Airspeed below stall speed");
    }
    if airspeed > 45.0 {
        hits.push("WARNING: Airspeed exceeds safe limits");
    }
    if motor_rpm < 1000.0 {
        hits.push("CRITICAL: Engine failure or shutdown");
    }
    if motor_rpm > 8000.0 {
        hits.push("WARNING: Engine overspeed");
    }
    if elevator.abs() > 25.0 {
        hits.push("WARNING: Extreme elevator deflection");
    }
    if aoa > 20.0 {
        hits.push("CRITICAL: High angle of attack — stall risk");
    }
    if battery < 10.0 {
        hits.push("CRITICAL: Battery voltage critically low");
    }
    hits
}

fn multirotor_rules(frame: &TabularFrame, idx: usize) -> Vec<&'static str> {
    let mut hits = Vec::new();
    let motor_cols = [
        "motor_1_rpm",
        "motor_2_rpm",
        "motor_3_rpm",
        "motor_4_rpm",
        "motor_5_rpm",
        "motor_6_rpm",
    ];
    let rpms: Vec<f64> = motor_cols.iter().map(|c| frame.value_at(c, idx)).collect();
    let operational = rpms.iter().filter(|&&v| v > 500.0).count();
    if operational < 4 {
        hits.push("CRITICAL: Insufficient motors operational");
    }

    let active: Vec<f64> = rpms.iter().copied().filter(|&v| v > 500.0).collect();
    if active.len() >= 2 {
        let mean = active.iter().sum::<f64>() / active.len() as f64;
        let variance = active.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / active.len() as f64;
        if variance.sqrt() > 1000.0 {
            hits.push("WARNING: Severe motor RPM asymmetry");
        }
    }

    let pitch = frame.value_at("pitch_angle", idx);
    let roll = frame.value_at("roll_angle", idx);
    if pitch.abs() > 30.0 || roll.abs() > 30.0 {
        hits.push("WARNING: Extreme aircraft attitude");
    }

    let vib = ["vibration_x", "vibration_y", "vibration_z", "vibration_w"]
        .iter()
        .map(|c| frame.value_at(c, idx).powi(2))
        .sum::<f64>()
        .sqrt();
    if vib > 10.0 {
        hits.push("WARNING: Excessive vibration detected");
    }

    let battery = frame.value_at("battery_voltage", idx);
    if battery < 10.5 {
        hits.push("CRITICAL: Battery voltage critically low");
    }
    hits
}

fn vtol_rules(frame: &TabularFrame, idx: usize) -> Vec<&'static str> {
    let mut hits = Vec::new();
    let lift_cols = ["motor_1_rpm", "motor_2_rpm", "motor_3_rpm", "motor_4_rpm"];
    let operational = lift_cols.iter().filter(|c| frame.value_at(c, idx) > 500.0).count();
    if operational < 4 {
        hits.push("CRITICAL: Lift motor failure — vertical flight compromised");
    }

    let airspeed = frame.value_at("airspeed", idx);
    let motor5 = frame.value_at("motor_5_rpm", idx);
    if airspeed > 15.0 && motor5 < 1000.0 {
        hits.push("CRITICAL: Forward motor failure during cruise flight");
    }

    let transition_mode = frame.value_at("transition_mode", idx);
    if (transition_mode - 1.0).abs() < f64::EPSILON && (airspeed < 8.0 || airspeed > 35.0) {
        hits.push("WARNING: Unsafe transition airspeed");
    }
    hits
}

fn rules_for(class: AircraftClass, frame: &TabularFrame, idx: usize) -> Vec<&'static str> {
    match class.or_multirotor_fallback() {
        AircraftClass::FixedWing => fixed_wing_rules(frame, idx),
        AircraftClass::Multirotor => multirotor_rules(frame, idx),
        AircraftClass::Vtol => vtol_rules(frame, idx),
        AircraftClass::Unknown => unreachable!("or_multirotor_fallback never returns Unknown"),
    }
}

/// `extract(frame, prediction, class) -> events[]` (§4.6). Events are
/// sorted descending by `risk_score`; ties preserve original row order
/// (§5 ordering guarantee), which a stable sort gives for free.
#[must_use]
pub fn extract(
    frame: &TabularFrame,
    prediction: &[f64],
    class: AircraftClass,
    config: &PipelineConfig,
) -> Vec<AnomalyEvent> {
    let mut events: Vec<AnomalyEvent> = prediction
        .iter()
        .enumerate()
        .filter(|&(_, &p)| p > config.event_probability_threshold)
        .map(|(idx, &p)| {
            let hits = rules_for(class, frame, idx);
            let description = if hits.is_empty() {
                DEFAULT_DESCRIPTION.to_string()
            } else {
                hits.join("; ")
            };
            AnomalyEvent {
                timestamp: row_timestamp(frame, config, idx),
                risk_score: p,
                severity: if p > config.severity_critical_threshold {
                    Severity::Critical
                } else {
                    Severity::Warning
                },
                description,
                aircraft_specific: true,
                aircraft_class: class,
            }
        })
        .collect();

    events.sort_by(|a, b| b.risk_score.partial_cmp(&a.risk_score).unwrap_or(std::cmp::Ordering::Equal));
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(cols: Vec<(&str, Vec<f64>)>) -> TabularFrame {
        TabularFrame::new(cols.into_iter().map(|(k, v)| (k.to_string(), v)))
    }

    #[test]
    fn below_threshold_produces_no_events() {
        let frame = frame_with(vec![("airspeed", vec![25.0, 25.0])]);
        let config = PipelineConfig::default();
        let events = extract(&frame, &[0.3, 0.5], AircraftClass::FixedWing, &config);
        assert!(events.is_empty());
    }

    #[test]
    fn stall_row_produces_critical_event_with_description() {
        let frame = frame_with(vec![("airspeed", vec![9.0]), ("angle_of_attack", vec![25.0])]);
        let config = PipelineConfig::default();
        let events = extract(&frame, &[0.95], AircraftClass::FixedWing, &config);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, Severity::Critical);
        assert!(events[0].description.contains("Airspeed below stall speed"));
    }

    #[test]
    fn no_matching_rule_uses_default_description() {
        let frame = frame_with(vec![("airspeed", vec![25.0])]);
        let config = PipelineConfig::default();
        let events = extract(&frame, &[0.8], AircraftClass::FixedWing, &config);
        assert_eq!(events[0].description, DEFAULT_DESCRIPTION);
    }

    #[test]
    fn events_sorted_descending_by_risk_score() {
        let frame = frame_with(vec![("airspeed", vec![9.0, 9.0, 9.0])]);
        let config = PipelineConfig::default();
        let events = extract(&frame, &[0.75, 0.95, 0.8], AircraftClass::FixedWing, &config);
        let scores: Vec<f64> = events.iter().map(|e| e.risk_score).collect();
        assert_eq!(scores, vec![0.95, 0.8, 0.75]);
    }

    #[test]
    fn insufficient_motors_detected_for_multirotor() {
        let frame = frame_with(vec![
            ("motor_1_rpm", vec![3000.0]),
            ("motor_2_rpm", vec![3000.0]),
            ("motor_3_rpm", vec![200.0]),
            ("motor_4_rpm", vec![200.0]),
        ]);
        let config = PipelineConfig::default();
        let events = extract(&frame, &[0.9], AircraftClass::Multirotor, &config);
        assert!(events[0].description.contains("Insufficient motors operational"));
    }

    #[test]
    fn four_operational_motors_across_full_bank_is_not_insufficient() {
        let frame = frame_with(vec![
            ("motor_1_rpm", vec![3000.0]),
            ("motor_2_rpm", vec![3000.0]),
            ("motor_3_rpm", vec![3000.0]),
            ("motor_4_rpm", vec![200.0]),
            ("motor_5_rpm", vec![3000.0]),
        ]);
        let config = PipelineConfig::default();
        let events = extract(&frame, &[0.9], AircraftClass::Multirotor, &config);
        assert!(!events[0].description.contains("Insufficient motors operational"));
    }
}
