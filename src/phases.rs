//! Flight-phase and performance-metric calculators (§4.8), class-specific
//! design-level statistics computed from a frame after classification.
//!
//! The 0.1s/row time factor is a design constant assuming a 10Hz sample
//! rate (§4.8, §9); when the frame carries a non-degenerate timestamp
//! column (strictly increasing, at least two distinct values) duration
//! calculations prefer the actual elapsed time between flagged rows
//! instead (SPEC_FULL.md open question #3).

use std::collections::BTreeMap;

use crate::aircraft::AircraftClass;
use crate::config::PipelineConfig;
use crate::frame::TabularFrame;

/// Named bag of phase durations, in the units implied by their key
/// (seconds unless named `_min`).
pub type PhaseStats = BTreeMap<String, f64>;
/// Named bag of performance metrics; values are either numeric or a
/// short categorical label, so both are carried as strings after
/// formatting.
pub type PerformanceMetrics = BTreeMap<String, String>;

fn has_usable_timestamps(frame: &TabularFrame) -> bool {
    let Some(ts) = frame.timestamps() else { return false };
    if ts.len() < 2 {
        return false;
    }
    let strictly_increasing = ts.windows(2).all(|w| w[1] > w[0]);
    let distinct = ts.iter().any(|&v| (v - ts[0]).abs() > f64::EPSILON);
    strictly_increasing && distinct
}

/// Seconds represented by the rows at indices `true` in `mask`, preferring
/// real timestamp deltas when available.
fn duration_seconds(frame: &TabularFrame, config: &PipelineConfig, mask: &[bool]) -> f64 {
    if has_usable_timestamps(frame) {
        let ts = frame.timestamps().expect("checked by has_usable_timestamps");
        let mut total = 0.0;
        for i in 0..mask.len() {
            if mask[i] {
                let dt = if i + 1 < ts.len() { ts[i + 1] - ts[i] } else if i > 0 { ts[i] - ts[i - 1] } else { config.seconds_per_row() };
                total += dt.max(0.0);
            }
        }
        total
    } else {
        mask.iter().filter(|&&m| m).count() as f64 * config.seconds_per_row()
    }
}

fn row_count(frame: &TabularFrame, mask_fn: impl Fn(usize) -> bool) -> Vec<bool> {
    (0..frame.len()).map(mask_fn).collect()
}

fn fixed_wing_phases(frame: &TabularFrame, config: &PipelineConfig) -> PhaseStats {
    let altitude_diff = frame.diff("altitude");
    let airspeed = frame.get("airspeed");
    let rolling_std_alt = frame.rolling_std("altitude", 20);

    let takeoff_mask = row_count(frame, |i| altitude_diff[i] > 1.0 && airspeed[i] > 15.0);
    let cruise_mask = row_count(frame, |i| rolling_std_alt[i] < 3.0 && airspeed[i] > 20.0);
    let approach_mask = row_count(frame, |i| altitude_diff[i] < -1.0 && airspeed[i] < 30.0);

    let mut stats = PhaseStats::new();
    stats.insert("takeoff_duration".to_string(), duration_seconds(frame, config, &takeoff_mask));
    stats.insert("cruise_duration".to_string(), duration_seconds(frame, config, &cruise_mask) / 60.0);
    stats.insert("approach_duration".to_string(), duration_seconds(frame, config, &approach_mask));
    stats
}

fn multirotor_phases(frame: &TabularFrame, config: &PipelineConfig) -> PhaseStats {
    let speed = frame.get("speed");
    let altitude_diff = frame.diff("altitude");
    let pitch = frame.get("pitch_angle");
    let roll = frame.get("roll_angle");

    let hover_mask = row_count(frame, |i| speed[i] < 2.0 && altitude_diff[i].abs() < 2.0);
    let forward_mask = row_count(frame, |i| speed[i] > 5.0);
    let aggressive_mask = row_count(frame, |i| pitch[i].abs() > 15.0 || roll[i].abs() > 15.0);

    let mut stats = PhaseStats::new();
    stats.insert("hover_time".to_string(), duration_seconds(frame, config, &hover_mask));
    stats.insert("forward_flight_time".to_string(), duration_seconds(frame, config, &forward_mask));
    stats.insert("aggressive_maneuvers".to_string(), duration_seconds(frame, config, &aggressive_mask));
    stats
}

fn vtol_phases(frame: &TabularFrame, config: &PipelineConfig) -> PhaseStats {
    let mut stats = multirotor_phases(frame, config);
    let transition_mode = frame.get("transition_mode");
    let transition_mask = row_count(frame, |i| (transition_mode[i] - 1.0).abs() < f64::EPSILON);
    stats.insert("transition_time".to_string(), duration_seconds(frame, config, &transition_mask));
    stats
}

/// `phase_stats(frame, class)` (§4.8).
#[must_use]
pub fn phase_stats(frame: &TabularFrame, class: AircraftClass, config: &PipelineConfig) -> PhaseStats {
    if frame.is_empty() {
        return PhaseStats::new();
    }
    match class.or_multirotor_fallback() {
        AircraftClass::FixedWing => fixed_wing_phases(frame, config),
        AircraftClass::Multirotor => multirotor_phases(frame, config),
        AircraftClass::Vtol => vtol_phases(frame, config),
        AircraftClass::Unknown => unreachable!("or_multirotor_fallback never returns Unknown"),
    }
}

fn motor_symmetry_metric(frame: &TabularFrame, cols: &[&str]) -> f64 {
    let means: Vec<f64> = cols.iter().filter(|c| frame.has_column(c)).map(|c| frame.mean(c)).collect();
    if means.len() < 2 {
        return 1.0;
    }
    let mean_of_means = means.iter().sum::<f64>() / means.len() as f64;
    if mean_of_means.abs() < f64::EPSILON {
        return 0.0;
    }
    let variance = means.iter().map(|m| (m - mean_of_means).powi(2)).sum::<f64>() / means.len() as f64;
    (1.0 - variance.sqrt() / mean_of_means).max(0.0)
}

fn battery_consumption_metric(frame: &TabularFrame) -> f64 {
    let v = frame.get("battery_voltage");
    if v.is_empty() {
        return 0.0;
    }
    (v[0] - v[v.len() - 1]).max(0.0)
}

fn fixed_wing_performance(frame: &TabularFrame) -> PerformanceMetrics {
    let mut m = PerformanceMetrics::new();
    m.insert("average_airspeed".to_string(), format!("{:.2}", frame.mean("airspeed")));
    m.insert("max_airspeed".to_string(), format!("{:.2}", frame.max("airspeed")));
    m.insert(
        "engine_performance".to_string(),
        if frame.mean("motor_rpm") > 1000.0 { "Normal".to_string() } else { "Below Normal".to_string() },
    );
    m.insert("average_throttle".to_string(), format!("{:.2}", frame.mean("throttle_position")));
    m.insert("battery_consumption".to_string(), format!("{:.2}", battery_consumption_metric(frame)));
    m
}

fn multirotor_performance(frame: &TabularFrame) -> PerformanceMetrics {
    let mut m = PerformanceMetrics::new();
    let cols = ["motor_1_rpm", "motor_2_rpm", "motor_3_rpm", "motor_4_rpm"];
    m.insert("motor_symmetry".to_string(), format!("{:.3}", motor_symmetry_metric(frame, &cols)));
    m.insert("battery_consumption".to_string(), format!("{:.2}", battery_consumption_metric(frame)));
    let vib = ["vibration_x", "vibration_y", "vibration_z", "vibration_w"]
        .iter()
        .map(|c| frame.mean(c))
        .sum::<f64>()
        / 4.0;
    m.insert("average_vibration".to_string(), format!("{vib:.3}"));
    m
}

fn vtol_performance(frame: &TabularFrame) -> PerformanceMetrics {
    let mut m = multirotor_performance(frame);
    let transition_mode = frame.get("transition_mode");
    let transition_rows = transition_mode.iter().filter(|&&v| (v - 1.0).abs() < f64::EPSILON).count();
    let efficiency = if frame.is_empty() { 0.0 } else { 1.0 - transition_rows as f64 / frame.len() as f64 };
    m.insert("transition_efficiency".to_string(), format!("{efficiency:.3}"));
    m
}

/// `perf_metrics(frame, class)` (§4.8).
#[must_use]
pub fn perf_metrics(frame: &TabularFrame, class: AircraftClass) -> PerformanceMetrics {
    if frame.is_empty() {
        return PerformanceMetrics::new();
    }
    match class.or_multirotor_fallback() {
        AircraftClass::FixedWing => fixed_wing_performance(frame),
        AircraftClass::Multirotor => multirotor_performance(frame),
        AircraftClass::Vtol => vtol_performance(frame),
        AircraftClass::Unknown => unreachable!("or_multirotor_fallback never returns Unknown"),
    }
}
