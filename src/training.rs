//! Synthetic Trainer (C3): deterministic generator of labeled training
//! frames per class.
//!
//! Each class draws its normal rows from one set of documented
//! distributions and its anomaly rows from a distribution mix that
//! over-samples tails and specific failure modes (motor RPM collapse,
//! stall airspeed, excess vibration, ...). Parameters are fixed at
//! release, versioned here as plain constants rather than external data.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Gamma, Normal, Uniform};

use crate::aircraft::AircraftClass;
use crate::error::{PipelineError, PipelineResult};
use crate::frame::TabularFrame;

/// Labeled synthetic training data: a frame and a parallel 0/1 label
/// vector (1 = anomaly).
pub struct TrainingSet {
    pub frame: TabularFrame,
    pub labels: Vec<f64>,
}

impl TrainingSet {
    /// Split into (train, test) by index, 80/20, preserving row order
    /// within each half (no shuffling — the frame's row order already
    /// groups normal rows before anomaly rows, and both halves should
    /// see a representative mix, so we interleave by stride instead of
    /// slicing the tail).
    #[must_use]
    pub fn train_test_split(&self) -> (TrainingSet, TrainingSet) {
        let n = self.labels.len();
        let mut train_idx = Vec::with_capacity(n * 4 / 5 + 1);
        let mut test_idx = Vec::with_capacity(n / 5 + 1);
        for i in 0..n {
            if i % 5 == 0 {
                test_idx.push(i);
            } else {
                train_idx.push(i);
            }
        }
        (self.subset(&train_idx), self.subset(&test_idx))
    }

    fn subset(&self, idx: &[usize]) -> TrainingSet {
        TrainingSet {
            frame: self.frame.select_rows(idx),
            labels: idx.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// Draws `n` samples from a normal distribution, deterministic under `rng`.
fn normal(rng: &mut StdRng, mean: f64, std: f64, n: usize) -> Vec<f64> {
    let d = Normal::new(mean, std.max(1e-9)).expect("finite normal params");
    (0..n).map(|_| d.sample(rng)).collect()
}

fn uniform(rng: &mut StdRng, lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let d = Uniform::new(lo, hi + 1e-9);
    (0..n).map(|_| d.sample(rng)).collect()
}

fn gamma(rng: &mut StdRng, shape: f64, scale: f64, n: usize) -> Vec<f64> {
    let d = Gamma::new(shape, scale).expect("finite gamma params");
    (0..n).map(|_| d.sample(rng)).collect()
}

fn bernoulli_choice(rng: &mut StdRng, p_one: f64, n: usize) -> Vec<f64> {
    let d = Uniform::new(0.0_f64, 1.0);
    (0..n)
        .map(|_| if d.sample(rng) < p_one { 1.0 } else { 0.0 })
        .collect()
}

/// Concatenate distribution segments to exactly `n` rows. The source
/// system splits anomaly counts into thirds/quarters with integer
/// division and trusts the remainder to fall into the last segment;
/// here we build each segment at its requested length and then
/// pad-or-trim the concatenation to `n` explicitly so a rounding
/// mismatch can never produce a short or ragged column (Design Notes).
fn concat_to_len(mut segments: Vec<Vec<f64>>, n: usize) -> Vec<f64> {
    let mut out: Vec<f64> = segments.drain(..).flatten().collect();
    out.resize(n, *out.last().unwrap_or(&0.0));
    out.truncate(n);
    out
}

/// Generate `(features_frame, labels)` for `class` with `n_samples` total
/// rows, 80% normal / 20% anomaly, using a fixed seed for reproducibility.
///
/// # Errors
/// Returns `PipelineError::InvalidInput` if `n_samples < 10` or `class`
/// is not one of the three concrete classes.
pub fn generate(class: AircraftClass, n_samples: usize, seed: u64) -> PipelineResult<TrainingSet> {
    if n_samples < 10 {
        return Err(PipelineError::InvalidInput(format!(
            "training set size {n_samples} is below the minimum of 10"
        )));
    }
    if class == AircraftClass::Unknown {
        return Err(PipelineError::InvalidInput(
            "cannot synthesize training data for Unknown".to_string(),
        ));
    }

    let n_normal = (n_samples as f64 * 0.8) as usize;
    let n_anomaly = n_samples - n_normal;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut columns: Vec<(String, Vec<f64>)> = match class {
        AircraftClass::FixedWing => fixed_wing_columns(&mut rng, n_normal, n_anomaly),
        AircraftClass::Multirotor => multirotor_columns(&mut rng, n_normal, n_anomaly),
        AircraftClass::Vtol => vtol_columns(&mut rng, n_normal, n_anomaly),
        AircraftClass::Unknown => unreachable!("rejected above"),
    };

    for (_, col) in &mut columns {
        col.resize(n_samples, 0.0);
    }

    let mut labels = vec![0.0; n_normal];
    labels.extend(std::iter::repeat(1.0).take(n_anomaly));

    Ok(TrainingSet {
        frame: TabularFrame::new(columns),
        labels,
    })
}

fn combine(name: &str, normal: Vec<f64>, anomaly: Vec<f64>) -> (String, Vec<f64>) {
    let mut v = normal;
    v.extend(anomaly);
    (name.to_string(), v)
}

fn thirds(n: usize) -> (usize, usize, usize) {
    let a = n / 3;
    let b = n / 3;
    let c = n - a - b;
    (a, b, c)
}

fn quarters(n: usize) -> (usize, usize, usize) {
    let a = n / 4;
    let b = n / 4;
    let c = n - 2 * a;
    (a, b, c)
}

fn halves(n: usize) -> (usize, usize) {
    let a = n / 2;
    (a, n - a)
}

fn fixed_wing_columns(rng: &mut StdRng, n_normal: usize, n_anomaly: usize) -> Vec<(String, Vec<f64>)> {
    let (a4, b4, c4) = thirds(n_anomaly);
    let altitude_anom = concat_to_len(
        vec![
            uniform(rng, -10.0, 5.0, n_anomaly / 4),
            uniform(rng, 600.0, 1000.0, n_anomaly / 4),
            normal(rng, 100.0, 50.0, n_anomaly - 2 * (n_anomaly / 4)),
        ],
        n_anomaly,
    );
    let (bv_a, bv_b) = halves(n_anomaly);
    let battery_anom = concat_to_len(
        vec![uniform(rng, 8.0, 10.0, bv_a), uniform(rng, 13.0, 15.0, bv_b)],
        n_anomaly,
    );
    let motor_anom = concat_to_len(
        vec![
            uniform(rng, 0.0, 1000.0, a4),
            uniform(rng, 8000.0, 12000.0, b4),
            normal(rng, 5000.0, 1000.0, c4),
        ],
        n_anomaly,
    );
    let airspeed_anom = concat_to_len(
        vec![
            uniform(rng, 0.0, 12.0, a4),
            uniform(rng, 50.0, 80.0, b4),
            normal(rng, 25.0, 10.0, c4),
        ],
        n_anomaly,
    );

    vec![
        combine("altitude", uniform(rng, 50.0, 500.0, n_normal), altitude_anom),
        combine(
            "battery_voltage",
            normal(rng, 11.1, 0.2, n_normal),
            battery_anom,
        ),
        combine("motor_rpm", normal(rng, 5000.0, 300.0, n_normal), motor_anom),
        combine("airspeed", normal(rng, 25.0, 3.0, n_normal), airspeed_anom),
        combine(
            "ground_speed",
            normal(rng, 23.0, 4.0, n_normal),
            normal(rng, 23.0, 8.0, n_anomaly),
        ),
        combine(
            "throttle_position",
            normal(rng, 75.0, 10.0, n_normal),
            uniform(rng, 0.0, 100.0, n_anomaly),
        ),
        combine(
            "elevator_position",
            normal(rng, 0.0, 2.0, n_normal),
            uniform(rng, -30.0, 30.0, n_anomaly),
        ),
        combine(
            "rudder_position",
            normal(rng, 0.0, 2.0, n_normal),
            uniform(rng, -30.0, 30.0, n_anomaly),
        ),
        combine(
            "aileron_position",
            normal(rng, 0.0, 3.0, n_normal),
            uniform(rng, -30.0, 30.0, n_anomaly),
        ),
        combine(
            "pitch_angle",
            normal(rng, 5.0, 3.0, n_normal),
            uniform(rng, -30.0, 30.0, n_anomaly),
        ),
        combine(
            "roll_angle",
            normal(rng, 0.0, 5.0, n_normal),
            uniform(rng, -45.0, 45.0, n_anomaly),
        ),
        combine(
            "yaw_rate",
            normal(rng, 0.0, 2.0, n_normal),
            uniform(rng, -20.0, 20.0, n_anomaly),
        ),
        combine(
            "gps_hdop",
            gamma(rng, 2.0, 0.5, n_normal),
            gamma(rng, 5.0, 1.0, n_anomaly),
        ),
        combine(
            "temperature",
            normal(rng, 25.0, 8.0, n_normal),
            normal(rng, 35.0, 10.0, n_anomaly),
        ),
        combine(
            "wind_speed",
            gamma(rng, 2.0, 2.0, n_normal),
            gamma(rng, 5.0, 3.0, n_anomaly),
        ),
        combine(
            "angle_of_attack",
            normal(rng, 5.0, 2.0, n_normal),
            uniform(rng, 15.0, 45.0, n_anomaly),
        ),
    ]
}

fn multirotor_columns(rng: &mut StdRng, n_normal: usize, n_anomaly: usize) -> Vec<(String, Vec<f64>)> {
    let base_rpm = 3000.0;
    let (a4, b4, c4) = quarters(n_anomaly);
    let motor1_anom = concat_to_len(
        vec![
            uniform(rng, 0.0, 1000.0, a4),
            uniform(rng, 5500.0, 8000.0, b4),
            normal(rng, base_rpm, 1000.0, c4),
        ],
        n_anomaly,
    );
    let (bv_a, bv_b) = halves(n_anomaly);
    let battery_anom = concat_to_len(
        vec![
            uniform(rng, 9.0, 10.5, bv_a),
            uniform(rng, 12.5, 14.0, bv_b),
        ],
        n_anomaly,
    );
    let (t_a, t_b) = halves(n_anomaly);
    let temperature_anom = concat_to_len(
        vec![uniform(rng, -10.0, 5.0, t_a), uniform(rng, 40.0, 60.0, t_b)],
        n_anomaly,
    );

    vec![
        combine("altitude", uniform(rng, 5.0, 120.0, n_normal), uniform(rng, 0.0, 150.0, n_anomaly)),
        combine("battery_voltage", normal(rng, 11.1, 0.2, n_normal), battery_anom),
        combine("motor_1_rpm", normal(rng, base_rpm, 200.0, n_normal), motor1_anom),
        combine(
            "motor_2_rpm",
            normal(rng, base_rpm, 200.0, n_normal),
            normal(rng, base_rpm, 1500.0, n_anomaly),
        ),
        combine(
            "motor_3_rpm",
            normal(rng, base_rpm, 200.0, n_normal),
            normal(rng, base_rpm, 1500.0, n_anomaly),
        ),
        combine(
            "motor_4_rpm",
            normal(rng, base_rpm, 200.0, n_normal),
            normal(rng, base_rpm, 1500.0, n_anomaly),
        ),
        combine(
            "vibration_x",
            normal(rng, 0.0, 2.0, n_normal),
            normal(rng, 0.0, 12.0, n_anomaly),
        ),
        combine(
            "vibration_y",
            normal(rng, 0.0, 2.0, n_normal),
            normal(rng, 0.0, 12.0, n_anomaly),
        ),
        combine(
            "vibration_z",
            normal(rng, 0.0, 2.0, n_normal),
            normal(rng, 0.0, 12.0, n_anomaly),
        ),
        combine(
            "vibration_w",
            normal(rng, 0.0, 2.0, n_normal),
            normal(rng, 0.0, 12.0, n_anomaly),
        ),
        combine(
            "pitch_angle",
            normal(rng, 0.0, 10.0, n_normal),
            uniform(rng, -45.0, 45.0, n_anomaly),
        ),
        combine(
            "roll_angle",
            normal(rng, 0.0, 10.0, n_normal),
            uniform(rng, -45.0, 45.0, n_anomaly),
        ),
        combine(
            "speed",
            uniform(rng, 0.0, 12.0, n_normal),
            uniform(rng, 0.0, 30.0, n_anomaly),
        ),
        combine("temperature", normal(rng, 25.0, 5.0, n_normal), temperature_anom),
        combine(
            "gps_hdop",
            gamma(rng, 2.0, 1.0, n_normal),
            uniform(rng, 5.0, 20.0, n_anomaly),
        ),
    ]
}

fn vtol_columns(rng: &mut StdRng, n_normal: usize, n_anomaly: usize) -> Vec<(String, Vec<f64>)> {
    let fifth = n_anomaly / 5;
    let rest = n_anomaly - fifth;
    let lift_motor_anom = |rng: &mut StdRng, base: f64| {
        concat_to_len(
            vec![
                uniform(rng, 0.0, 1000.0, fifth),
                normal(rng, base, 1000.0, rest),
            ],
            n_anomaly,
        )
    };
    let (a3, b3, c3) = thirds(n_anomaly);
    let airspeed_anom = concat_to_len(
        vec![
            uniform(rng, 0.0, 8.0, a3),
            uniform(rng, 35.0, 50.0, b3),
            normal(rng, 15.0, 10.0, c3),
        ],
        n_anomaly,
    );
    let (bv_a, bv_b) = halves(n_anomaly);
    let battery_anom = concat_to_len(
        vec![uniform(rng, 18.0, 20.0, bv_a), uniform(rng, 26.0, 28.0, bv_b)],
        n_anomaly,
    );

    vec![
        combine("altitude", uniform(rng, 10.0, 300.0, n_normal), uniform(rng, 0.0, 400.0, n_anomaly)),
        combine("battery_voltage", normal(rng, 22.0, 0.8, n_normal), battery_anom),
        combine("motor_1_rpm", normal(rng, 3000.0, 200.0, n_normal), lift_motor_anom(rng, 3000.0)),
        combine("motor_2_rpm", normal(rng, 3000.0, 200.0, n_normal), lift_motor_anom(rng, 3000.0)),
        combine("motor_3_rpm", normal(rng, 3000.0, 200.0, n_normal), lift_motor_anom(rng, 3000.0)),
        combine("motor_4_rpm", normal(rng, 3000.0, 200.0, n_normal), lift_motor_anom(rng, 3000.0)),
        combine("motor_5_rpm", normal(rng, 5000.0, 300.0, n_normal), lift_motor_anom(rng, 5000.0)),
        combine("airspeed", normal(rng, 15.0, 5.0, n_normal), airspeed_anom),
        combine(
            "elevator_position",
            normal(rng, 0.0, 2.0, n_normal),
            uniform(rng, -25.0, 25.0, n_anomaly),
        ),
        combine(
            "aileron_position",
            normal(rng, 0.0, 3.0, n_normal),
            uniform(rng, -25.0, 25.0, n_anomaly),
        ),
        combine(
            "gps_hdop",
            gamma(rng, 2.0, 0.5, n_normal),
            gamma(rng, 5.0, 1.0, n_anomaly),
        ),
        combine(
            "vibration_x",
            normal(rng, 0.0, 2.0, n_normal),
            normal(rng, 0.0, 15.0, n_anomaly),
        ),
        combine(
            "vibration_y",
            normal(rng, 0.0, 2.0, n_normal),
            normal(rng, 0.0, 15.0, n_anomaly),
        ),
        combine(
            "vibration_z",
            normal(rng, 0.0, 2.0, n_normal),
            normal(rng, 0.0, 15.0, n_anomaly),
        ),
        combine(
            "vibration_w",
            normal(rng, 0.0, 2.0, n_normal),
            normal(rng, 0.0, 15.0, n_anomaly),
        ),
        combine(
            "temperature",
            normal(rng, 25.0, 8.0, n_normal),
            normal(rng, 35.0, 10.0, n_anomaly),
        ),
        combine(
            "transition_mode",
            bernoulli_choice(rng, 0.2, n_normal),
            bernoulli_choice(rng, 0.5, n_anomaly),
        ),
        combine(
            "pitch_angle",
            normal(rng, 0.0, 8.0, n_normal),
            uniform(rng, -30.0, 30.0, n_anomaly),
        ),
        combine(
            "roll_angle",
            normal(rng, 0.0, 8.0, n_normal),
            uniform(rng, -30.0, 30.0, n_anomaly),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_tiny_sample_size() {
        let err = generate(AircraftClass::Multirotor, 9, 42).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidInput);
    }

    #[test]
    fn rejects_unknown_class() {
        assert!(generate(AircraftClass::Unknown, 100, 42).is_err());
    }

    #[test]
    fn determinism_same_seed_same_frame() {
        let a = generate(AircraftClass::FixedWing, 200, 42).unwrap();
        let b = generate(AircraftClass::FixedWing, 200, 42).unwrap();
        assert_eq!(a.frame.get("airspeed"), b.frame.get("airspeed"));
        assert_eq!(a.labels, b.labels);
    }

    #[test]
    fn different_seeds_diverge() {
        let a = generate(AircraftClass::Multirotor, 200, 1).unwrap();
        let b = generate(AircraftClass::Multirotor, 200, 2).unwrap();
        assert_ne!(a.frame.get("motor_1_rpm"), b.frame.get("motor_1_rpm"));
    }

    #[test]
    fn exact_length_and_label_ratio() {
        let set = generate(AircraftClass::Vtol, 1000, 42).unwrap();
        assert_eq!(set.frame.len(), 1000);
        for name in crate::schema::feature_set(AircraftClass::Vtol) {
            assert_eq!(set.frame.get(name).len(), 1000);
        }
        let anomalies: f64 = set.labels.iter().sum();
        assert!((anomalies - 200.0).abs() < 1.0);
    }

    #[test]
    fn train_test_split_is_80_20() {
        let set = generate(AircraftClass::FixedWing, 500, 42).unwrap();
        let (train, test) = set.train_test_split();
        assert_eq!(train.labels.len() + test.labels.len(), 500);
        assert!(test.labels.len() < train.labels.len());
    }
}
