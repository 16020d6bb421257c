//! Feature Schemas (C2): per-class ordered feature lists.
//!
//! Ordering is load-bearing — a trained model's column order must match
//! inference exactly, so these lists are plain `&'static [&'static str]`
//! slices consumed in order by the trainer, the model, and attribution.

use crate::aircraft::AircraftClass;

const FIXED_WING: &[&str] = &[
    "altitude",
    "battery_voltage",
    "motor_rpm",
    "airspeed",
    "ground_speed",
    "throttle_position",
    "elevator_position",
    "rudder_position",
    "aileron_position",
    "pitch_angle",
    "roll_angle",
    "yaw_rate",
    "gps_hdop",
    "temperature",
    "wind_speed",
    "angle_of_attack",
];

const MULTIROTOR: &[&str] = &[
    "altitude",
    "battery_voltage",
    "motor_1_rpm",
    "motor_2_rpm",
    "motor_3_rpm",
    "motor_4_rpm",
    "vibration_x",
    "vibration_y",
    "vibration_z",
    "vibration_w",
    "pitch_angle",
    "roll_angle",
    "speed",
    "temperature",
    "gps_hdop",
];

const VTOL: &[&str] = &[
    "altitude",
    "battery_voltage",
    "motor_1_rpm",
    "motor_2_rpm",
    "motor_3_rpm",
    "motor_4_rpm",
    "motor_5_rpm",
    "airspeed",
    "elevator_position",
    "aileron_position",
    "gps_hdop",
    "vibration_x",
    "vibration_y",
    "vibration_z",
    "vibration_w",
    "temperature",
    "transition_mode",
    "pitch_angle",
    "roll_angle",
];

/// The ordered feature list consumed by `class`'s anomaly model.
/// `feature_set(Unknown) == feature_set(Multirotor)`.
#[must_use]
pub fn feature_set(class: AircraftClass) -> &'static [&'static str] {
    match class.or_multirotor_fallback() {
        AircraftClass::FixedWing => FIXED_WING,
        AircraftClass::Multirotor => MULTIROTOR,
        AircraftClass::Vtol => VTOL,
        AircraftClass::Unknown => unreachable!("or_multirotor_fallback never returns Unknown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_match_spec() {
        assert_eq!(feature_set(AircraftClass::FixedWing).len(), 16);
        assert_eq!(feature_set(AircraftClass::Multirotor).len(), 15);
        assert_eq!(feature_set(AircraftClass::Vtol).len(), 19);
    }

    #[test]
    fn unknown_aliases_multirotor() {
        assert_eq!(
            feature_set(AircraftClass::Unknown),
            feature_set(AircraftClass::Multirotor)
        );
    }

    #[test]
    fn lists_have_no_duplicate_columns() {
        for class in [
            AircraftClass::FixedWing,
            AircraftClass::Multirotor,
            AircraftClass::Vtol,
        ] {
            let cols = feature_set(class);
            let mut sorted = cols.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), cols.len(), "{class} has duplicate columns");
        }
    }
}
