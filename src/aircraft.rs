//! Aircraft Class and Aircraft Signature: the static per-platform data
//! model shared across the detector, schemas, models, and event rules.

use serde::{Deserialize, Serialize};

/// The platform class inferred from a flight log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AircraftClass {
    FixedWing,
    Multirotor,
    Vtol,
    Unknown,
}

impl AircraftClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FixedWing => "fixed_wing",
            Self::Multirotor => "multirotor",
            Self::Vtol => "vtol",
            Self::Unknown => "unknown",
        }
    }

    /// The three concrete classes a model can be trained and scored for.
    #[must_use]
    pub const fn concrete_classes() -> [Self; 3] {
        [Self::FixedWing, Self::Multirotor, Self::Vtol]
    }

    /// Unknown falls back to Multirotor for schema/model selection
    /// (§3, §4.8) — this is the one place that substitution happens, kept
    /// explicit rather than hidden behind a default-valued map lookup.
    #[must_use]
    pub const fn or_multirotor_fallback(self) -> Self {
        match self {
            Self::Unknown => Self::Multirotor,
            other => other,
        }
    }
}

impl std::fmt::Display for AircraftClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static, per-class signature describing the platform archetype.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AircraftSignature {
    pub class: AircraftClass,
    pub motor_count: u32,
    pub has_control_surfaces: bool,
    pub vertical_takeoff_capable: bool,
    pub cruise_speed_range: (f64, f64),
    pub typical_flight_pattern: &'static str,
}

#[must_use]
pub fn signature_for(class: AircraftClass) -> AircraftSignature {
    match class {
        AircraftClass::FixedWing => AircraftSignature {
            class,
            motor_count: 1,
            has_control_surfaces: true,
            vertical_takeoff_capable: false,
            cruise_speed_range: (15.0, 50.0),
            typical_flight_pattern: "linear_cruise",
        },
        AircraftClass::Multirotor | AircraftClass::Unknown => AircraftSignature {
            class: AircraftClass::Multirotor,
            motor_count: 4,
            has_control_surfaces: false,
            vertical_takeoff_capable: true,
            cruise_speed_range: (0.0, 20.0),
            typical_flight_pattern: "hover_maneuver",
        },
        AircraftClass::Vtol => AircraftSignature {
            class,
            motor_count: 5,
            has_control_surfaces: true,
            vertical_takeoff_capable: true,
            cruise_speed_range: (10.0, 35.0),
            typical_flight_pattern: "transition_cruise",
        },
    }
}

/// `supported_classes()` (§6): the three concrete classes plus their
/// static signatures.
#[must_use]
pub fn supported_classes() -> Vec<(AircraftClass, AircraftSignature)> {
    AircraftClass::concrete_classes()
        .into_iter()
        .map(|c| (c, signature_for(c)))
        .collect()
}
