//! Analysis Result (§3): the record the orchestrator hands to the sink,
//! plus the total `RiskLevel` function and receipt types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aircraft::AircraftClass;
use crate::attribution::AttributionBundle;
use crate::config::PipelineConfig;
use crate::error::ErrorCode;
use crate::events::{AnomalyEvent, Severity};
use crate::phases::{PerformanceMetrics, PhaseStats};

/// `risk_level` (§3): a total function of `risk_score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Normal,
    Elevated,
    Warning,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Normal => "NORMAL",
            Self::Elevated => "ELEVATED",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        })
    }
}

/// `level_of(risk)` (§3, §8 P2): total over `[0, 1]`, independent of how
/// `risk` was derived.
#[must_use]
pub fn level_of(risk_score: f64, config: &PipelineConfig) -> RiskLevel {
    if risk_score >= config.severity_critical_threshold {
        RiskLevel::Critical
    } else if risk_score >= config.event_probability_threshold {
        RiskLevel::Warning
    } else if risk_score >= 0.3 {
        RiskLevel::Elevated
    } else {
        RiskLevel::Normal
    }
}

/// `{ aircraft_type, aircraft_confidence, risk_score, risk_level,
/// anomalies[], flight_phases{}, performance_metrics{}, total_samples,
/// analysis_timestamp }` (§3), plus an optional error code for the
/// neutral results produced on `CANCELED`/`INTERNAL` (§4.8, §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub aircraft_type: AircraftClass,
    pub aircraft_confidence: f64,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub anomalies: Vec<AnomalyEvent>,
    pub flight_phases: PhaseStats,
    pub performance_metrics: PerformanceMetrics,
    pub total_samples: usize,
    pub analysis_timestamp: DateTime<Utc>,
    pub error_code: Option<ErrorCode>,
}

impl AnalysisResult {
    /// The neutral result built by C8 when a component exception is
    /// absorbed (§4.8, §7): `class = Unknown`, `confidence = 0`,
    /// `risk = 0.5`, `level = Elevated`, empty collections, tagged with
    /// `error_code`.
    #[must_use]
    pub fn neutral(error_code: ErrorCode, total_samples: usize, timestamp: DateTime<Utc>) -> Self {
        Self {
            aircraft_type: AircraftClass::Unknown,
            aircraft_confidence: 0.0,
            risk_score: 0.5,
            risk_level: RiskLevel::Elevated,
            anomalies: Vec::new(),
            flight_phases: PhaseStats::new(),
            performance_metrics: PerformanceMetrics::new(),
            total_samples,
            analysis_timestamp: timestamp,
            error_code: Some(error_code),
        }
    }

    #[must_use]
    pub fn any_critical(&self) -> bool {
        self.anomalies.iter().any(|e| e.severity == Severity::Critical)
    }
}

/// A receipt id assigned by the sink at persist time (§6).
pub type ReceiptId = uuid::Uuid;

/// What `persist()` hands back on success — a fresh identifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Receipt {
    pub id: ReceiptId,
}

/// The record persisted by the sink (§6): `AnalysisResult` plus
/// `AttributionBundle`, a processing-time measurement, and an optional
/// rendered report, bound together under one receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub analysis_id: ReceiptId,
    pub detected_aircraft_type: AircraftClass,
    pub aircraft_confidence: f64,
    pub anomaly_detected: bool,
    pub anomaly_score: f64,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub anomalies: Vec<AnomalyEvent>,
    pub attribution: AttributionBundle,
    pub ai_report_content: Option<String>,
    pub processing_time_ms: u64,
    pub analysis_timestamp: DateTime<Utc>,
    pub internal_error: Option<ErrorCode>,
}
