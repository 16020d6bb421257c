//! Report Renderer (§6, §9): the natural-language report writer is an
//! external collaborator behind this trait so the pipeline is never
//! blocked on a generative API. `TemplateRenderer` is the deterministic
//! rule-based fallback the core ships by default.

use crate::attribution::AttributionBundle;
use crate::result::AnalysisResult;

/// `render(AnalysisResult, AttributionBundle) -> text` (§6).
pub trait ReportRenderer: Send + Sync {
    fn render(&self, result: &AnalysisResult, attribution: &AttributionBundle) -> String;
}

/// The core's deterministic fallback: plain string assembly from the
/// result and attribution bundle, no generative call. Always available,
/// so `analyze` is never blocked on an external text generator (§6, §9).
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer;

impl ReportRenderer for TemplateRenderer {
    fn render(&self, result: &AnalysisResult, attribution: &AttributionBundle) -> String {
        let mut lines = vec![format!(
            "Aircraft type: {} (confidence {:.0}%)",
            result.aircraft_type, result.aircraft_confidence * 100.0
        )];
        lines.push(format!(
            "Risk: {:.2} ({}) over {} samples",
            result.risk_score, result.risk_level, result.total_samples
        ));

        if result.anomalies.is_empty() {
            lines.push("No anomaly events detected.".to_string());
        } else {
            lines.push(format!("{} anomaly event(s) detected:", result.anomalies.len()));
            for event in result.anomalies.iter().take(10) {
                lines.push(format!("  [{}] t={:.1}s: {}", event.severity, event.timestamp, event.description));
            }
            if result.anomalies.len() > 10 {
                lines.push(format!("  ... and {} more", result.anomalies.len() - 10));
            }
        }

        if attribution.top_features.is_empty() {
            lines.push(attribution.explanation_text.clone());
        } else {
            lines.push(format!(
                "Top contributing features: {}",
                attribution
                    .top_features
                    .iter()
                    .map(|f| f.feature.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
            lines.push(attribution.explanation_text.clone());
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::AircraftClass;
    use crate::error::ErrorCode;
    use chrono::Utc;

    #[test]
    fn renders_without_anomalies() {
        let result = AnalysisResult::neutral(ErrorCode::Internal, 10, Utc::now());
        let bundle = AttributionBundle {
            top_features: Vec::new(),
            overall_impact: 0.0,
            sample_size: 0,
            aircraft_class: AircraftClass::Unknown,
            explanation_text: "Unable to generate explanation".to_string(),
        };
        let text = TemplateRenderer.render(&result, &bundle);
        assert!(text.contains("No anomaly events detected."));
    }
}
