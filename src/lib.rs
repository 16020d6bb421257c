//! AeroSentry: flight log analysis pipeline.
//!
//! Ingests drone/aircraft flight telemetry and produces a structured
//! safety analysis: aircraft-class detection, a per-class anomaly
//! ensemble, rule-based event extraction, and a feature-attribution
//! explanation of the anomaly model's output.
//!
//! ## Architecture
//!
//! - [`frame`] — the columnar `TabularFrame` every other component reads
//!   through (C1)
//! - [`aircraft`], [`schema`] — the static per-class data model (C2)
//! - [`training`] — deterministic synthetic training-data generation (C3)
//! - [`model`] — the per-class gradient-boosted anomaly classifier (C4)
//! - [`detector`] — heuristic aircraft-class assignment (C5)
//! - [`events`] — rule-based anomaly event extraction (C6)
//! - [`attribution`] — feature-attribution explanation (C7)
//! - [`phases`] — flight-phase and performance-metric calculators
//! - [`orchestrator`] — the single pipeline entry point (C8)
//! - [`result`], [`sink`], [`renderer`] — result assembly, persistence,
//!   and report rendering (C9)

pub mod aircraft;
pub mod attribution;
pub mod cancel;
pub mod config;
pub mod detector;
pub mod error;
pub mod events;
pub mod frame;
pub mod model;
pub mod orchestrator;
pub mod phases;
pub mod renderer;
pub mod result;
pub mod schema;
pub mod sink;
pub mod training;

pub use aircraft::{AircraftClass, AircraftSignature};
pub use attribution::AttributionBundle;
pub use config::PipelineConfig;
pub use error::{ErrorCode, PipelineError, PipelineResult};
pub use events::{AnomalyEvent, Severity};
pub use frame::TabularFrame;
pub use orchestrator::{AnalyzeOutcome, Orchestrator};
pub use result::{AnalysisResult, PersistedRecord, Receipt, ReceiptId, RiskLevel};
pub use sink::{InMemorySink, ResultSink};

/// Initialize `tracing_subscriber`'s `fmt` layer with an `EnvFilter`
/// (`RUST_LOG`, default `info`), for binaries and integration tests that
/// want readable spans around each pipeline stage. Never called
/// implicitly by the library itself — logging setup is the caller's
/// decision, not a side effect of importing this crate.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
