//! Thin CLI over the flight log analysis pipeline: analyze a normalized
//! CSV-shaped frame, trigger a retrain, or list supported aircraft
//! classes. Not a log-format decoder (out of scope, §1) — the CSV is
//! expected to already be in the Tabular Frame's column shape, one
//! header row of lowercase snake-case column names followed by numeric
//! rows.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use aerosentry::cancel::Deadline;
use aerosentry::model::ModelRegistry;
use aerosentry::renderer::TemplateRenderer;
use aerosentry::sink::InMemorySink;
use aerosentry::{AnalyzeOutcome, Orchestrator, PipelineConfig, TabularFrame};

#[derive(Parser, Debug)]
#[command(name = "aerosentry")]
#[command(about = "Flight log analysis pipeline: aircraft-class detection, anomaly scoring, event extraction, attribution")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file overriding the default thresholds.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a normalized CSV-shaped flight log.
    Analyze {
        /// Path to the CSV file (header row + numeric rows).
        path: PathBuf,
        /// Training-set size used if a class model self-trains lazily.
        #[arg(long, default_value_t = 4000)]
        training_size: usize,
    },
    /// Retrain all three concrete-class models and print held-out accuracy.
    Retrain {
        #[arg(long, default_value_t = 4000)]
        training_size: usize,
    },
    /// List the supported aircraft classes and their static signatures.
    Classes,
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    match path {
        None => Ok(PipelineConfig::default()),
        Some(p) => {
            let text = std::fs::read_to_string(p).with_context(|| format!("reading config file {}", p.display()))?;
            PipelineConfig::from_toml_str(&text).with_context(|| format!("parsing config file {}", p.display()))
        }
    }
}

/// Parse a CSV file into a `TabularFrame`. The first row is the header;
/// a `timestamp` column, if present, is pulled out separately rather
/// than treated as a feature.
fn load_frame(path: &PathBuf) -> Result<TabularFrame> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines.next().context("CSV file has no header row")?;
    let columns: Vec<String> = header.split(',').map(|h| h.trim().to_lowercase()).collect();
    if columns.is_empty() {
        bail!("CSV header row is empty");
    }

    let mut values: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];
    for (row_idx, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != columns.len() {
            bail!("row {} has {} fields, expected {}", row_idx + 2, fields.len(), columns.len());
        }
        for (col_idx, field) in fields.iter().enumerate() {
            let parsed = field.trim().parse::<f64>().unwrap_or(0.0);
            values[col_idx].push(parsed);
        }
    }

    let mut timestamps = None;
    let mut frame_columns = Vec::new();
    for (name, col) in columns.into_iter().zip(values) {
        if name == "timestamp" {
            timestamps = Some(col);
        } else {
            frame_columns.push((name, col));
        }
    }

    let frame = TabularFrame::new(frame_columns);
    Ok(match timestamps {
        Some(ts) => frame.with_timestamps(ts),
        None => frame,
    })
}

async fn run_analyze(config: PipelineConfig, path: &PathBuf, training_size: usize) -> Result<()> {
    let frame = load_frame(path)?;
    let orchestrator = Arc::new(Orchestrator::new(
        config,
        Arc::new(ModelRegistry::new()),
        Arc::new(InMemorySink::new()),
        Arc::new(TemplateRenderer),
    ));
    // Warm the models once up front so `analyze` never pays the lazy
    // first-train cost on the request path (§5).
    for class in aerosentry::AircraftClass::concrete_classes() {
        orchestrator.models().for_class(class).train(orchestrator.config(), training_size).ok();
    }

    // Dispatched onto the blocking worker pool like any other request
    // would be in a multi-threaded deployment (§5).
    let outcome = orchestrator.analyze_async(frame, Deadline::none()).await?;
    match outcome {
        AnalyzeOutcome::Persisted { receipt, result, attribution } => {
            println!("receipt: {}", receipt.id);
            println!("aircraft_type: {} (confidence {:.2})", result.aircraft_type, result.aircraft_confidence);
            println!("risk_score: {:.3} ({})", result.risk_score, result.risk_level);
            println!("anomalies: {}", result.anomalies.len());
            for event in result.anomalies.iter().take(10) {
                println!("  [{}] t={:.1}s: {}", event.severity, event.timestamp, event.description);
            }
            println!("top features: {}", attribution.explanation_text);
        }
        AnalyzeOutcome::Canceled { .. } => println!("analysis canceled"),
    }
    Ok(())
}

fn run_retrain(config: PipelineConfig, training_size: usize) -> Result<()> {
    let orchestrator = Orchestrator::new(
        config,
        Arc::new(ModelRegistry::new()),
        Arc::new(InMemorySink::new()),
        Arc::new(TemplateRenderer),
    );
    for summary in orchestrator.retrain(training_size) {
        match summary.holdout_accuracy {
            Some(acc) => println!("{}: holdout accuracy {:.3}", summary.class, acc),
            None => println!("{}: training failed", summary.class),
        }
    }
    Ok(())
}

fn run_classes() {
    for (class, signature) in Orchestrator::supported_classes() {
        println!(
            "{class}: motors={} control_surfaces={} vtol={} cruise_speed={:?} pattern={}",
            signature.motor_count,
            signature.has_control_surfaces,
            signature.vertical_takeoff_capable,
            signature.cruise_speed_range,
            signature.typical_flight_pattern
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    aerosentry::init_tracing();
    let args = CliArgs::parse();
    let config = load_config(args.config.as_ref())?;

    match args.command {
        Command::Analyze { path, training_size } => run_analyze(config, &path, training_size).await,
        Command::Retrain { training_size } => run_retrain(config, training_size),
        Command::Classes => {
            run_classes();
            Ok(())
        }
    }
}
