use std::path::{Path, PathBuf};

use anyhow::Context;
use bp_core::{EngineConfig, Evaluation, Suggestion, SuggestionSource};
use bp_engine::{parse_profile_value, scan_alerts, RuleEngine};
use bp_llm::{FallbackSource, OpenRouterSource};
use clap::Parser;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "bp-cli",
    about = "Rank clinical suggestions for a hypertension patient profile JSON."
)]
struct Args {
    /// Path to the patient profile JSON.
    #[arg(short, long)]
    input: PathBuf,

    /// Optional JSON file overriding engine thresholds.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also print notification alerts.
    #[arg(long)]
    alerts: bool,

    /// Ask the OpenRouter model first, falling back to the rule engine.
    #[arg(long)]
    llm: bool,

    /// Print the full report as JSON.
    #[arg(long)]
    json: bool,

    /// Debug-level logging unless RUST_LOG is set.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let data = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Could not read file {:?}", args.input))?;
    let value: Value = serde_json::from_str(&data)
        .with_context(|| format!("Invalid JSON in {:?}", args.input))?;
    let profile = parse_profile_value(&value).context("Could not read patient profile")?;
    let config = load_config(args.config.as_deref())?;

    let engine = RuleEngine::new();
    let mut report = engine.evaluate_report(&profile, &config);
    if args.llm {
        let source = FallbackSource::new(OpenRouterSource::from_env()?, RuleEngine::new());
        report.suggestions = source.suggest(&profile, &config)?;
    }

    let alerts = if args.alerts {
        scan_alerts(&profile)
    } else {
        Vec::new()
    };

    if args.json {
        let output = json!({ "report": report, "alerts": alerts });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_summary(&report);
    for alert in &alerts {
        println!("  ! [{}] {}: {}", alert.severity, alert.title, alert.message);
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read config {path:?}"))?;
    serde_json::from_str(&data).with_context(|| format!("Invalid config {path:?}"))
}

fn print_summary(report: &Evaluation) {
    println!(
        "Patient: {}\nAs of: {}\nReadings: {}\nSuggestions: {}",
        report.patient_id,
        report.as_of,
        report.vitals.count,
        report.suggestions.len()
    );
    for note in report
        .vitals
        .notes
        .iter()
        .chain(&report.prescriptions.notes)
        .chain(&report.treatments.notes)
        .chain(&report.appointments.notes)
    {
        println!("  - {note}");
    }
    for suggestion in &report.suggestions {
        println!("{}", format_suggestion(suggestion));
    }
}

fn format_suggestion(suggestion: &Suggestion) -> String {
    format!(
        "  [{}] {} {} (confidence {:.2})",
        suggestion.severity, suggestion.rule_id, suggestion.message, suggestion.confidence
    )
}
