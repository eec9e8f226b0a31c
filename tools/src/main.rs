//! audit-runner: headless batch runner for the credit bias audit.
//!
//! Usage:
//!   audit-runner score       --db banco.db --predictions data.json --scoring-url https://host/predict_batch
//!   audit-runner consolidate --db banco.db --predictions data.json --out datos_consolidados.json
//!   audit-runner analyze     --out datos_consolidados.json [--json]
//!   audit-runner run         --config audit.json

use anyhow::{bail, Result};
use credit_audit_core::{
    bias_analysis::BiasAnalyzer,
    config::AuditConfig,
    pipeline::{run_analysis, run_consolidation, run_scoring},
    report::{render_summary, JsonRenderer, ReportRenderer, TextRenderer},
    scoring::ScoringClient,
    snapshot::JsonSnapshot,
    source::PredictionFile,
    store::SubjectStore,
};
use std::env;
use std::io::{self, Write};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1).map(String::as_str) else {
        bail!("usage: audit-runner <score|consolidate|analyze|run> [flags]");
    };
    let config = build_config(&args)?;
    let json = args.iter().any(|a| a == "--json");

    log::debug!("Running '{command}' with {config:?}");

    match command {
        "score" => score(&config),
        "consolidate" => consolidate(&config),
        "analyze" => analyze(&config, json),
        "run" => {
            consolidate(&config)?;
            analyze(&config, json)
        }
        other => bail!("unknown command '{other}'"),
    }
}

fn build_config(args: &[String]) -> Result<AuditConfig> {
    let mut config = match flag(args, "--config") {
        Some(path) => AuditConfig::load(path)?,
        None => AuditConfig::default(),
    };
    if let Some(db) = flag(args, "--db") {
        config.database_path = db.to_string();
    }
    if let Some(path) = flag(args, "--predictions") {
        config.predictions_path = path.to_string();
    }
    if let Some(path) = flag(args, "--out") {
        config.consolidated_path = path.to_string();
    }
    if let Some(url) = flag(args, "--scoring-url") {
        config.scoring_url = url.to_string();
    }
    config.validate()?;
    Ok(config)
}

fn score(config: &AuditConfig) -> Result<()> {
    let store = SubjectStore::open(&config.database_path)?;
    let client = ScoringClient::new(&config.scoring_url, config.scoring_timeout_secs)?;
    let count = run_scoring(&store, &client, &config.predictions_path)?;
    println!("Scored {count} subjects -> {}", config.predictions_path);
    Ok(())
}

fn consolidate(config: &AuditConfig) -> Result<()> {
    let store = SubjectStore::open(&config.database_path)?;
    let predictions = PredictionFile::new(&config.predictions_path);
    let snapshot = JsonSnapshot::new(&config.consolidated_path);

    let outcome = run_consolidation(&store, &predictions, &snapshot)?;

    let mut stdout = io::stdout().lock();
    render_summary(&outcome.summary, &mut stdout)?;
    if outcome.diagnostics.unmatched > 0 {
        writeln!(
            stdout,
            "  dropped:        {} predictions ({} subjects without a record)",
            outcome.diagnostics.unmatched,
            outcome.diagnostics.unmatched_subjects.len()
        )?;
    }
    writeln!(stdout, "  written to:     {}", snapshot.path())?;
    Ok(())
}

fn analyze(config: &AuditConfig, json: bool) -> Result<()> {
    let snapshot = JsonSnapshot::new(&config.consolidated_path);
    let analyzer = BiasAnalyzer::new(config.suspicious_locality_limit);
    let report = run_analysis(&snapshot, &analyzer)?;

    let renderer: Box<dyn ReportRenderer> = if json {
        Box::new(JsonRenderer)
    } else {
        Box::new(TextRenderer::default())
    };
    let mut stdout = io::stdout().lock();
    renderer.render(&report, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}
