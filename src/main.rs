//! churnscore: customer attrition scoring CLI
//!
//! This is the main entrypoint that orchestrates configuration, model
//! loading, validation, scoring, export and visualization.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use churnscore::{
    export_results, load_dataset, load_model, score_with_id_column, validate, viz,
    write_summary_report, Args, Classifier, Command, Config, ScorecardModel,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };

    match &args.command {
        Command::Validate { input, model, json } => {
            run_validation(&config, input, model.as_deref(), *json)
        }
        Command::Score {
            input,
            model,
            output,
            summary,
            chart,
            preview,
            strict,
        } => run_scoring(
            &config,
            &ScoreRequest {
                input,
                model: model.as_deref(),
                output: output.clone().unwrap_or_else(|| config.export.path.clone()),
                summary: summary.as_deref(),
                chart: chart.as_deref(),
                preview_rows: preview.unwrap_or(config.export.preview_rows),
                strict: *strict,
                verbose: args.verbose,
            },
        ),
        Command::Models => {
            list_models(&config);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn select_model(config: &Config, selector: Option<&str>) -> Result<ScorecardModel> {
    let path = config.resolve_model(selector).context(
        "No model selected: pass --model or set default_model in the configuration file",
    )?;
    let model = load_model(&path)
        .with_context(|| format!("Error during model loading from {}", path.display()))?;
    println!("✓ Model '{}' loaded successfully", model.name());
    Ok(model)
}

/// Check the input file and print any issues as warnings
fn run_validation(config: &Config, input: &Path, selector: Option<&str>, json: bool) -> Result<()> {
    let model = select_model(config, selector)?;
    let dataset = load_dataset(input)
        .with_context(|| format!("Failed to load dataset from {}", input.display()))?;

    let issues = validate(&dataset, model.feature_contract());
    for issue in &issues {
        tracing::warn!(%issue, "Validation issue");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
    } else {
        viz::print_validation_report(&dataset, &issues);
    }

    Ok(())
}

struct ScoreRequest<'a> {
    input: &'a Path,
    model: Option<&'a str>,
    output: PathBuf,
    summary: Option<&'a Path>,
    chart: Option<&'a Path>,
    preview_rows: usize,
    strict: bool,
    verbose: bool,
}

/// Run the full scoring pipeline
fn run_scoring(config: &Config, request: &ScoreRequest<'_>) -> Result<()> {
    println!("=== Attrition Scoring ===\n");
    let start_time = Instant::now();

    let model = select_model(config, request.model)?;

    let dataset = load_dataset(request.input)
        .with_context(|| format!("Failed to load dataset from {}", request.input.display()))?;
    let (rows, columns) = dataset.shape();
    println!("✓ File loaded successfully. Dimensions: ({}, {})", rows, columns);

    let issues = validate(&dataset, model.feature_contract());
    for issue in &issues {
        println!("⚠ {}", issue);
    }
    if request.strict && !issues.is_empty() {
        bail!(
            "Refusing to score in strict mode: {} validation issue(s)",
            issues.len()
        );
    }

    let scoring_start = Instant::now();
    let result = score_with_id_column(&dataset, &model, Some(config.id_column.as_str()))
        .context("Error during prediction")?;
    println!("✓ Prediction completed successfully.");
    if request.verbose {
        println!(
            "  Scoring time: {:.2}s",
            scoring_start.elapsed().as_secs_f64()
        );
    }

    viz::print_scoring_summary(&result, request.preview_rows);

    export_results(&result, &request.output)
        .with_context(|| format!("Failed to export results to {}", request.output.display()))?;
    println!("\nResults saved to: {}", request.output.display());

    if let Some(path) = request.summary {
        write_summary_report(&result, model.name(), path)
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
        println!("Summary saved to: {}", path.display());
    }

    if let Some(path) = request.chart {
        let split_path = viz::generate_visualization_report(&result, path)?;
        println!("Probability histogram saved to: {}", path.display());
        println!("Risk split chart saved to: {}", split_path.display());
    }

    println!(
        "\nTotal processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

fn list_models(config: &Config) {
    if config.models.is_empty() {
        println!("No models configured.");
        return;
    }

    for (name, entry) in &config.models {
        let marker = if config.default_model.as_deref() == Some(name.as_str()) {
            "*"
        } else {
            " "
        };
        let label = entry.label.as_deref().unwrap_or(name);
        println!("{} {:<16} {:<32} {}", marker, name, label, entry.path.display());
    }
}
