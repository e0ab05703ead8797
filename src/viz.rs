//! Visualization and console reporting of scoring results using Plotters

use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::dataset::Dataset;
use crate::pipeline::ScoringResult;
use crate::validation::ValidationIssue;

/// Width of one histogram bin, in probability percentage points
const BIN_WIDTH: f64 = 10.0;
const N_BINS: usize = 10;

const AT_RISK_COLOR: RGBColor = RED;
const RETAINED_COLOR: RGBColor = BLUE;

/// Count of rows per probability bin, split by predicted label
///
/// Returns `(retained, at_risk)` counts for each of the ten bins over [0, 100].
pub fn probability_bins(result: &ScoringResult) -> Vec<(usize, usize)> {
    let mut bins = vec![(0, 0); N_BINS];
    for (&p, &label) in result.probabilities.iter().zip(&result.labels) {
        let idx = ((p / BIN_WIDTH) as usize).min(N_BINS - 1);
        if label {
            bins[idx].1 += 1;
        } else {
            bins[idx].0 += 1;
        }
    }
    bins
}

/// Create a stacked histogram of attrition probabilities
///
/// # Arguments
/// * `result` - Scoring result with percent probabilities and labels
/// * `output_path` - Path to save the PNG plot
///
/// # Returns
/// * Result indicating success or failure
pub fn create_probability_histogram(result: &ScoringResult, output_path: &Path) -> crate::Result<()> {
    let bins = probability_bins(result);
    let max_count = bins.iter().map(|(r, a)| r + a).max().unwrap_or(0).max(1) as f64;

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Attrition Probability Distribution", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..100f64, 0f64..(max_count * 1.1))?;

    chart
        .configure_mesh()
        .x_desc("Attrition probability (%)")
        .y_desc("Number of Customers")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart
        .draw_series(bins.iter().enumerate().map(|(i, &(retained, _))| {
            let x0 = i as f64 * BIN_WIDTH;
            Rectangle::new(
                [(x0 + 0.5, 0.0), (x0 + BIN_WIDTH - 0.5, retained as f64)],
                RETAINED_COLOR.filled(),
            )
        }))?
        .label("Retained")
        .legend(|(x, y)| Rectangle::new([(x, y), (x + 10, y + 10)], RETAINED_COLOR.filled()));

    chart
        .draw_series(bins.iter().enumerate().map(|(i, &(retained, at_risk))| {
            let x0 = i as f64 * BIN_WIDTH;
            Rectangle::new(
                [
                    (x0 + 0.5, retained as f64),
                    (x0 + BIN_WIDTH - 0.5, (retained + at_risk) as f64),
                ],
                AT_RISK_COLOR.filled(),
            )
        }))?
        .label("At risk")
        .legend(|(x, y)| Rectangle::new([(x, y), (x + 10, y + 10)], AT_RISK_COLOR.filled()));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    tracing::info!(path = %output_path.display(), "Probability histogram saved");

    Ok(())
}

/// Create a two-bar chart of at-risk versus retained customers
pub fn create_risk_split_chart(result: &ScoringResult, output_path: &Path) -> crate::Result<()> {
    let at_risk = result.summary.at_risk_count;
    let retained = result.summary.total_rows - at_risk;
    let max_size = at_risk.max(retained).max(1) as f64;

    let root = BitMapBackend::new(output_path, (600, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Attrition rate: {:.2}%", result.summary.attrition_rate),
            ("sans-serif", 30),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..2f64, 0f64..(max_size * 1.1))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(2)
        .x_label_formatter(&|x| if *x < 1.0 { "Retained".into() } else { "At risk".into() })
        .y_desc("Number of Customers")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series([
        Rectangle::new([(0.1, 0.0), (0.9, retained as f64)], RETAINED_COLOR.filled()),
        Rectangle::new([(1.1, 0.0), (1.9, at_risk as f64)], AT_RISK_COLOR.filled()),
    ])?;

    root.present()?;
    tracing::info!(path = %output_path.display(), "Risk split chart saved");

    Ok(())
}

/// Path of the companion split chart for a histogram path
pub fn split_chart_path(base_output_path: &Path) -> PathBuf {
    let stem = base_output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attrition".to_string());
    base_output_path.with_file_name(format!("{}_split.png", stem))
}

/// Generate the histogram and the split chart next to it
///
/// # Arguments
/// * `result` - Scoring result to plot
/// * `base_output_path` - Path of the histogram PNG
///
/// # Returns
/// * Path of the companion split chart
pub fn generate_visualization_report(
    result: &ScoringResult,
    base_output_path: &Path,
) -> crate::Result<PathBuf> {
    create_probability_histogram(result, base_output_path)?;

    let split_path = split_chart_path(base_output_path);
    create_risk_split_chart(result, &split_path)?;

    Ok(split_path)
}

/// Print validation issues as warnings, or a success line
pub fn print_validation_report(dataset: &Dataset, issues: &[ValidationIssue]) {
    let (rows, columns) = dataset.shape();
    println!("✓ File loaded successfully. Dimensions: ({}, {})", rows, columns);

    if issues.is_empty() {
        println!("✓ The file is valid for prediction.");
        return;
    }

    for issue in issues {
        println!("⚠ {}", issue);
    }
}

/// Render the first rows of a dataset as an aligned text table
pub fn format_preview(dataset: &Dataset, n_rows: usize) -> String {
    let head = dataset.head(n_rows);
    let cells: Vec<Vec<String>> = head
        .rows()
        .iter()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect();

    let widths: Vec<usize> = head
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, &w)| format!("{:<width$}", v, width = w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(cells.len() + 2);
    lines.push(render(head.columns().iter().map(String::as_str).collect()));
    lines.push(
        widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("-|-"),
    );
    for row in &cells {
        lines.push(render(row.iter().map(String::as_str).collect()));
    }
    lines.join("\n")
}

/// Print the result preview and summary metrics to console
pub fn print_scoring_summary(result: &ScoringResult, preview_rows: usize) {
    if preview_rows > 0 {
        println!("\n=== Preview of Results ===");
        println!("{}", format_preview(&result.table, preview_rows));
    }

    println!("\n=== Scoring Summary ===");
    println!("Total customers: {}", result.summary.total_rows);
    println!("Total at-risk customers: {}", result.summary.at_risk_count);
    println!("Global attrition rate: {:.2}%", result.summary.attrition_rate);
}
