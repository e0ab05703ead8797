//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Customer attrition scoring against a pre-trained classifier
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a customer file against the model's feature contract
    Validate {
        /// Path to the input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Configured model name, or path to a model artifact
        #[arg(short, long)]
        model: Option<String>,

        /// Print the issues as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score a customer file and export the results
    Score {
        /// Path to the input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Configured model name, or path to a model artifact
        #[arg(short, long)]
        model: Option<String>,

        /// Output path for the scored CSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the summary aggregates as JSON to this path
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Output path for the probability distribution plot
        #[arg(long)]
        chart: Option<PathBuf>,

        /// Number of scored rows to preview
        #[arg(long)]
        preview: Option<usize>,

        /// Refuse to score when validation reports any issue
        #[arg(long)]
        strict: bool,
    },

    /// List the models declared in the configuration
    Models,
}
