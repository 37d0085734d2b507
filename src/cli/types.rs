//! CLI type definitions.
//!
//! Clap command structures defining the covlift interface.

use clap::{Parser, Subcommand};

use crate::cli::commands::{
    attempts::AttemptsArgs, baseline::BaselineArgs, init::InitArgs, run::RunArgs,
};

#[derive(Parser)]
#[command(name = "covlift")]
#[command(about = "Coverage-driven test generation loop", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scaffold .covlift/config.yaml in the current project
    Init(InitArgs),

    /// Run the full generate-validate loop
    Run(RunArgs),

    /// Measure baseline coverage without generating anything
    Baseline(BaselineArgs),

    /// Show the attempt ledger
    Attempts(AttemptsArgs),
}
