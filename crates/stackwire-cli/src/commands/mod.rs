//! CLI command definitions and dispatch.

pub mod outputs;
pub mod plan;
pub mod synth;

use clap::{Parser, Subcommand};
use stackwire_common::constants::BIN_NAME;

/// Stackwire: resolve-or-create deployment topology synthesizer.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Emit logs as newline-delimited JSON.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Synthesize a stack and write its topology description.
    Synth(synth::SynthArgs),
    /// Show the resources of a stack in deployment order.
    Plan(plan::PlanArgs),
    /// Print the named outputs a stack publishes.
    Outputs(outputs::OutputsArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Synth(args) => synth::execute(&args),
        Command::Plan(args) => plan::execute(&args),
        Command::Outputs(args) => outputs::execute(&args),
    }
}
