//! `stackwire synth`: Synthesize a stack and write its topology description.

use std::path::PathBuf;

use clap::Args;
use stackwire_common::types::StackKind;

use crate::config::ConfigArgs;
use crate::output::{self, OutputsFormat, TemplateFormat};

/// Arguments for the `synth` command.
#[derive(Args, Debug)]
pub struct SynthArgs {
    /// Stack to synthesize (service, registry, storage).
    #[arg(default_value = "service")]
    pub kind: StackKind,

    /// Write the topology description here instead of stdout.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Also write the rendered outputs here, as JSON.
    #[arg(long)]
    pub outputs_out: Option<PathBuf>,

    /// Format of the topology description.
    #[arg(long, value_enum, default_value_t)]
    pub format: TemplateFormat,

    /// Configuration sources.
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Executes the `synth` command.
///
/// # Errors
///
/// Returns an error if configuration is invalid, synthesis fails, or the
/// result cannot be written.
pub fn execute(args: &SynthArgs) -> anyhow::Result<()> {
    let config = args.config.load()?;
    let synthesis = stackwire_synth::synthesize(&config, args.kind)?;

    let rendered = output::render_template(&synthesis.template, args.format)?;
    output::emit(&rendered, args.out.as_deref())?;

    if let Some(path) = &args.outputs_out {
        let outputs = output::render_outputs(&synthesis.outputs, OutputsFormat::Json)?;
        output::emit(&outputs, Some(path))?;
    }
    Ok(())
}
