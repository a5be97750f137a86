//! `stackwire plan`: Show the resources of a stack in deployment order.

use std::fmt::Write;

use clap::Args;
use stackwire_common::types::StackKind;
use stackwire_synth::Synthesis;

use crate::config::ConfigArgs;
use crate::output;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Stack to plan (service, registry, storage).
    #[arg(default_value = "service")]
    pub kind: StackKind,

    /// Configuration sources.
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Executes the `plan` command.
///
/// Synthesizes the stack, resolves its deployment order, and lists each
/// resource followed by the outputs it will publish.
///
/// # Errors
///
/// Returns an error if configuration is invalid or synthesis fails.
pub fn execute(args: &PlanArgs) -> anyhow::Result<()> {
    let config = args.config.load()?;
    let synthesis = stackwire_synth::synthesize(&config, args.kind)?;
    output::emit(&render_plan(&synthesis)?, None)
}

/// Renders the plan listing for a finished synthesis.
///
/// # Errors
///
/// Returns an error if the template has no valid deployment order.
pub fn render_plan(synthesis: &Synthesis) -> anyhow::Result<String> {
    let order = synthesis.template.deployment_order()?;
    let mut out = String::new();

    writeln!(out, "Deployment plan for: {} ({})", synthesis.stack_name, synthesis.stage)?;
    writeln!(out, "{}", "\u{2550}".repeat(40))?;
    for id in &order {
        if let Some(resource) = synthesis.template.resources.get(id) {
            writeln!(out, "  + {id:<40} {}", output::resource_kind(resource))?;
        }
    }
    writeln!(out)?;
    writeln!(out, "  {} resource(s) will be created.", order.len())?;

    if let Some(network) = synthesis.network.as_ref().filter(|n| n.is_bound()) {
        if let Some(id) = &network.existing_id {
            writeln!(out, "  Bound network: {id}")?;
        }
    }
    if let Some(storage) = synthesis.storage.as_ref().filter(|s| !s.owned) {
        writeln!(out, "  Bound bucket: {}", storage.bucket_name)?;
    }

    if !synthesis.outputs.is_empty() {
        writeln!(out)?;
        writeln!(out, "  Outputs:")?;
        for (key, value) in synthesis.outputs.as_map() {
            writeln!(out, "    {key} = {value}")?;
        }
    }
    Ok(out.trim_end().to_string())
}
