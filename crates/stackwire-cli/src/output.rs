//! Formatted output helpers for CLI commands.
//!
//! Rendering of templates, output sets, and plan rows, plus the single
//! place that writes to stdout.

use std::io::Write;
use std::path::Path;

use clap::ValueEnum;
use stackwire_common::error::StackwireError;
use stackwire_synth::OutputSet;
use stackwire_synth::Template;
use stackwire_synth::template::Resource;

/// Serialization format of a topology description.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum TemplateFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// YAML.
    Yaml,
}

/// Rendering of an output set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputsFormat {
    /// A JSON object, consumable via `--upstream`.
    #[default]
    Json,
    /// One `name=value` line per output.
    Env,
}

/// Renders a template in the requested format.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_template(template: &Template, format: TemplateFormat) -> anyhow::Result<String> {
    Ok(match format {
        TemplateFormat::Json => template.to_json()?,
        TemplateFormat::Yaml => serde_yaml::to_string(template)?,
    })
}

/// Renders an output set in the requested format.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_outputs(outputs: &OutputSet, format: OutputsFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputsFormat::Json => serde_json::to_string_pretty(outputs)?,
        OutputsFormat::Env => outputs
            .as_map()
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

/// Short type label for plan listings.
#[must_use]
pub const fn resource_kind(resource: &Resource) -> &'static str {
    match resource {
        Resource::Network { .. } => "network",
        Resource::InternetGateway { .. } => "internet-gateway",
        Resource::Subnet { .. } => "subnet",
        Resource::NatGateway { .. } => "nat-gateway",
        Resource::SecurityGroup { .. } => "security-group",
        Resource::ServerlessCache { .. } => "cache",
        Resource::Bucket { .. } => "bucket",
        Resource::Repository { .. } => "repository",
        Resource::Cluster { .. } => "cluster",
        Resource::Role { .. } => "role",
        Resource::Policy { .. } => "policy",
        Resource::TaskDefinition { .. } => "task-definition",
        Resource::Service { .. } => "service",
    }
}

/// Writes `content` to `path`, or to stdout when no path is given.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn emit(content: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, format!("{content}\n")).map_err(|source| StackwireError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::info!(path = %path.display(), bytes = content.len(), "wrote output");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{content}")?;
        }
    }
    Ok(())
}
