//! `stackwire outputs`: Print the named outputs a stack publishes.

use std::path::PathBuf;

use clap::Args;
use stackwire_common::error::StackwireError;
use stackwire_common::types::{OutputKey, StackKind};

use crate::config::ConfigArgs;
use crate::output::{self, OutputsFormat};

/// Arguments for the `outputs` command.
#[derive(Args, Debug)]
pub struct OutputsArgs {
    /// Stack whose outputs to print (service, registry, storage).
    #[arg(default_value = "service")]
    pub kind: StackKind,

    /// Print only this output's value.
    #[arg(long)]
    pub key: Option<OutputKey>,

    /// Rendering of the full output set.
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputsFormat,

    /// Write here instead of stdout.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Configuration sources.
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Executes the `outputs` command.
///
/// # Errors
///
/// Returns an error if synthesis fails or the requested output is not
/// published by this stack.
pub fn execute(args: &OutputsArgs) -> anyhow::Result<()> {
    let config = args.config.load()?;
    let synthesis = stackwire_synth::synthesize(&config, args.kind)?;

    let rendered = match args.key {
        Some(key) => synthesis
            .outputs
            .get(key)
            .map(str::to_string)
            .ok_or_else(|| StackwireError::NotFound {
                kind: "output",
                id: key.to_string(),
            })?,
        None => output::render_outputs(&synthesis.outputs, args.format)?,
    };
    output::emit(&rendered, args.out.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(kind: StackKind, key: Option<OutputKey>, out: PathBuf) -> OutputsArgs {
        OutputsArgs {
            kind,
            key,
            format: OutputsFormat::Env,
            out: Some(out),
            config: ConfigArgs {
                repository: Some("api-server-dev".into()),
                ..ConfigArgs::default()
            },
        }
    }

    #[test]
    fn single_key_prints_bare_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("value.txt");
        execute(&args(StackKind::Service, Some(OutputKey::ClusterName), path.clone()))
            .expect("outputs");
        assert_eq!(std::fs::read_to_string(path).expect("read"), "api-cluster-dev\n");
    }

    #[test]
    fn unpublished_key_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("value.txt");
        let err = execute(&args(StackKind::Registry, Some(OutputKey::BucketName), path))
            .unwrap_err();
        assert!(err.to_string().contains("bucketName"), "got: {err}");
    }
}
