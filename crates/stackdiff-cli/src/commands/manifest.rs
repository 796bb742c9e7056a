//! Manifest command
//!
//! Usage: stackdiff manifest <ASSEMBLY> [--output <FILE>]

use anyhow::Context;
use clap::Args;
use stackdiff_core::assembly::reconcile;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ManifestArgs {
    /// Assembly directory (e.g. cdk.out)
    pub assembly: PathBuf,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute manifest command
pub fn execute(args: ManifestArgs) -> anyhow::Result<()> {
    let reader = reconcile(&args.assembly)
        .with_context(|| format!("reconciling {}", args.assembly.display()))?;
    let json = reader.manifest()?.to_json_pretty()?;

    if let Some(output_path) = args.output {
        std::fs::write(&output_path, &json)
            .with_context(|| format!("writing {}", output_path.display()))?;
        eprintln!("✓ Manifest written to {}", output_path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}
