//! Diff command
//!
//! Usage: stackdiff diff --base <DIR> --head <DIR> [options]
//!
//! Every option can also be given through the environment, which is how CI
//! workflows usually pass them.

use anyhow::Context;
use clap::Args;
use stackdiff_core::diff::filter::ASSET_BUCKET_MARKER;
use stackdiff_core::diff::{DiffOptions, LocalTemplateDiffer, SkipProperties};
use stackdiff_core::report::{aggregate, run_diffs, RunSummary};
use stackdiff_core::sinks::{
    apply_labels, publish_comments, ConsoleSink, LabelFlags, PullRequestContext,
};
use stackdiff_core::{reconcile, RunResult};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Base assembly directory
    #[arg(long, env = "STACKDIFF_BASE")]
    pub base: PathBuf,

    /// Head assembly directory
    #[arg(long, env = "STACKDIFF_HEAD")]
    pub head: PathBuf,

    /// Ignore changes to `ResourceType.PropertyName` (repeatable)
    #[arg(long = "ignore-changes", env = "STACKDIFF_IGNORE_CHANGES", value_delimiter = ',')]
    pub ignore_changes: Vec<String>,

    /// Skip state machines whose definition only changed in asset paths
    #[arg(long, env = "STACKDIFF_IGNORE_ASSET_ONLY_CHANGES")]
    pub ignore_asset_only_changes: bool,

    /// Token identifying asset-bucket references
    #[arg(long, env = "STACKDIFF_ASSET_MARKER", default_value = ASSET_BUCKET_MARKER)]
    pub asset_marker: String,

    /// Do not publish the summary comment
    #[arg(long, env = "STACKDIFF_NO_SUMMARY")]
    pub no_summary: bool,

    /// Do not reconcile pull request labels
    #[arg(long, env = "STACKDIFF_NO_LABELS")]
    pub no_labels: bool,

    /// Repository slug (`owner/repo`)
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    /// Pull request number
    #[arg(long, env = "STACKDIFF_PR_NUMBER")]
    pub pr_number: Option<u64>,

    /// Head commit SHA
    #[arg(long, env = "GITHUB_SHA")]
    pub sha: Option<String>,

    /// File receiving `key=value` outputs
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output_file: Option<PathBuf>,

    /// Write comment bodies to this directory instead of stdout
    #[arg(long, env = "STACKDIFF_REPORT_DIR")]
    pub report_dir: Option<PathBuf>,

    /// Print the run result and summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl DiffArgs {
    fn options(&self) -> anyhow::Result<DiffOptions> {
        Ok(DiffOptions {
            skip_properties: SkipProperties::parse(&self.ignore_changes)?,
            ignore_asset_only_changes: self.ignore_asset_only_changes,
            asset_marker: self.asset_marker.clone(),
        })
    }

    fn context(&self) -> PullRequestContext {
        PullRequestContext {
            repository: self.repository.clone(),
            issue_number: self.pr_number,
            commit_sha: self.sha.clone(),
        }
    }
}

/// Execute diff command
///
/// Per-stack failures and sink failures are reported but do not fail the
/// command; only an assembly that cannot be reconciled does.
pub fn execute(args: DiffArgs) -> anyhow::Result<()> {
    let options = args.options()?;

    tracing::debug!(base = %args.base.display(), "loading base assembly");
    let base = reconcile(&args.base)
        .with_context(|| format!("loading base assembly from {}", args.base.display()))?;
    tracing::debug!(head = %args.head.display(), "loading head assembly");
    let head = reconcile(&args.head)
        .with_context(|| format!("loading head assembly from {}", args.head.display()))?;

    let run = run_diffs(&head, &base, &LocalTemplateDiffer, &options)?;
    let summary = aggregate(&run);

    if let Some(path) = &args.output_file {
        write_outputs(path, &summary)?;
    }

    let ctx = args.context();
    if !ctx.is_pull_request() {
        tracing::warn!("no pull request context, comments and labels stay local");
    }
    let mut sink = match &args.report_dir {
        Some(dir) => ConsoleSink::with_report_dir(dir),
        None => ConsoleSink::stdout(),
    };

    // Comment bodies and the JSON document would interleave on stdout.
    if !args.json || args.report_dir.is_some() {
        let failures = publish_comments(&mut sink, &ctx, &run, !args.no_summary);
        if !failures.is_empty() {
            tracing::error!(failed = failures.len() as u64, "some comments were not published");
        }
    }

    if !args.no_labels {
        if let Err(err) = apply_labels(&mut sink, &ctx, LabelFlags::from_summary(&summary)) {
            tracing::error!(error = %err, "labeling failed");
        }
    }

    if args.json {
        print_json(&run, &summary)?;
    }
    Ok(())
}

fn write_outputs(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening outputs file {}", path.display()))?;
    for line in summary.output_lines() {
        writeln!(file, "{line}")?;
    }
    Ok(())
}

fn print_json(run: &RunResult, summary: &RunSummary) -> anyhow::Result<()> {
    let doc = serde_json::json!({
        "summary": summary,
        "run": run,
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}
