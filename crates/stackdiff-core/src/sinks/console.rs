//! Sink that writes comment bodies locally.
//!
//! Bodies go to stdout, or to `<report_dir>/<identity>.md` when a report
//! directory is configured. Label decisions are only logged.

use crate::errors::{Result, StackDiffError};
use crate::report::{truncate, MAX_COMMENT_LENGTH};
use crate::sinks::{LabelingSink, PullRequestContext, ReportingSink};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct ConsoleSink {
    report_dir: Option<PathBuf>,
    labels: BTreeSet<String>,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self::default()
    }

    pub fn with_report_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: Some(dir.into()),
            labels: BTreeSet::new(),
        }
    }

    fn reporting_err(reason: impl std::fmt::Display) -> StackDiffError {
        StackDiffError::Reporting {
            reason: reason.to_string(),
        }
    }
}

impl ReportingSink for ConsoleSink {
    fn publish(
        &mut self,
        ctx: &PullRequestContext,
        identity: &str,
        hash: &str,
        body: &str,
    ) -> Result<()> {
        let body = truncate(body, MAX_COMMENT_LENGTH);
        tracing::debug!(
            identity = %identity,
            hash = %hash,
            repository = ctx.repository.as_deref().unwrap_or_default(),
            bytes = body.len() as u64,
            "publishing comment"
        );

        match &self.report_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(Self::reporting_err)?;
                let path = dir.join(format!("{identity}.md"));
                std::fs::write(&path, format!("<!-- {hash} -->\n{body}\n"))
                    .map_err(Self::reporting_err)
            }
            None => {
                let mut out = std::io::stdout().lock();
                writeln!(out, "{body}\n").map_err(Self::reporting_err)
            }
        }
    }
}

impl LabelingSink for ConsoleSink {
    fn labels(&mut self, _ctx: &PullRequestContext) -> Result<BTreeSet<String>> {
        Ok(self.labels.clone())
    }

    fn add_labels(&mut self, _ctx: &PullRequestContext, labels: &[String]) -> Result<()> {
        tracing::info!(labels = %labels.join(","), "labels set");
        self.labels.extend(labels.iter().cloned());
        Ok(())
    }

    fn remove_label(&mut self, _ctx: &PullRequestContext, label: &str) -> Result<()> {
        if !self.labels.remove(label) {
            return Err(StackDiffError::LabelAbsent {
                label: label.to_string(),
            });
        }
        tracing::info!(label = %label, "label removed");
        Ok(())
    }
}
