//! In-memory sink, records every call.

use crate::errors::{Result, StackDiffError};
use crate::sinks::{LabelingSink, PullRequestContext, ReportingSink};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedComment {
    pub identity: String,
    pub body: String,
    /// Number of times the comment was written
    pub revisions: usize,
}

/// Sink keeping comments (keyed by identity hash) and labels in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub comments: BTreeMap<String, PublishedComment>,
    /// Publish order, by identity
    pub publish_order: Vec<String>,
    pub labels: BTreeSet<String>,
    pub removed_labels: Vec<String>,
    /// Identities whose publish call fails
    pub fail_identities: BTreeSet<String>,
    pub fail_labeling: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_labels<I: IntoIterator<Item = S>, S: Into<String>>(labels: I) -> Self {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Comment body by identity
    pub fn body(&self, identity: &str) -> Option<&str> {
        self.comments
            .values()
            .find(|c| c.identity == identity)
            .map(|c| c.body.as_str())
    }
}

impl ReportingSink for MemorySink {
    fn publish(
        &mut self,
        _ctx: &PullRequestContext,
        identity: &str,
        hash: &str,
        body: &str,
    ) -> Result<()> {
        if self.fail_identities.contains(identity) {
            return Err(StackDiffError::Reporting {
                reason: format!("rejected comment {identity}"),
            });
        }
        self.publish_order.push(identity.to_string());
        let entry = self
            .comments
            .entry(hash.to_string())
            .or_insert_with(|| PublishedComment {
                identity: identity.to_string(),
                body: String::new(),
                revisions: 0,
            });
        entry.body = body.to_string();
        entry.revisions += 1;
        Ok(())
    }
}

impl LabelingSink for MemorySink {
    fn labels(&mut self, _ctx: &PullRequestContext) -> Result<BTreeSet<String>> {
        if self.fail_labeling {
            return Err(StackDiffError::Labeling {
                reason: "label listing unavailable".to_string(),
            });
        }
        Ok(self.labels.clone())
    }

    fn add_labels(&mut self, _ctx: &PullRequestContext, labels: &[String]) -> Result<()> {
        self.labels.extend(labels.iter().cloned());
        Ok(())
    }

    fn remove_label(&mut self, _ctx: &PullRequestContext, label: &str) -> Result<()> {
        if !self.labels.remove(label) {
            return Err(StackDiffError::LabelAbsent {
                label: label.to_string(),
            });
        }
        self.removed_labels.push(label.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_hash_updates_in_place() {
        let mut sink = MemorySink::new();
        let ctx = PullRequestContext::default();
        sink.publish(&ctx, "Api", "h1", "one").unwrap();
        sink.publish(&ctx, "Api", "h1", "two").unwrap();
        assert_eq!(sink.comments.len(), 1);
        assert_eq!(sink.comments["h1"].revisions, 2);
        assert_eq!(sink.body("Api"), Some("two"));
    }
}
