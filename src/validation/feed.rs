//! Keyed diffing of the flattened issue feed.
//!
//! Issues that persist across passes keep their key, so the frontend can
//! leave their rows alone and only animate what actually came or went.

use std::collections::BTreeSet;

use serde::Serialize;

use super::{Issue, IssueKey};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedDiff {
    /// Keys present last pass and gone now.
    pub removed: Vec<IssueKey>,
    /// Issues whose key is new this pass, in feed order.
    pub added: Vec<(IssueKey, Issue)>,
}

impl FeedDiff {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct IssueFeed {
    shown: Vec<IssueKey>,
}

impl IssueFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently displayed, in display order.
    pub fn keys(&self) -> &[IssueKey] {
        &self.shown
    }

    /// Replace the displayed set with `issues` and report the difference.
    /// Duplicate keys within one pass collapse to the first occurrence.
    pub fn apply(&mut self, issues: &[Issue]) -> FeedDiff {
        let mut current = BTreeSet::new();
        let mut ordered = Vec::with_capacity(issues.len());
        for issue in issues {
            let key = issue.key();
            if current.insert(key.clone()) {
                ordered.push((key, issue));
            }
        }

        let previous: BTreeSet<&IssueKey> = self.shown.iter().collect();
        let removed = self
            .shown
            .iter()
            .filter(|k| !current.contains(*k))
            .cloned()
            .collect();
        let added = ordered
            .iter()
            .filter(|(k, _)| !previous.contains(k))
            .map(|(k, i)| (k.clone(), (*i).clone()))
            .collect();

        // Survivors keep their slot; new issues are appended.
        let mut shown: Vec<IssueKey> = self.shown.iter().filter(|k| current.contains(*k)).cloned().collect();
        shown.extend(ordered.into_iter().map(|(k, _)| k).filter(|k| !previous.contains(k)));
        self.shown = shown;

        FeedDiff { removed, added }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Severity;

    fn issue(message: &str) -> Issue {
        Issue {
            message: message.to_string(),
            source_id: "widget-1".to_string(),
            severity: Severity::Alert,
            tech: None,
        }
    }

    #[test]
    fn test_first_pass_adds_everything() {
        let mut feed = IssueFeed::new();
        let diff = feed.apply(&[issue("a"), issue("b")]);
        assert_eq!(diff.added.len(), 2);
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn test_persisting_issue_is_untouched() {
        let mut feed = IssueFeed::new();
        feed.apply(&[issue("a"), issue("b")]);
        let diff = feed.apply(&[issue("b"), issue("c")]);
        assert_eq!(diff.removed, vec![issue("a").key()]);
        assert_eq!(diff.added.len(), 1);
        assert_eq!(diff.added[0].1.message, "c");
        assert_eq!(feed.keys(), &[issue("b").key(), issue("c").key()]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let mut feed = IssueFeed::new();
        let diff = feed.apply(&[issue("a"), issue("a")]);
        assert_eq!(diff.added.len(), 1);
        assert!(feed.apply(&[issue("a")]).is_empty());
    }
}
