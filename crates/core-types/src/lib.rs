//! Shared vocabulary for the mrfill workspace.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Semantic category of a merge-request form control.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Assignee,
    Reviewer,
    Label,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Assignee => "assignee",
            FieldKind::Reviewer => "reviewer",
            FieldKind::Label => "label",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User settings driving a fill pass. Empty string/list means "do nothing
/// for this field". Snapshotted once per pass; never mutated by the core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FillConfig {
    pub enabled: bool,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub reviewers: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            assignee: String::new(),
            reviewers: Vec::new(),
            labels: Vec::new(),
        }
    }
}

impl FillConfig {
    /// True when no field has a configured value.
    pub fn is_empty(&self) -> bool {
        self.assignee.is_empty() && self.reviewers.is_empty() && self.labels.is_empty()
    }
}

/// Identity of a field plus its configured value set. Membership in the
/// orchestrator's completed-set prevents that field from being re-filled
/// within one page lifetime.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct AttemptKey(String);

impl AttemptKey {
    pub fn assignee(name: &str) -> Self {
        Self(format!("assignee:{name}"))
    }

    pub fn reviewers(names: &[String]) -> Self {
        Self(format!("reviewers:{}", names.join(",")))
    }

    pub fn labels(names: &[String]) -> Self {
        Self(format!("labels:{}", names.join(",")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttemptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of driving one target value into a popup.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SelectOutcome {
    /// The matching option was clicked; the popup is left open.
    Committed,
    /// No option matched; nothing was clicked.
    NotFound,
}

impl SelectOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, SelectOutcome::Committed)
    }
}

/// What woke the orchestrator for a pass.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum PassTrigger {
    /// Initial page load or a DOM mutation on the target route.
    Mutation,
    /// Externally requested pass that bypasses the route gate.
    Forced,
}

/// Informational record of one completed fill pass. Gates nothing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PassReport {
    pub trigger: PassTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub form_ready: bool,
    /// Attempt keys committed during this pass.
    pub committed: Vec<AttemptKey>,
    /// Attempt keys skipped because they were already in the completed-set.
    pub skipped: Vec<AttemptKey>,
}

impl PassReport {
    pub fn new(trigger: PassTrigger) -> Self {
        let now = Utc::now();
        Self {
            trigger,
            started_at: now,
            finished_at: now,
            form_ready: false,
            committed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }
}

/// Field-level failure taxonomy. None of these abort a pass; the
/// orchestrator logs them and moves on to the next field.
#[derive(Debug, Error, Clone)]
pub enum FillError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("interaction failed: {0}")]
    Interaction(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_key_shapes() {
        assert_eq!(AttemptKey::assignee("alice").as_str(), "assignee:alice");
        assert_eq!(
            AttemptKey::reviewers(&["alice".into(), "bob".into()]).as_str(),
            "reviewers:alice,bob"
        );
        assert_eq!(AttemptKey::labels(&["bug".into()]).as_str(), "labels:bug");
    }

    #[test]
    fn config_defaults_are_enabled_and_empty() {
        let config = FillConfig::default();
        assert!(config.enabled);
        assert!(config.is_empty());
    }

    #[test]
    fn config_deserializes_with_missing_lists() {
        let config: FillConfig = serde_json::from_str(r#"{"enabled":false}"#).unwrap();
        assert!(!config.enabled);
        assert!(config.reviewers.is_empty());
        assert!(config.labels.is_empty());
    }
}
