//! Tracker-agnostic issue data shapes.

use serde::{Deserialize, Serialize};

/// Key and summary of an issue, as carried for parents and related issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    /// Tracker issue key.
    pub key: String,
    /// One-line issue summary.
    pub summary: String,
}

/// A tracker user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Login name in the tracker.
    pub username: String,
    /// Human-readable display name.
    pub display_name: String,
}

/// A fully populated tracker issue.
///
/// Owned by the fetch step; the gate and the formatter only read it.
/// Missing optional fields are absence, never errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Tracker issue key.
    pub key: String,
    /// One-line issue summary.
    pub summary: String,
    /// Workflow status name, when the tracker reports one.
    pub status: Option<String>,
    /// Issue-type name, when the tracker reports one.
    pub issue_type: Option<String>,
    /// Whether the issue is a subtask.
    pub subtask: bool,
    /// Parent issue, for subtasks.
    pub parent: Option<IssueRef>,
    /// Related issues, in tracker-reported order.
    pub related: Vec<IssueRef>,
    /// Assigned user, when any.
    pub assignee: Option<User>,
    /// Resolution text, when the issue is resolved.
    pub resolution: Option<String>,
}
