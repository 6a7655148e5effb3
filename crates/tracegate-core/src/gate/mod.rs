//! The commit gate: override handling, policy checks, and the final
//! accept/reject decision.
//!
//! One invocation walks a fixed state machine:
//! `Start → OverridesDetected → {Skipped | IssueFetched} → StatusChecked →
//! AssigneeChecked → {Accepted | Rejected}`. A missing issue key or an
//! unreachable tracker is an operational failure that aborts the run;
//! policy refusals are collected and reported together as a rejection.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info};

use crate::message::{CommitMessage, MessageError, OverrideFlags};
use crate::policy::PolicyTables;
use crate::trace;
use crate::tracker::types::Issue;
use crate::tracker::{IssueTracker, TrackerError};

/// Fatal failures that abort the hook without a policy decision.
#[derive(Debug, Error)]
pub enum HookError {
    /// Commit-message file I/O failed.
    #[error(transparent)]
    Message(#[from] MessageError),

    /// The tracker could not produce the issue.
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// No project-key patterns are configured.
    #[error("no project-key patterns configured under githook.jira.projectkey")]
    MissingPatterns,

    /// The subject line carries no recognized issue key.
    #[error("no issue key found in subject line {subject:?}")]
    MissingIssueKey {
        /// The subject line that was scanned.
        subject: String,
    },

    /// The username needed for the assignee check is not configured.
    #[error("githook.jira.username is not set; cannot check the assignee")]
    MissingUsername,
}

/// A reason the gate refused the commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The issue's workflow status does not permit committing.
    StatusNotAllowed {
        /// Issue-type name, when the tracker reported one.
        issue_type: Option<String>,
        /// Offending status, when the tracker reported one.
        status: Option<String>,
    },

    /// The issue is assigned to somebody else.
    AssigneeMismatch {
        /// Username the hook expects, from local configuration.
        expected: String,
        /// Display name of the actual assignee.
        assignee: String,
    },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StatusNotAllowed { issue_type, status } => write!(
                f,
                "status {:?} does not permit committing for issue type {:?}",
                status.as_deref().unwrap_or("(none)"),
                issue_type.as_deref().unwrap_or("(none)"),
            ),
            Self::AssigneeMismatch { expected, assignee } => write!(
                f,
                "issue is assigned to {assignee}, not to the configured user {expected}"
            ),
        }
    }
}

/// Terminal result of one hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// The commit may proceed; `lines` is what was written back.
    Accepted {
        /// Final line sequence of the commit-message file.
        lines: Vec<String>,
    },

    /// The commit is blocked by policy; the file was left untouched.
    Rejected {
        /// Every failed check, reported together.
        reasons: Vec<RejectReason>,
    },
}

/// The orchestrating state machine.
pub struct CommitGate<'a> {
    tracker: &'a dyn IssueTracker,
    policy: &'a PolicyTables,
    key_patterns: Option<String>,
    username: Option<String>,
    hook_info: String,
}

impl<'a> CommitGate<'a> {
    /// Creates a gate over the given collaborators.
    ///
    /// `key_patterns` is the space-separated project-key prefix list and
    /// `username` the locally configured tracker username; both are only
    /// required on paths that actually use them.
    #[must_use]
    pub fn new(
        tracker: &'a dyn IssueTracker,
        policy: &'a PolicyTables,
        key_patterns: Option<String>,
        username: Option<String>,
        hook_info: String,
    ) -> Self {
        Self {
            tracker,
            policy,
            key_patterns,
            username,
            hook_info,
        }
    }

    /// Runs the full state machine over `message`.
    ///
    /// On acceptance the rewritten message is persisted to the message's
    /// original path; a rejection leaves the file untouched.
    ///
    /// # Errors
    ///
    /// Operational failures (file I/O, missing key patterns, no key in the
    /// subject, tracker failures) abort with [`HookError`]. Policy refusals
    /// are the [`HookOutcome::Rejected`] value, not errors.
    pub fn run(&self, message: &CommitMessage) -> Result<HookOutcome, HookError> {
        // An empty commit message carries no overrides and no issue key;
        // write it back unchanged.
        if message.is_empty() {
            message.write(message.lines())?;
            return Ok(HookOutcome::Accepted { lines: Vec::new() });
        }

        let flags = message.override_flags();
        debug!(?flags, "detected override flags");

        let issue = if flags.skips_tracker() {
            debug!("tracker communication skipped");
            None
        } else {
            Some(self.fetch(message)?)
        };

        let mut reasons = Vec::new();
        if let Some(reason) = Self::check_status(self.policy, issue.as_ref(), flags) {
            reasons.push(reason);
        }
        if let Some(reason) = self.check_assignee(issue.as_ref(), flags)? {
            reasons.push(reason);
        }

        if !reasons.is_empty() {
            return Ok(HookOutcome::Rejected { reasons });
        }

        let stripped = message.stripped(flags, issue.is_some());
        let lines = trace::append_trace_block(stripped, issue.as_ref(), flags, &self.hook_info);
        message.write(&lines)?;
        info!("commit message rewritten with traceability information");
        Ok(HookOutcome::Accepted { lines })
    }

    fn fetch(&self, message: &CommitMessage) -> Result<Issue, HookError> {
        let patterns = self
            .key_patterns
            .as_deref()
            .filter(|patterns| !patterns.trim().is_empty())
            .ok_or(HookError::MissingPatterns)?;

        let key = message
            .extract_issue_key(patterns)
            .ok_or_else(|| HookError::MissingIssueKey {
                subject: message.lines().first().cloned().unwrap_or_default(),
            })?;

        Ok(self.tracker.fetch_issue(&key)?)
    }

    /// Status check; `None` means pass. Fails closed on unknown issue
    /// types and empty allowed sets.
    fn check_status(
        policy: &PolicyTables,
        issue: Option<&Issue>,
        flags: OverrideFlags,
    ) -> Option<RejectReason> {
        if flags.skips_tracker() {
            return None;
        }
        let Some(issue) = issue else {
            return None;
        };

        let allowed = issue
            .issue_type
            .as_deref()
            .zip(issue.status.as_deref())
            .is_some_and(|(issue_type, status)| policy.allows_commit(issue_type, status));
        if allowed {
            None
        } else {
            Some(RejectReason::StatusNotAllowed {
                issue_type: issue.issue_type.clone(),
                status: issue.status.clone(),
            })
        }
    }

    /// Assignee check; `Ok(None)` means pass. An issue without an assignee
    /// passes — there is nobody to check against.
    fn check_assignee(
        &self,
        issue: Option<&Issue>,
        flags: OverrideFlags,
    ) -> Result<Option<RejectReason>, HookError> {
        if flags.assignee || flags.commit {
            return Ok(None);
        }
        let Some(issue) = issue else {
            return Ok(None);
        };
        let Some(assignee) = &issue.assignee else {
            return Ok(None);
        };

        let expected = self.username.as_deref().ok_or(HookError::MissingUsername)?;
        if assignee.username == expected {
            Ok(None)
        } else {
            Ok(Some(RejectReason::AssigneeMismatch {
                expected: expected.to_owned(),
                assignee: assignee.display_name.clone(),
            }))
        }
    }
}
