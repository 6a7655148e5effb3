//! Traceability block appended to accepted commit messages.
//!
//! The ordering and the literal line prefixes are a wire-format contract:
//! downstream tooling greps rewritten messages for these exact strings.

use crate::message::OverrideFlags;
use crate::tracker::types::Issue;

/// Prefix of the issue-summary line.
const SUMMARY_PREFIX: &str = "Summary: ";

/// Prefix of the parent-issue line emitted for subtasks.
const PARENT_PREFIX: &str = "Sub-task of: ";

/// Prefix of each related-issue line.
const RELATED_PREFIX: &str = "Related to: ";

/// Notice emitted when tracker communication was overridden.
const COMMUNICATION_NOTICE: &str = "Communication with JIRA is overridden";

/// Notice emitted when the assignee check was overridden.
const ASSIGNEE_NOTICE: &str = "Assigned user is overridden";

/// Appends the traceability block to a stripped commit message.
///
/// Deterministic and side-effect free. The block is built in fixed order:
/// one blank line, the issue summary, the parent line for subtasks, one
/// line per related issue in tracker-reported order, the override notices,
/// and the hook-info line last. When no issue is present (overridden
/// commits) the issue lines are skipped but the blank line and the
/// hook-info line are still emitted.
#[must_use]
pub fn append_trace_block(
    stripped: Vec<String>,
    issue: Option<&Issue>,
    flags: OverrideFlags,
    hook_info: &str,
) -> Vec<String> {
    let mut lines = stripped;
    lines.push(String::new());

    if let Some(issue) = issue {
        lines.push(format!("{SUMMARY_PREFIX}{}", issue.summary));

        if issue.subtask {
            if let Some(parent) = &issue.parent {
                lines.push(format!("{PARENT_PREFIX}{} {}", parent.key, parent.summary));
            }
        }

        for related in &issue.related {
            lines.push(format!("{RELATED_PREFIX}{} {}", related.key, related.summary));
        }
    }

    if flags.communication {
        lines.push(COMMUNICATION_NOTICE.to_string());
    }
    if flags.assignee {
        lines.push(ASSIGNEE_NOTICE.to_string());
    }

    lines.push(hook_info.to_string());
    lines
}
