//! Issue-tracker interfaces and the JIRA REST implementation.

mod jira;
pub mod types;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

pub use jira::JiraTracker;

use crate::message::IssueKey;
use types::Issue;

/// Errors emitted by tracker clients.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackerError {
    /// Tracker connection settings are missing or malformed.
    #[error("tracker configuration error: {0}")]
    Configuration(String),

    /// The tracker rejected the configured credentials.
    #[error("tracker rejected the request with status {status}: check the configured credentials")]
    Unauthorized {
        /// HTTP status returned by the tracker (401 or 403).
        status: u16,
    },

    /// The issue does not exist in the tracker.
    #[error("issue {key} does not exist in the tracker")]
    NotFound {
        /// The key that was requested.
        key: String,
    },

    /// The tracker refused the connection.
    #[error("connection to the tracker was refused")]
    ConnectionRefused,

    /// Request transport failed.
    #[error("tracker transport error: {0}")]
    Transport(String),

    /// The tracker answered with an unexpected status.
    #[error("tracker API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the tracker.
        status: u16,
        /// Error body/message.
        message: String,
    },

    /// The tracker payload could not be interpreted.
    #[error("tracker parse error: {0}")]
    Parse(String),
}

/// Synchronous tracker interface.
///
/// A single fetch returns the fully populated issue, including parent and
/// related-issue references; the implementation performs one extra request
/// per related issue key it resolves.
pub trait IssueTracker {
    /// Fetches the populated issue for `key`.
    ///
    /// # Errors
    ///
    /// Returns a typed failure when the issue is missing, the credentials
    /// are rejected, or the tracker is unreachable.
    fn fetch_issue(&self, key: &IssueKey) -> Result<Issue, TrackerError>;
}

/// In-memory tracker for tests: serves canned issues and counts fetches.
#[derive(Debug, Default)]
pub struct MockTracker {
    issues: HashMap<String, Issue>,
    fetches: AtomicUsize,
}

impl MockTracker {
    /// Creates an empty mock tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a canned issue, keyed by its own key.
    #[must_use]
    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issues.insert(issue.key.clone(), issue);
        self
    }

    /// Returns the number of fetches served so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl IssueTracker for MockTracker {
    fn fetch_issue(&self, key: &IssueKey) -> Result<Issue, TrackerError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.issues
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| TrackerError::NotFound {
                key: key.as_str().to_owned(),
            })
    }
}
