//! Commit-message loading, override detection, and option stripping.
//!
//! The subject line (line 0) of a commit message can carry option tokens:
//! a leading `NONE` forces the commit through without a tracker issue, a
//! trailing `-O` skips tracker communication, and a trailing `-A` bypasses
//! the assignee check. Several trailing sentinels may be combined
//! (`... -O -A` sets both flags). Sentinel comparison is case-insensitive
//! exact-token match, never prefix or substring match.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Trailing sentinel that skips tracker communication entirely.
const COMMUNICATION_OVERRIDE: &str = "-O";

/// Trailing sentinel that bypasses the assignee check.
const ASSIGNEE_OVERRIDE: &str = "-A";

/// Leading sentinel that forces the commit through without an issue.
const COMMIT_OVERRIDE: &str = "NONE";

/// Errors raised while reading or writing the commit-message file.
#[derive(Debug, Error)]
pub enum MessageError {
    /// The commit-message file could not be read.
    #[error("failed to read commit message {path}: {source}")]
    Read {
        /// Path git handed to the hook.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The commit-message file could not be written back.
    #[error("failed to write commit message {path}: {source}")]
    Write {
        /// Path git handed to the hook.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Override modes requested through sentinel tokens on the subject line.
///
/// Computed once per invocation and threaded through the gate as a value;
/// the flags are independent and not mutually exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverrideFlags {
    /// Tracker communication is skipped (trailing `-O`).
    pub communication: bool,
    /// The commit is forced through (leading `NONE`).
    pub commit: bool,
    /// The assignee check is bypassed (trailing `-A`).
    pub assignee: bool,
}

impl OverrideFlags {
    /// Returns true when the tracker must not be contacted at all.
    #[must_use]
    pub const fn skips_tracker(self) -> bool {
        self.communication || self.commit
    }

    /// Returns true when any override mode is active.
    #[must_use]
    pub const fn any(self) -> bool {
        self.communication || self.commit || self.assignee
    }
}

/// A normalized (upper-cased) issue-tracker key taken from the subject line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IssueKey(String);

impl IssueKey {
    /// Normalizes `raw` into an issue key.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(raw.to_uppercase())
    }

    /// Returns the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A commit message loaded from disk: ordered lines plus the source path.
///
/// Line 0, when present, is the subject line carrying option tokens; the
/// remaining lines are free-form body. An empty file yields zero lines,
/// which is a valid state and never an error.
#[derive(Debug, Clone)]
pub struct CommitMessage {
    path: PathBuf,
    lines: Vec<String>,
}

impl CommitMessage {
    /// Loads the commit message from `path`, preserving line order.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Read`] when the path is unreadable.
    pub fn load(path: &Path) -> Result<Self, MessageError> {
        let raw = fs::read_to_string(path).map_err(|source| MessageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let lines: Vec<String> = raw.lines().map(str::to_owned).collect();
        debug!(path = %path.display(), line_count = lines.len(), "loaded commit message");
        Ok(Self {
            path: path.to_path_buf(),
            lines,
        })
    }

    /// Builds a message from raw lines without touching the filesystem.
    #[must_use]
    pub fn from_lines(path: PathBuf, lines: Vec<String>) -> Self {
        Self { path, lines }
    }

    /// Returns the message lines in file order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns true for the zero-line (empty file) state.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the path the message was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Detects every override mode requested on the subject line.
    ///
    /// The leading token is compared against `NONE`; the trailing tokens are
    /// scanned from the end, and every token in the trailing sentinel run
    /// counts. All comparisons are case-insensitive exact-token matches.
    /// Zero lines yield no overrides.
    #[must_use]
    pub fn override_flags(&self) -> OverrideFlags {
        let mut flags = OverrideFlags::default();
        let Some(subject) = self.lines.first() else {
            return flags;
        };
        let tokens: Vec<&str> = subject.split_whitespace().collect();

        if tokens
            .first()
            .is_some_and(|token| token.eq_ignore_ascii_case(COMMIT_OVERRIDE))
        {
            flags.commit = true;
        }

        for token in tokens.iter().rev() {
            if token.eq_ignore_ascii_case(COMMUNICATION_OVERRIDE) {
                flags.communication = true;
            } else if token.eq_ignore_ascii_case(ASSIGNEE_OVERRIDE) {
                flags.assignee = true;
            } else {
                break;
            }
        }

        flags
    }

    /// Returns true when the subject line ends in the skip-tracker sentinel.
    #[must_use]
    pub fn is_communication_overridden(&self) -> bool {
        self.override_flags().communication
    }

    /// Returns true when the subject line starts with the force-commit
    /// sentinel.
    #[must_use]
    pub fn is_commit_overridden(&self) -> bool {
        self.override_flags().commit
    }

    /// Returns true when the subject line ends in the ignore-assignee
    /// sentinel.
    #[must_use]
    pub fn is_assignee_overridden(&self) -> bool {
        self.override_flags().assignee
    }

    /// Extracts the first issue key matching any of the given project-key
    /// patterns.
    ///
    /// `patterns` is the space-separated prefix list from configuration.
    /// Patterns are tried in caller order (outer loop) against the subject
    /// words in line order (inner loop); the first matching pair wins and
    /// the search stops. Matching is a case-insensitive prefix test and the
    /// returned key is upper-cased.
    ///
    /// `None` is the normal outcome for a subject without a tracker
    /// reference; callers decide whether that is fatal.
    #[must_use]
    pub fn extract_issue_key(&self, patterns: &str) -> Option<IssueKey> {
        let subject = self.lines.first()?;
        if subject.trim().is_empty() || patterns.trim().is_empty() {
            return None;
        }

        let words: Vec<&str> = subject.split_whitespace().collect();
        for pattern in patterns.split_whitespace() {
            let pattern_upper = pattern.to_uppercase();
            for word in &words {
                let word_upper = word.to_uppercase();
                if word_upper.starts_with(&pattern_upper) {
                    debug!(key = %word_upper, "found issue key");
                    return Some(IssueKey(word_upper));
                }
            }
        }
        None
    }

    /// Returns the line sequence with the subject's trailing sentinel run
    /// removed.
    ///
    /// Every token in the trailing run of `-O`/`-A` sentinels is dropped,
    /// not just the last one. Sentinels appearing mid-line are prose and
    /// stay. Token 0 is upper-cased when any override flag is set or when
    /// an issue key was extracted; it is never removed even when it is
    /// itself a sentinel. Lines after the subject are untouched.
    #[must_use]
    pub fn stripped(&self, flags: OverrideFlags, key_found: bool) -> Vec<String> {
        let Some(subject) = self.lines.first() else {
            return Vec::new();
        };

        let tokens: Vec<&str> = subject.split_whitespace().collect();
        let mut keep = tokens.len();
        while keep > 1 && is_sentinel(tokens[keep - 1]) {
            keep -= 1;
        }

        let mut retained: Vec<String> = tokens[..keep].iter().map(|t| (*t).to_owned()).collect();
        if (flags.any() || key_found) && !retained.is_empty() {
            let upper = retained[0].to_uppercase();
            retained[0] = upper;
        }

        let mut lines = Vec::with_capacity(self.lines.len());
        lines.push(retained.join(" "));
        lines.extend(self.lines.iter().skip(1).cloned());
        lines
    }

    /// Persists `lines` to the original path, overwriting it.
    ///
    /// This is the single filesystem side effect of the hook besides the
    /// initial load.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Write`] on any I/O failure.
    pub fn write(&self, lines: &[String]) -> Result<(), MessageError> {
        let mut contents = lines.join("\n");
        if !lines.is_empty() {
            contents.push('\n');
        }
        fs::write(&self.path, contents).map_err(|source| MessageError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

fn is_sentinel(token: &str) -> bool {
    token.eq_ignore_ascii_case(COMMUNICATION_OVERRIDE)
        || token.eq_ignore_ascii_case(ASSIGNEE_OVERRIDE)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use proptest::prelude::*;

    use super::{CommitMessage, IssueKey, OverrideFlags};

    const PATTERNS: &str = "EXAMPLE PR ERROR";

    fn message(subject: &str) -> CommitMessage {
        CommitMessage::from_lines(PathBuf::from("COMMIT_EDITMSG"), vec![subject.to_string()])
    }

    #[test]
    fn no_overrides_on_normal_commit() {
        let msg = message("example-1 Added som files for this issue");
        assert_eq!(msg.override_flags(), OverrideFlags::default());
    }

    #[test]
    fn communication_override_detected() {
        let msg = message("EXAMPLE-1 added some more functionality -O");
        assert!(msg.is_communication_overridden());
        assert!(!msg.is_commit_overridden());
        assert!(!msg.is_assignee_overridden());
    }

    #[test]
    fn communication_override_is_case_insensitive() {
        let msg = message("EXAMPLE-1 added some more functionality -o");
        assert!(msg.is_communication_overridden());
    }

    #[test]
    fn assignee_override_detected() {
        let msg = message("EXAMPLE-1 even more functionality added for wrong assignee -A");
        assert!(msg.is_assignee_overridden());
        assert!(!msg.is_communication_overridden());
    }

    #[test]
    fn commit_override_detected_on_first_token() {
        let msg = message("NONE did some configuration manager work");
        assert!(msg.is_commit_overridden());
        assert!(!msg.is_communication_overridden());
    }

    #[test]
    fn commit_override_is_case_insensitive() {
        let msg = message("none did some configuration manager work");
        assert!(msg.is_commit_overridden());
    }

    #[test]
    fn commit_override_must_be_first_token() {
        let msg = message("did NONE of the configuration manager work");
        assert!(!msg.is_commit_overridden());
    }

    #[test]
    fn trailing_sentinel_run_sets_both_flags() {
        let msg = message("EXAMPLE-1 fixed the listing -O -A");
        let flags = msg.override_flags();
        assert!(flags.communication);
        assert!(flags.assignee);
    }

    #[test]
    fn sentinel_before_prose_is_not_an_override() {
        let msg = message("EXAMPLE-1 fixed -O handling in the parser");
        assert_eq!(msg.override_flags(), OverrideFlags::default());
    }

    #[test]
    fn empty_message_has_no_overrides() {
        let msg = CommitMessage::from_lines(PathBuf::from("COMMIT_EDITMSG"), Vec::new());
        assert_eq!(msg.override_flags(), OverrideFlags::default());
    }

    #[test]
    fn issue_keys_normalize_to_uppercase() {
        let key = IssueKey::new("example-1");
        assert_eq!(key.as_str(), "EXAMPLE-1");
        assert_eq!(key.to_string(), "EXAMPLE-1");
    }

    #[test]
    fn extracts_key_from_normal_commit() {
        let msg = message("example-1 Added som files for this issue");
        let key = msg.extract_issue_key(PATTERNS).expect("key");
        assert_eq!(key.as_str(), "EXAMPLE-1");
    }

    #[test]
    fn extraction_ignores_unregistered_patterns() {
        let msg = message("UNKNOWN-7 tweaked the build");
        assert!(msg.extract_issue_key(PATTERNS).is_none());
    }

    #[test]
    fn extraction_finds_nothing_without_tracker_reference() {
        let msg = message("this is a commit with no tracker reference");
        assert!(msg.extract_issue_key(PATTERNS).is_none());
    }

    #[test]
    fn extraction_handles_none_subject() {
        let msg = message("NONE did some configuration manager work");
        assert!(msg.extract_issue_key(PATTERNS).is_none());
    }

    #[test]
    fn extraction_splits_on_whitespace_runs() {
        let msg = message("fix  \t example-1   trailing   spaces");
        let key = msg.extract_issue_key(PATTERNS).expect("key");
        assert_eq!(key.as_str(), "EXAMPLE-1");
    }

    #[test]
    fn first_pattern_in_caller_order_wins() {
        // Both words match a pattern; the pattern order decides, not the
        // word order.
        let msg = message("fix pr-9 for error-3 in listing");
        let key = msg.extract_issue_key("ERROR PR").expect("key");
        assert_eq!(key.as_str(), "ERROR-3");
        let key = msg.extract_issue_key("PR ERROR").expect("key");
        assert_eq!(key.as_str(), "PR-9");
    }

    #[test]
    fn extraction_is_repeatable() {
        let msg = message("example-1 Added som files for this issue");
        let first = msg.extract_issue_key(PATTERNS);
        let second = msg.extract_issue_key(PATTERNS);
        assert_eq!(first, second);
    }

    #[test]
    fn strip_keeps_unmodified_line_without_overrides_or_key() {
        let msg = message("example-1 Added som files for this issue");
        let stripped = msg.stripped(msg.override_flags(), false);
        assert_eq!(stripped, vec!["example-1 Added som files for this issue"]);
    }

    #[test]
    fn strip_uppercases_first_token_when_key_was_found() {
        let msg = message("example-1 Added som files for this issue");
        let stripped = msg.stripped(msg.override_flags(), true);
        assert_eq!(stripped, vec!["EXAMPLE-1 Added som files for this issue"]);
    }

    #[test]
    fn strip_removes_assignee_sentinel() {
        let msg = message("EXAMPLE-1 even more functionality added for wrong assignee -A");
        let stripped = msg.stripped(msg.override_flags(), false);
        assert_eq!(
            stripped,
            vec!["EXAMPLE-1 even more functionality added for wrong assignee"]
        );
    }

    #[test]
    fn strip_removes_communication_sentinel() {
        let msg = message("example-1 added some more functionality -O");
        let stripped = msg.stripped(msg.override_flags(), false);
        assert_eq!(stripped, vec!["EXAMPLE-1 added some more functionality"]);
    }

    #[test]
    fn strip_removes_entire_trailing_sentinel_run() {
        let msg = message("example-1 fixed the listing -O -A");
        let stripped = msg.stripped(msg.override_flags(), false);
        assert_eq!(stripped, vec!["EXAMPLE-1 fixed the listing"]);
    }

    #[test]
    fn strip_keeps_mid_line_sentinels() {
        let msg = message("EXAMPLE-1 fixed -O handling in the parser");
        let stripped = msg.stripped(msg.override_flags(), false);
        assert_eq!(stripped, vec!["EXAMPLE-1 fixed -O handling in the parser"]);
    }

    #[test]
    fn strip_keeps_body_lines_untouched() {
        let msg = CommitMessage::from_lines(
            PathBuf::from("COMMIT_EDITMSG"),
            vec![
                "example-1 fixed the listing -A".to_string(),
                String::new(),
                "details about -A flags stay as they are".to_string(),
            ],
        );
        let stripped = msg.stripped(msg.override_flags(), false);
        assert_eq!(
            stripped,
            vec![
                "EXAMPLE-1 fixed the listing".to_string(),
                String::new(),
                "details about -A flags stay as they are".to_string(),
            ]
        );
    }

    #[test]
    fn strip_never_removes_the_first_token() {
        let msg = message("-O");
        let stripped = msg.stripped(msg.override_flags(), false);
        assert_eq!(stripped, vec!["-O"]);
    }

    #[test]
    fn strip_of_empty_message_is_empty() {
        let msg = CommitMessage::from_lines(PathBuf::from("COMMIT_EDITMSG"), Vec::new());
        assert!(msg.stripped(OverrideFlags::default(), false).is_empty());
    }

    #[test]
    fn load_write_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("COMMIT_EDITMSG");
        std::fs::write(&path, "example-1 fix the build\n\nbody line\n").expect("write");

        let msg = CommitMessage::load(&path).expect("load");
        let stripped = msg.stripped(msg.override_flags(), false);
        msg.write(&stripped).expect("write back");

        let round_tripped = std::fs::read_to_string(&path).expect("read");
        assert_eq!(round_tripped, "example-1 fix the build\n\nbody line\n");
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(CommitMessage::load(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn load_empty_file_yields_zero_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("COMMIT_EDITMSG");
        std::fs::write(&path, "").expect("write");
        let msg = CommitMessage::load(&path).expect("load");
        assert!(msg.is_empty());
    }

    proptest! {
        #[test]
        fn extraction_is_idempotent(subject in "[ -~]{0,80}") {
            let msg = message(&subject);
            prop_assert_eq!(
                msg.extract_issue_key(PATTERNS),
                msg.extract_issue_key(PATTERNS)
            );
        }

        #[test]
        fn stripping_twice_is_stripping_once(subject in "[ -~]{0,80}") {
            let msg = message(&subject);
            let once = msg.stripped(msg.override_flags(), false);
            let again = CommitMessage::from_lines(PathBuf::from("COMMIT_EDITMSG"), once.clone());
            let twice = again.stripped(again.override_flags(), false);
            prop_assert_eq!(once, twice);
        }
    }
}
