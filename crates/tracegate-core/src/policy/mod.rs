//! Commit-policy tables: allowed workflow statuses and related-link names.
//!
//! Tables are loaded once per invocation from a TOML document and are
//! immutable afterwards. An issue type with no entry, or an empty status
//! set, permits no status at all — the gate fails closed.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default policy shipped with the hook, used when no policy file is
/// configured.
const DEFAULT_POLICY: &str = include_str!("default_policy.toml");

/// Policy-table loading errors.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy file could not be read.
    #[error("failed to read policy file: {0}")]
    Io(#[from] std::io::Error),

    /// The policy document is not valid TOML.
    #[error("failed to parse policy tables: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Allowed-status tables plus the link-type names used for traceability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyTables {
    /// Issue-type name to the set of workflow statuses that permit
    /// committing.
    #[serde(default)]
    pub statuses: BTreeMap<String, BTreeSet<String>>,

    /// Link types that make a linked issue count as related.
    #[serde(default)]
    pub links: LinkTypes,
}

/// Names of the issue-link types that connect related issues.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkTypes {
    /// Link-type names, compared case-insensitively against the tracker's
    /// reported link types.
    #[serde(default)]
    pub types: Vec<String>,
}

impl PolicyTables {
    /// Parses policy tables from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Parse`] for malformed input; a malformed
    /// policy document is fatal for the invocation.
    pub fn from_toml(content: &str) -> Result<Self, PolicyError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads policy tables from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file is unreadable or malformed.
    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Returns the tables embedded in the binary.
    ///
    /// Falls back to empty tables (which permit nothing) should the
    /// embedded document ever fail to parse; a unit test pins its validity.
    #[must_use]
    pub fn embedded_default() -> Self {
        toml::from_str(DEFAULT_POLICY).unwrap_or_default()
    }

    /// Returns true when `status` permits committing against an issue of
    /// `issue_type`.
    ///
    /// Fails closed: an unknown issue type or an empty status set permits
    /// nothing. Status membership is an exact match.
    #[must_use]
    pub fn allows_commit(&self, issue_type: &str, status: &str) -> bool {
        self.statuses
            .get(issue_type)
            .is_some_and(|allowed| allowed.contains(status))
    }
}

#[cfg(test)]
mod tests {
    use super::PolicyTables;

    #[test]
    fn parses_statuses_and_links() {
        let tables = PolicyTables::from_toml(
            r#"
            [statuses]
            "Improvement" = ["In Progress"]
            "Bug" = ["In Progress", "Reopened"]

            [links]
            types = ["Relates", "Blocks"]
            "#,
        )
        .expect("parse");

        assert!(tables.allows_commit("Improvement", "In Progress"));
        assert!(tables.allows_commit("Bug", "Reopened"));
        assert_eq!(tables.links.types, vec!["Relates", "Blocks"]);
    }

    #[test]
    fn unknown_issue_type_permits_nothing() {
        let tables = PolicyTables::from_toml(
            r#"
            [statuses]
            "Improvement" = ["In Progress"]
            "#,
        )
        .expect("parse");

        assert!(!tables.allows_commit("Epic", "In Progress"));
    }

    #[test]
    fn empty_status_set_permits_nothing() {
        let tables = PolicyTables::from_toml(
            r#"
            [statuses]
            "Improvement" = []
            "#,
        )
        .expect("parse");

        assert!(!tables.allows_commit("Improvement", "In Progress"));
    }

    #[test]
    fn status_membership_is_exact() {
        let tables = PolicyTables::from_toml(
            r#"
            [statuses]
            "Improvement" = ["In Progress"]
            "#,
        )
        .expect("parse");

        assert!(!tables.allows_commit("Improvement", "in progress"));
        assert!(!tables.allows_commit("Improvement", "To-Do"));
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(PolicyTables::from_toml("statuses = 3").is_err());
    }

    #[test]
    fn embedded_default_parses_and_is_nonempty() {
        let tables = PolicyTables::embedded_default();
        assert!(!tables.statuses.is_empty());
        assert!(!tables.links.types.is_empty());
        assert!(tables.allows_commit("Improvement", "In Progress"));
    }
}
