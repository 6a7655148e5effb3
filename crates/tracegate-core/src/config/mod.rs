//! Git-configuration lookup for hook settings.
//!
//! Values are read by shelling out to `git config`, mirroring how the hook
//! is deployed: connection settings live in the user's global
//! configuration, project keys and the policy-file pointer in the
//! repository's local configuration. A missing key is an absent value,
//! never an error.

use std::process::Command;

use thiserror::Error;
use tracing::debug;

/// Global key holding the tracker username.
pub const USERNAME_KEY: &str = "githook.jira.username";

/// Global key holding the base64-encoded tracker password.
pub const PASSWORD_KEY: &str = "githook.jira.password";

/// Global key holding the tracker base address.
pub const ADDRESS_KEY: &str = "githook.jira.address";

/// Local, multi-valued key listing recognized project-key prefixes.
pub const PROJECT_KEYS_KEY: &str = "githook.jira.projectkey";

/// Local key pointing at a policy-table file.
pub const POLICY_FILE_KEY: &str = "githook.policyfile";

/// Lookup scope for a configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Global (per-user) configuration only.
    Global,
    /// Local configuration, falling through git's normal precedence.
    Local,
}

/// Errors raised while consulting git configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The `git` binary could not be run.
    #[error("failed to run git config: {0}")]
    Spawn(#[from] std::io::Error),

    /// Git produced output that is not UTF-8.
    #[error("git config produced non-UTF-8 output for {key}")]
    Encoding {
        /// The key being read.
        key: String,
    },
}

/// Reads a single configuration value.
///
/// Returns `Ok(None)` when the key is unset (git exits non-zero for
/// missing keys).
///
/// # Errors
///
/// Returns an error when git cannot be spawned or its output is not
/// UTF-8.
pub fn value(key: &str, scope: Scope) -> Result<Option<String>, ConfigError> {
    let mut command = Command::new("git");
    command.arg("config");
    if scope == Scope::Global {
        command.arg("--global");
    }
    command.arg(key);
    run(command, key, false)
}

/// Reads a multi-valued configuration key, joining the values with single
/// spaces.
///
/// # Errors
///
/// Returns an error when git cannot be spawned or its output is not
/// UTF-8.
pub fn multi_value(key: &str) -> Result<Option<String>, ConfigError> {
    let mut command = Command::new("git");
    command.args(["config", "--get-all", key]);
    run(command, key, true)
}

fn run(mut command: Command, key: &str, multi: bool) -> Result<Option<String>, ConfigError> {
    let output = command.output()?;
    if !output.status.success() {
        debug!(key, "configuration value not set");
        return Ok(None);
    }

    let stdout = String::from_utf8(output.stdout).map_err(|_| ConfigError::Encoding {
        key: key.to_owned(),
    })?;
    let joined = if multi {
        stdout.lines().collect::<Vec<_>>().join(" ")
    } else {
        stdout.lines().next().unwrap_or_default().to_owned()
    };

    if joined.is_empty() {
        Ok(None)
    } else {
        Ok(Some(joined))
    }
}
