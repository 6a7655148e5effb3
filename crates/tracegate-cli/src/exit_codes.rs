//! Process exit codes returned to git.
//!
//! Git blocks the commit on any non-zero exit; the distinct values let
//! wrappers tell an operational failure from a policy rejection.

/// Exit code values.
pub mod codes {
    /// The commit may proceed (including override and empty-message paths).
    pub const SUCCESS: u8 = 0;

    /// Operational failure: I/O, configuration, or tracker error.
    pub const OPERATIONAL_ERROR: u8 = 1;

    /// Policy rejection: the commit is blocked by issue state.
    pub const POLICY_REJECTION: u8 = 2;
}
