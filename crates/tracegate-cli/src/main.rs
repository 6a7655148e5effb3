//! tracegate — issue-tracker commit-message hook.
//!
//! Installed as a git `commit-msg` hook: git passes the path of the
//! pending commit-message file as the sole positional argument. Exit code
//! 0 lets the commit through; 1 signals an operational failure and 2 a
//! policy rejection.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracegate_core::config;
use tracegate_core::gate::{CommitGate, HookOutcome};
use tracegate_core::message::CommitMessage;
use tracegate_core::policy::PolicyTables;
use tracegate_core::tracker::JiraTracker;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod exit_codes;

use exit_codes::codes;

/// tracegate — issue-tracker commit-message hook
#[derive(Parser, Debug)]
#[command(name = "tracegate")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the commit-message file passed by git
    commit_msg_file: PathBuf,

    /// Path to a policy-table file (overrides githook.policyfile)
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // The hook must hand precise exit codes back to git, so bypass the
    // Result-based main convention.
    std::process::exit(i32::from(run(&cli)));
}

fn run(cli: &Cli) -> u8 {
    info!("tracegate hook v{}", env!("CARGO_PKG_VERSION"));

    let message = match CommitMessage::load(&cli.commit_msg_file) {
        Ok(message) => message,
        Err(err) => {
            error!("{err}");
            return codes::OPERATIONAL_ERROR;
        },
    };

    let (policy, username, tracker) = match assemble(cli) {
        Ok(parts) => parts,
        Err(err) => {
            error!("{err:#}");
            return codes::OPERATIONAL_ERROR;
        },
    };

    let key_patterns = match config::multi_value(config::PROJECT_KEYS_KEY) {
        Ok(patterns) => patterns,
        Err(err) => {
            error!("{err}");
            return codes::OPERATIONAL_ERROR;
        },
    };

    let hook_info = format!("tracegate hook v{}", env!("CARGO_PKG_VERSION"));
    let gate = CommitGate::new(&tracker, &policy, key_patterns, username, hook_info);

    match gate.run(&message) {
        Ok(HookOutcome::Accepted { .. }) => codes::SUCCESS,
        Ok(HookOutcome::Rejected { reasons }) => {
            for reason in &reasons {
                eprintln!("tracegate: commit blocked: {reason}");
            }
            codes::POLICY_REJECTION
        },
        Err(err) => {
            error!("{err}");
            codes::OPERATIONAL_ERROR
        },
    }
}

/// Loads policy tables and connection settings from git configuration.
fn assemble(cli: &Cli) -> anyhow::Result<(PolicyTables, Option<String>, JiraTracker)> {
    let policy = load_policy(cli)?;

    let username = config::value(config::USERNAME_KEY, config::Scope::Global)?;
    let password = config::value(config::PASSWORD_KEY, config::Scope::Global)?;
    let address = config::value(config::ADDRESS_KEY, config::Scope::Global)?;

    let tracker = JiraTracker::new(address, username.clone(), password, policy.links.types.clone());
    Ok((policy, username, tracker))
}

fn load_policy(cli: &Cli) -> anyhow::Result<PolicyTables> {
    if let Some(path) = &cli.policy {
        return PolicyTables::from_file(path)
            .with_context(|| format!("loading policy tables from {}", path.display()));
    }

    if let Some(configured) = config::value(config::POLICY_FILE_KEY, config::Scope::Local)? {
        let path = PathBuf::from(configured);
        return PolicyTables::from_file(&path)
            .with_context(|| format!("loading policy tables from {}", path.display()));
    }

    Ok(PolicyTables::embedded_default())
}
