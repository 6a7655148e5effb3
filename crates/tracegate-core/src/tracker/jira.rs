//! JIRA REST tracker client.
//!
//! Talks to `GET {address}/rest/api/2/issue/{KEY}` with basic
//! authentication. The password value configured in git is stored base64
//! encoded and is decoded on first use. Connection settings are validated
//! lazily so that overridden commits never require any tracker
//! configuration.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use super::types::{Issue, IssueRef, User};
use super::{IssueTracker, TrackerError};
use crate::config;
use crate::message::IssueKey;

/// JIRA REST client backed by a blocking HTTP client.
///
/// No `Debug` impl: the stored credential stays out of formatted output.
pub struct JiraTracker {
    address: Option<String>,
    username: Option<String>,
    encoded_password: Option<String>,
    link_types: Vec<String>,
}

/// Validated connection settings, resolved on first use.
struct Connection {
    base_url: String,
    username: String,
    password: String,
    http: Client,
}

impl JiraTracker {
    /// Creates a client over the configured connection values.
    ///
    /// Missing values are tolerated here and reported as
    /// [`TrackerError::Configuration`] when a fetch actually needs them.
    #[must_use]
    pub fn new(
        address: Option<String>,
        username: Option<String>,
        encoded_password: Option<String>,
        link_types: Vec<String>,
    ) -> Self {
        Self {
            address,
            username,
            encoded_password,
            link_types,
        }
    }

    fn connection(&self) -> Result<Connection, TrackerError> {
        let address = self.address.as_deref().ok_or_else(|| {
            TrackerError::Configuration(format!("{} is not set", config::ADDRESS_KEY))
        })?;
        let username = self.username.as_deref().ok_or_else(|| {
            TrackerError::Configuration(format!("{} is not set", config::USERNAME_KEY))
        })?;
        let encoded = self.encoded_password.as_deref().ok_or_else(|| {
            TrackerError::Configuration(format!("{} is not set", config::PASSWORD_KEY))
        })?;

        let decoded = STANDARD.decode(encoded.trim()).map_err(|err| {
            TrackerError::Configuration(format!(
                "{} is not valid base64: {err}",
                config::PASSWORD_KEY
            ))
        })?;
        let password = String::from_utf8(decoded).map_err(|_| {
            TrackerError::Configuration(format!(
                "{} does not decode to UTF-8",
                config::PASSWORD_KEY
            ))
        })?;

        let http = Client::builder().build().map_err(|err| {
            TrackerError::Configuration(format!("failed to build HTTP client: {err}"))
        })?;

        Ok(Connection {
            base_url: address.trim_end_matches('/').to_owned(),
            username: username.to_owned(),
            password,
            http,
        })
    }

    fn get_issue_json(&self, connection: &Connection, key: &str) -> Result<Value, TrackerError> {
        let url = format!("{}/rest/api/2/issue/{key}", connection.base_url);
        debug!(%url, "fetching issue");

        let response = connection
            .http
            .get(&url)
            .basic_auth(&connection.username, Some(&connection.password))
            .send()
            .map_err(|err| {
                if err.is_connect() {
                    TrackerError::ConnectionRefused
                } else {
                    TrackerError::Transport(err.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<Value>()
                .map_err(|err| TrackerError::Parse(err.to_string()));
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TrackerError::Unauthorized {
                status: status.as_u16(),
            }),
            StatusCode::NOT_FOUND => Err(TrackerError::NotFound {
                key: key.to_owned(),
            }),
            _ => Err(TrackerError::Api {
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            }),
        }
    }

    fn fetch_ref(&self, connection: &Connection, key: &str) -> Result<IssueRef, TrackerError> {
        let value = self.get_issue_json(connection, key)?;
        parse_ref(&value)
    }
}

impl IssueTracker for JiraTracker {
    fn fetch_issue(&self, key: &IssueKey) -> Result<Issue, TrackerError> {
        let connection = self.connection()?;
        let value = self.get_issue_json(&connection, key.as_str())?;
        let (mut issue, related_keys) = parse_issue(&value, &self.link_types)?;

        // One extra fetch per related key, for its key/summary pair.
        for related_key in related_keys {
            issue.related.push(self.fetch_ref(&connection, &related_key)?);
        }

        Ok(issue)
    }
}

fn field_str(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Parses the key/summary pair out of an issue payload.
fn parse_ref(value: &Value) -> Result<IssueRef, TrackerError> {
    let key = field_str(value, "/key")
        .ok_or_else(|| TrackerError::Parse("issue payload carries no key".to_string()))?;
    let summary = field_str(value, "/fields/summary").unwrap_or_default();
    Ok(IssueRef { key, summary })
}

/// Parses a full issue payload.
///
/// Returns the issue (with an empty related list) plus the keys of linked
/// issues whose link-type name case-insensitively matches one of
/// `link_types`. The parent issue is parsed inline from the payload.
fn parse_issue(value: &Value, link_types: &[String]) -> Result<(Issue, Vec<String>), TrackerError> {
    let base = parse_ref(value)?;

    let status = field_str(value, "/fields/status/name");
    let issue_type = field_str(value, "/fields/issuetype/name");
    let subtask = value
        .pointer("/fields/issuetype/subtask")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let resolution = field_str(value, "/fields/resolution/description");

    let assignee = value
        .pointer("/fields/assignee")
        .filter(|v| !v.is_null())
        .map(|v| User {
            username: field_str(v, "/name").unwrap_or_default(),
            display_name: field_str(v, "/displayName").unwrap_or_default(),
        });

    let parent = value
        .pointer("/fields/parent")
        .filter(|v| !v.is_null())
        .map(parse_ref)
        .transpose()?;

    let mut related_keys = Vec::new();
    if let Some(links) = value.pointer("/fields/issuelinks").and_then(Value::as_array) {
        for link in links {
            let Some(type_name) = link.pointer("/type/name").and_then(Value::as_str) else {
                continue;
            };
            if !link_types
                .iter()
                .any(|name| name.eq_ignore_ascii_case(type_name))
            {
                continue;
            }
            let target = link
                .pointer("/outwardIssue/key")
                .or_else(|| link.pointer("/inwardIssue/key"))
                .and_then(Value::as_str);
            if let Some(target_key) = target {
                related_keys.push(target_key.to_owned());
            }
        }
    }

    Ok((
        Issue {
            key: base.key,
            summary: base.summary,
            status,
            issue_type,
            subtask,
            parent,
            related: Vec::new(),
            assignee,
            resolution,
        },
        related_keys,
    ))
}
