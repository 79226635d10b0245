pub mod message;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use message::*;

use crate::{Error, Result};

/// Collection path of the data source API on every stack
pub const DATASOURCES_PATH: &str = "api/datasources";

/// Placeholder substituted with the stack slug in URL templates
pub const STACK_SLUG_PLACEHOLDER: &str = "{stack_slug}";

/// Default stack URL template
pub const DEFAULT_STACK_URL_TEMPLATE: &str = "https://{stack_slug}.grafana.net";

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Stack credentials used for a single call
#[derive(Clone)]
pub struct Credentials {
    /// Stack slug, the first DNS label of the stack host
    pub stack_slug: String,
    /// Cloud API key sent as a bearer token
    pub api_key: String,
}

impl Credentials {
    /// Creates validated credentials
    pub fn new(stack_slug: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let credentials = Self {
            stack_slug: stack_slug.into(),
            api_key: api_key.into(),
        };
        credentials.validate()?;
        Ok(credentials)
    }

    /// Checks the slug is usable as a host label and the key is non-empty
    pub fn validate(&self) -> Result<()> {
        if !is_dns_label(&self.stack_slug) {
            return Err(Error::InvalidCredentials(format!(
                "stack slug '{}' is not a valid DNS label",
                self.stack_slug
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(Error::InvalidCredentials("API key is empty".into()));
        }
        Ok(())
    }

    /// Value of the Authorization header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("stack_slug", &self.stack_slug)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

fn is_dns_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Desired state of the resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// Resource should exist with the given body
    #[default]
    Present,
    /// Resource should not exist
    Absent,
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesiredState::Present => write!(f, "present"),
            DesiredState::Absent => write!(f, "absent"),
        }
    }
}

impl std::str::FromStr for DesiredState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "present" => Ok(DesiredState::Present),
            "absent" => Ok(DesiredState::Absent),
            other => Err(Error::InvalidState(format!(
                "unknown state '{}', expected one of: present, absent",
                other
            ))),
        }
    }
}
