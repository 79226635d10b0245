//! Host boundary: the typed input record and the result record.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashMap, fmt};
use tracing::error;

use crate::{
    client::ResourceReconciler,
    protocol::{Credentials, DesiredState, Outcome, Resource},
    transport::Transport,
    Result,
};

/// Prefix of the internal keys Ansible adds to every argument record
pub const HOST_INTERNAL_PREFIX: &str = "_ansible_";

/// Input record supplied by the orchestration host
///
/// Unknown keys are rejected, except the host's own `_ansible_*` keys which
/// are ignored.
#[derive(Clone, Deserialize)]
#[serde(try_from = "RawHostInput")]
pub struct HostInput {
    /// Data source body
    #[serde(alias = "resource")]
    pub datasource: Resource,
    /// Stack slug
    #[serde(alias = "stackSlug")]
    pub stack_slug: String,
    /// Cloud API key
    #[serde(alias = "apiKey")]
    pub cloud_api_key: String,
    /// Desired state
    #[serde(default, alias = "desiredState")]
    pub state: DesiredState,
}

#[derive(Deserialize)]
struct RawHostInput {
    #[serde(alias = "resource")]
    datasource: Resource,
    #[serde(alias = "stackSlug")]
    stack_slug: String,
    #[serde(alias = "apiKey")]
    cloud_api_key: String,
    #[serde(default, alias = "desiredState")]
    state: DesiredState,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

impl TryFrom<RawHostInput> for HostInput {
    type Error = String;

    fn try_from(raw: RawHostInput) -> std::result::Result<Self, String> {
        let mut unknown: Vec<&str> = raw
            .extra
            .keys()
            .map(String::as_str)
            .filter(|key| !key.starts_with(HOST_INTERNAL_PREFIX))
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            return Err(format!("unknown field(s): {}", unknown.join(", ")));
        }

        Ok(Self {
            datasource: raw.datasource,
            stack_slug: raw.stack_slug,
            cloud_api_key: raw.cloud_api_key,
            state: raw.state,
        })
    }
}

impl HostInput {
    /// Parses an input record from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Validated credentials built from the record
    pub fn credentials(&self) -> Result<Credentials> {
        Credentials::new(self.stack_slug.clone(), self.cloud_api_key.clone())
    }
}

impl fmt::Debug for HostInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostInput")
            .field("datasource", &self.datasource)
            .field("stack_slug", &self.stack_slug)
            .field("cloud_api_key", &"<redacted>")
            .field("state", &self.state)
            .finish()
    }
}

/// Result record handed back to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostResult {
    /// The operation took effect
    Success {
        /// Whether anything changed on the platform
        changed: bool,
        /// Response body of the last request
        output: Value,
    },
    /// The operation was rejected or could not run
    Failure {
        /// Always `true`
        failed: bool,
        /// `{status, response}` for rejections, error text otherwise
        msg: Value,
    },
}

impl HostResult {
    /// Failure record with the given message
    pub fn failure(msg: impl Into<Value>) -> Self {
        HostResult::Failure {
            failed: true,
            msg: msg.into(),
        }
    }

    /// Whether this is a failure record
    pub fn is_failure(&self) -> bool {
        matches!(self, HostResult::Failure { .. })
    }

    /// Process exit code for the host
    pub fn exit_code(&self) -> i32 {
        if self.is_failure() {
            1
        } else {
            0
        }
    }
}

impl From<Outcome> for HostResult {
    fn from(outcome: Outcome) -> Self {
        if outcome.is_error {
            HostResult::failure(outcome.payload)
        } else {
            HostResult::Success {
                changed: outcome.changed,
                output: outcome.payload,
            }
        }
    }
}

/// Runs the operation selected by the input's desired state
pub async fn dispatch<T: Transport>(
    reconciler: &ResourceReconciler<T>,
    input: &HostInput,
) -> Result<Outcome> {
    let credentials = input.credentials()?;
    match input.state {
        DesiredState::Present => reconciler.upsert(&input.datasource, &credentials).await,
        DesiredState::Absent => reconciler.delete(&input.datasource, &credentials).await,
    }
}

/// Runs the operation and folds every error into a failure record
pub async fn run<T: Transport>(reconciler: &ResourceReconciler<T>, input: &HostInput) -> HostResult {
    match dispatch(reconciler, input).await {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            error!(name = input.datasource.name(), state = %input.state, "Reconcile failed: {}", e);
            HostResult::failure(e.to_string())
        }
    }
}
