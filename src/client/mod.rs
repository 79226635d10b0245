//! Create, update and delete of data sources by name.
//!
//! Upsert tries a create first and falls back to an id lookup plus update
//! when the platform answers 409. The id always comes from the lookup
//! response. If the data source is renamed or removed between the conflict
//! and the lookup, the update targets whatever the lookup returned; the API
//! offers no way to close that window.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    protocol::{Credentials, Outcome, Resource},
    transport::{ApiMethod, ApiRequest, ApiResponse, HttpTransport, Transport, TransportConfig},
    Result,
};

pub mod endpoints;

pub use endpoints::Endpoints;

/// Reconciles data sources against a stack's API
pub struct ResourceReconciler<T = HttpTransport> {
    transport: T,
    stack_url_template: String,
}

impl ResourceReconciler<HttpTransport> {
    /// Create a reconciler backed by a reqwest transport
    pub fn from_config(config: &TransportConfig) -> Result<Self> {
        Ok(Self::new(
            HttpTransport::new(config)?,
            config.stack_url_template.clone(),
        ))
    }
}

impl<T: Transport> ResourceReconciler<T> {
    /// Create a reconciler over any transport
    ///
    /// `stack_url_template` is the stack base URL with an optional
    /// `{stack_slug}` placeholder.
    pub fn new(transport: T, stack_url_template: impl Into<String>) -> Self {
        Self {
            transport,
            stack_url_template: stack_url_template.into(),
        }
    }

    /// Creates the data source, or updates it when one with the same name exists
    pub async fn upsert(&self, resource: &Resource, credentials: &Credentials) -> Result<Outcome> {
        let endpoints = Endpoints::new(&self.stack_url_template, credentials)?;
        let body = Value::Object(resource.body().clone());

        info!(name = resource.name(), stack = %credentials.stack_slug, "Creating data source");
        let created = self
            .transport
            .execute(
                ApiRequest::new(ApiMethod::Post, endpoints.collection(), credentials)
                    .with_body(body.clone()),
            )
            .await?;

        if created.is_ok() {
            return Ok(Outcome::changed(created.body));
        }
        if !created.is_conflict() {
            warn!(name = resource.name(), status = created.status, "Create rejected");
            return Ok(Outcome::rejected_from_body(created.status, &created.body));
        }

        debug!(name = resource.name(), "Data source exists, resolving id");
        let lookup = self
            .transport
            .execute(ApiRequest::new(
                ApiMethod::Get,
                endpoints.id_lookup(resource.name()),
                credentials,
            ))
            .await?;

        let Some(id) = resolved_id(&lookup) else {
            warn!(name = resource.name(), status = lookup.status, "Id lookup failed");
            return Ok(Outcome::rejected_from_body(lookup.status, &lookup.body));
        };

        info!(name = resource.name(), id, "Updating data source");
        let updated = self
            .transport
            .execute(ApiRequest::new(ApiMethod::Put, endpoints.by_id(id), credentials).with_body(body))
            .await?;

        if updated.is_ok() {
            Ok(Outcome::changed(updated.body))
        } else {
            warn!(name = resource.name(), id, status = updated.status, "Update rejected");
            Ok(Outcome::rejected_from_body(updated.status, &updated.body))
        }
    }

    /// Deletes the data source by name
    ///
    /// A missing data source is reported as a rejection, not as a no-op.
    pub async fn delete(&self, resource: &Resource, credentials: &Credentials) -> Result<Outcome> {
        let endpoints = Endpoints::new(&self.stack_url_template, credentials)?;

        info!(name = resource.name(), stack = %credentials.stack_slug, "Deleting data source");
        let deleted = self
            .transport
            .execute(ApiRequest::new(
                ApiMethod::Delete,
                endpoints.by_name(resource.name()),
                credentials,
            ))
            .await?;

        if deleted.is_ok() {
            Ok(Outcome::changed(deleted.body))
        } else {
            warn!(name = resource.name(), status = deleted.status, "Delete rejected");
            Ok(Outcome::rejected_from_body(deleted.status, &deleted.body))
        }
    }
}

/// Numeric id from a successful lookup, given as a JSON integer or a digit string
fn resolved_id(lookup: &ApiResponse) -> Option<i64> {
    if !lookup.is_ok() {
        return None;
    }
    match lookup.body.get("id")? {
        Value::Number(id) => id.as_i64(),
        Value::String(id) if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) => {
            id.parse().ok()
        }
        _ => None,
    }
}
