use url::Url;

use crate::{
    protocol::{Credentials, DATASOURCES_PATH, STACK_SLUG_PLACEHOLDER},
    Error, Result,
};

/// URLs of the data source API for one stack
///
/// Names and ids are pushed as single path segments so reserved characters
/// are percent-encoded instead of changing the path.
#[derive(Debug, Clone)]
pub struct Endpoints {
    collection: Url,
}

impl Endpoints {
    /// Resolves the stack URL template for the given credentials
    pub fn new(stack_url_template: &str, credentials: &Credentials) -> Result<Self> {
        credentials.validate()?;

        let base = stack_url_template.replace(STACK_SLUG_PLACEHOLDER, &credentials.stack_slug);
        let mut collection = Url::parse(&base)?;
        if collection.cannot_be_a_base() {
            return Err(Error::InvalidUrl(format!("'{}' cannot be a base URL", base)));
        }
        collection.set_query(None);
        collection.set_fragment(None);

        collection
            .path_segments_mut()
            .map_err(|_| Error::InvalidUrl(format!("'{}' cannot be a base URL", base)))?
            .pop_if_empty()
            .extend(DATASOURCES_PATH.split('/'));

        Ok(Self { collection })
    }

    /// `POST` target
    pub fn collection(&self) -> Url {
        self.collection.clone()
    }

    /// `GET .../id/{name}`
    pub fn id_lookup(&self, name: &str) -> Url {
        self.child(&["id", name])
    }

    /// `PUT .../{id}`
    pub fn by_id(&self, id: i64) -> Url {
        let id = id.to_string();
        self.child(&[id.as_str()])
    }

    /// `DELETE .../{name}`
    pub fn by_name(&self, name: &str) -> Url {
        self.child(&[name])
    }

    fn child(&self, segments: &[&str]) -> Url {
        let mut url = self.collection.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }
}
