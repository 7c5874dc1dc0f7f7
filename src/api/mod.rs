pub mod actions;
pub mod request;
pub mod responses;

use anyhow::{Result, anyhow};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

/// Handle to the blob-storage service consumed by every transfer.
#[derive(Debug, Clone)]
pub struct Endpoint {
    base_url: Url,
    access_token: SecretString,
}

impl Endpoint {
    /// # Errors
    ///
    /// Will return `Err` if `base_url` is not a valid URL
    pub fn new(base_url: &str, access_token: SecretString) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            access_token,
        })
    }

    /// Service URL for the given path segments.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the endpoint URL cannot carry path segments
    pub fn url_for(&self, path: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("endpoint URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(path);
        Ok(url)
    }

    /// Value for the `authorization` header on service calls.
    #[must_use]
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }
}
