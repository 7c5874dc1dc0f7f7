use crate::api::{actions::response_error, request, responses::ProbeResult};
use anyhow::Result;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use url::Url;

/// Metadata probe for a URL source.
///
/// A source whose probe lacks either field is rejected before any transfer
/// is attempted.
#[derive(Debug)]
pub struct ProbeSource<'a> {
    url: &'a Url,
}

impl<'a> ProbeSource<'a> {
    #[must_use]
    pub const fn new(url: &'a Url) -> Self {
        Self { url }
    }

    /// # Errors
    ///
    /// Will return `Err` if the request cannot be made or is rejected
    pub async fn request(&self) -> Result<ProbeResult> {
        let response = request::head(self.url.clone()).await?;

        if !response.status().is_success() {
            return Err(response_error(response).await);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| {
                // strip any charset parameter
                value.split(';').next().unwrap_or(value).trim().to_string()
            })
            .filter(|value| !value.is_empty());

        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());

        Ok(ProbeResult {
            content_type,
            content_length,
        })
    }
}
