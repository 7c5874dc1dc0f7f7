use crate::api::{actions::response_error, request};
use anyhow::Result;
use reqwest::Response;
use url::Url;

/// Open the inbound byte stream of a URL source.
#[derive(Debug)]
pub struct FetchSource<'a> {
    url: &'a Url,
}

impl<'a> FetchSource<'a> {
    #[must_use]
    pub const fn new(url: &'a Url) -> Self {
        Self { url }
    }

    /// # Errors
    ///
    /// Will return `Err` if the request cannot be made or is rejected
    pub async fn request(&self) -> Result<Response> {
        let response = request::get(self.url.clone()).await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(response_error(response).await)
        }
    }
}
