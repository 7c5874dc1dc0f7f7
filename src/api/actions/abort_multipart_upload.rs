use crate::api::{Endpoint, actions::response_error, request};
use anyhow::Result;
use serde::Serialize;

/// Release a multipart upload's server-side resources.
///
/// Cleanup step: callers treat a failure here as non-fatal.
#[derive(Debug)]
pub struct AbortMultipartUpload<'a> {
    key: &'a str,
    upload_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Payload<'a> {
    key: &'a str,
    upload_id: &'a str,
}

impl<'a> AbortMultipartUpload<'a> {
    #[must_use]
    pub const fn new(key: &'a str, upload_id: &'a str) -> Self {
        Self { key, upload_id }
    }

    /// # Errors
    ///
    /// Will return `Err` if the request cannot be made or is rejected
    pub async fn request(&self, endpoint: &Endpoint) -> Result<()> {
        let url = endpoint.url_for(&["v1", "uploads", "multipart"])?;
        let response =
            request::delete_json(url, &endpoint.authorization(), &self.payload()).await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(response_error(response).await)
        }
    }

    const fn payload(&self) -> Payload<'a> {
        Payload {
            key: self.key,
            upload_id: self.upload_id,
        }
    }
}
