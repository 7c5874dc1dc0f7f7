use crate::api::{
    Endpoint,
    actions::response_error,
    request,
    responses::PartUploadTargetResult,
};
use anyhow::Result;
use serde::Serialize;

/// Request a pre-signed destination for one part.
#[derive(Debug)]
pub struct PartUploadTarget<'a> {
    key: &'a str,
    upload_id: &'a str,
    part_number: u16,
    content_length: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Payload<'a> {
    key: &'a str,
    upload_id: &'a str,
    part_number: u16,
    content_length: u64,
}

impl<'a> PartUploadTarget<'a> {
    #[must_use]
    pub const fn new(
        key: &'a str,
        upload_id: &'a str,
        part_number: u16,
        content_length: u64,
    ) -> Self {
        Self {
            key,
            upload_id,
            part_number,
            content_length,
        }
    }

    /// # Errors
    ///
    /// Will return `Err` if the request cannot be made or is rejected
    pub async fn request(&self, endpoint: &Endpoint) -> Result<PartUploadTargetResult> {
        let url = endpoint.url_for(&["v1", "uploads", "multipart", "part"])?;
        let response = request::post_json(url, &endpoint.authorization(), &self.payload()).await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(response_error(response).await)
        }
    }

    const fn payload(&self) -> Payload<'a> {
        Payload {
            key: self.key,
            upload_id: self.upload_id,
            part_number: self.part_number,
            content_length: self.content_length,
        }
    }
}
