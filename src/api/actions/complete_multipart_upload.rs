use crate::api::{Endpoint, actions::response_error, request};
use anyhow::Result;
use serde::Serialize;

/// One committed part as the completion call expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedPart {
    pub part_number: u16,
    pub e_tag: String,
}

/// Assemble the object from its committed parts.
///
/// Parts must be in ascending part-number order with no gaps; the service
/// rejects anything else.
#[derive(Debug)]
pub struct CompleteMultipartUpload<'a> {
    key: &'a str,
    upload_id: &'a str,
    transfer_id: &'a str,
    parts: Vec<UploadedPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Payload<'a> {
    key: &'a str,
    upload_id: &'a str,
    transfer_id: &'a str,
    parts: &'a [UploadedPart],
}

impl<'a> CompleteMultipartUpload<'a> {
    #[must_use]
    pub const fn new(
        key: &'a str,
        upload_id: &'a str,
        transfer_id: &'a str,
        parts: Vec<UploadedPart>,
    ) -> Self {
        Self {
            key,
            upload_id,
            transfer_id,
            parts,
        }
    }

    /// # Errors
    ///
    /// Will return `Err` if the request cannot be made or is rejected
    pub async fn request(&self, endpoint: &Endpoint) -> Result<()> {
        let url = endpoint.url_for(&["v1", "uploads", "multipart", "complete"])?;
        let response = request::post_json(url, &endpoint.authorization(), &self.payload()).await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(response_error(response).await)
        }
    }

    fn payload(&self) -> Payload<'_> {
        Payload {
            key: self.key,
            upload_id: self.upload_id,
            transfer_id: self.transfer_id,
            parts: &self.parts,
        }
    }
}
