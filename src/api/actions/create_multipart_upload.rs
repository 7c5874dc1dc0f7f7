use crate::api::{
    Endpoint,
    actions::response_error,
    request,
    responses::CreateMultipartUploadResult,
};
use anyhow::Result;
use serde::Serialize;

/// Initiate a multipart upload and obtain its upload id and storage key.
#[derive(Debug)]
pub struct CreateMultipartUpload<'a> {
    mime_type: &'a str,
    original_name: &'a str,
    transfer_id: &'a str,
    size: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Payload<'a> {
    mime_type: &'a str,
    original_name: &'a str,
    transfer_id: &'a str,
    size: u64,
}

impl<'a> CreateMultipartUpload<'a> {
    #[must_use]
    pub const fn new(
        mime_type: &'a str,
        original_name: &'a str,
        transfer_id: &'a str,
        size: u64,
    ) -> Self {
        Self {
            mime_type,
            original_name,
            transfer_id,
            size,
        }
    }

    /// # Errors
    ///
    /// Will return `Err` if the request cannot be made or is rejected
    pub async fn request(&self, endpoint: &Endpoint) -> Result<CreateMultipartUploadResult> {
        let url = endpoint.url_for(&["v1", "uploads", "multipart"])?;
        let response = request::post_json(url, &endpoint.authorization(), &self.payload()).await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(response_error(response).await)
        }
    }

    const fn payload(&self) -> Payload<'a> {
        Payload {
            mime_type: self.mime_type,
            original_name: self.original_name,
            transfer_id: self.transfer_id,
            size: self.size,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_shape() {
        let action = CreateMultipartUpload::new("audio/mpeg", "a.mp3", "t-1", 2048);
        let value = serde_json::to_value(action.payload()).unwrap();
        assert_eq!(
            value,
            json!({
                "mimeType": "audio/mpeg",
                "originalName": "a.mp3",
                "transferId": "t-1",
                "size": 2048,
            })
        );
    }
}
