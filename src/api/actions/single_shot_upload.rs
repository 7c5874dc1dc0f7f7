use crate::api::{
    Endpoint,
    actions::{PartPayload, response_error},
    responses::SingleShotUploadResult,
};
use anyhow::Result;
use tokio::sync::mpsc::UnboundedSender;

/// Send a whole payload in one request.
///
/// Used below the single-part threshold, where restarting the transfer
/// wholesale is cheaper than multipart bookkeeping.
#[derive(Debug)]
pub struct SingleShotUpload<'a> {
    name: &'a str,
    transfer_id: &'a str,
    mime_type: &'a str,
    payload: PartPayload<'a>,
    tap: Option<UnboundedSender<usize>>,
}

impl<'a> SingleShotUpload<'a> {
    #[must_use]
    pub const fn new(
        name: &'a str,
        transfer_id: &'a str,
        mime_type: &'a str,
        payload: PartPayload<'a>,
        tap: Option<UnboundedSender<usize>>,
    ) -> Self {
        Self {
            name,
            transfer_id,
            mime_type,
            payload,
            tap,
        }
    }

    /// # Errors
    ///
    /// Will return `Err` if the request cannot be made or is rejected
    pub async fn request(&self, endpoint: &Endpoint) -> Result<SingleShotUploadResult> {
        let mut url = endpoint.url_for(&["v1", "uploads", "single"])?;
        url.query_pairs_mut()
            .append_pair("transferId", self.transfer_id)
            .append_pair("name", self.name);

        let authorization = endpoint.authorization();
        let response = self
            .payload
            .put(url, Some(&authorization), self.mime_type, self.tap.clone())
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(response_error(response).await)
        }
    }
}
