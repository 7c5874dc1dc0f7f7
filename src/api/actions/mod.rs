//! Storage service operations
//!
//! One action per operation of the consumed protocol: initiate, per-part
//! pre-signed target, part transmission, complete, abort, single-shot, and
//! the metadata probe / byte fetch for URL sources.

use crate::api::responses::ErrorResponse;
use reqwest::{Response, StatusCode};
use thiserror::Error;

mod create_multipart_upload;
pub use self::create_multipart_upload::CreateMultipartUpload;

mod part_upload_target;
pub use self::part_upload_target::PartUploadTarget;

mod transmit_part;
pub use self::transmit_part::{PartPayload, TransmitPart};

mod complete_multipart_upload;
pub use self::complete_multipart_upload::{CompleteMultipartUpload, UploadedPart};

mod abort_multipart_upload;
pub use self::abort_multipart_upload::AbortMultipartUpload;

mod single_shot_upload;
pub use self::single_shot_upload::SingleShotUpload;

mod probe_source;
pub use self::probe_source::ProbeSource;

mod fetch_source;
pub use self::fetch_source::FetchSource;

/// A non-success HTTP response from the service or a pre-signed target.
///
/// Kept as a typed error so the retry policy can tell transient statuses
/// from permanent ones.
#[derive(Debug, Error)]
#[error("HTTP {status}: {detail}")]
pub struct ResponseError {
    pub status: StatusCode,
    pub detail: String,
}

/// Collect the status and error detail of a failed response.
pub async fn response_error(response: Response) -> anyhow::Error {
    let status = response.status();

    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);

    let body = response.text().await.unwrap_or_default();

    let mut detail = serde_json::from_str::<ErrorResponse>(&body)
        .ok()
        .map(|parsed| parsed.error)
        .filter(|error| !error.is_empty())
        .unwrap_or(body);

    if let Some(request_id) = request_id {
        detail = format!("{detail} (request id: {request_id})");
    }

    anyhow::Error::new(ResponseError { status, detail })
}
