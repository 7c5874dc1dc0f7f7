//! Service response shapes

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMultipartUploadResult {
    pub upload_id: String,
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct PartUploadTargetResult {
    /// Pre-signed URL to PUT the part bytes to
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct SingleShotUploadResult {
    pub key: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: String,
}

/// Result of the metadata probe on a URL source.
///
/// Both fields are required for a source to be accepted; the caller rejects
/// anything less before a transfer starts.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}
