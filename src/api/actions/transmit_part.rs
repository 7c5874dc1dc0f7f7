use crate::api::{actions::response_error, request};
use anyhow::{Result, anyhow};
use bytes::Bytes;
use std::path::Path;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

/// Bytes for one part or single-shot transmission.
///
/// File payloads are streamed from disk on every attempt; in-memory payloads
/// are reference-counted, so retries do not copy them.
#[derive(Debug, Clone)]
pub enum PartPayload<'a> {
    File {
        path: &'a Path,
        seek: u64,
        chunk: u64,
    },
    Bytes(Bytes),
}

impl PartPayload<'_> {
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Self::File { chunk, .. } => *chunk,
            Self::Bytes(bytes) => bytes.len() as u64,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) async fn put(
        &self,
        url: Url,
        authorization: Option<&str>,
        content_type: &str,
        tap: Option<UnboundedSender<usize>>,
    ) -> Result<reqwest::Response> {
        match self {
            Self::File { path, seek, chunk } => {
                request::put_file_slice(url, authorization, content_type, path, *seek, *chunk, tap)
                    .await
            }
            Self::Bytes(bytes) => {
                request::put_bytes(url, authorization, content_type, bytes.clone(), tap).await
            }
        }
    }
}

/// Transmit one part's bytes to its pre-signed destination.
///
/// The opaque `ETag` response header is the part's checksum token; a success
/// without one is treated as an error.
#[derive(Debug)]
pub struct TransmitPart<'a> {
    target: &'a str,
    content_type: &'a str,
    payload: PartPayload<'a>,
    tap: Option<UnboundedSender<usize>>,
}

impl<'a> TransmitPart<'a> {
    #[must_use]
    pub const fn new(
        target: &'a str,
        content_type: &'a str,
        payload: PartPayload<'a>,
        tap: Option<UnboundedSender<usize>>,
    ) -> Self {
        Self {
            target,
            content_type,
            payload,
            tap,
        }
    }

    /// # Errors
    ///
    /// Will return `Err` if the transmission fails or no `ETag` is returned
    pub async fn request(&self) -> Result<String> {
        let url = Url::parse(self.target)?;
        let response = self
            .payload
            .put(url, None, self.content_type, self.tap.clone())
            .await?;

        if response.status().is_success() {
            match response.headers().get("ETag") {
                Some(etag) => Ok(etag.to_str()?.to_string()),
                None => Err(anyhow!("missing ETag in part response")),
            }
        } else {
            Err(response_error(response).await)
        }
    }
}
