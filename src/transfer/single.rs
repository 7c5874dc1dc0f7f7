//! Single-shot upload path
//!
//! Below the single-part threshold the whole payload goes out in one
//! request. There is no resumability here on purpose: payloads this small
//! are cheap to restart wholesale, which is the point of the threshold.

use crate::{
    api::{
        Endpoint,
        actions::{FetchSource, PartPayload, SingleShotUpload},
    },
    transfer::{
        descriptor::TransferDescriptor,
        error::TransferError,
        progress::{Phase, TransferProgress, blend_progress, percent},
        retry::RetryPolicy,
    },
};
use bytes::BytesMut;
use futures::TryStreamExt;
use std::path::Path;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio_util::sync::CancellationToken;
use url::Url;

pub struct SingleShot<'a> {
    endpoint: &'a Endpoint,
    retry: &'a RetryPolicy,
    progress: &'a TransferProgress,
    descriptor: &'a TransferDescriptor,
    cancel: CancellationToken,
}

impl<'a> SingleShot<'a> {
    #[must_use]
    pub const fn new(
        endpoint: &'a Endpoint,
        retry: &'a RetryPolicy,
        progress: &'a TransferProgress,
        descriptor: &'a TransferDescriptor,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            endpoint,
            retry,
            progress,
            descriptor,
            cancel,
        }
    }

    /// Upload a local file whole, streaming it from disk.
    ///
    /// # Errors
    ///
    /// Will return `Err` once the retry bound is exhausted
    pub async fn upload_local(
        &self,
        path: &Path,
        file_size: u64,
    ) -> Result<String, TransferError> {
        let descriptor = self.descriptor;

        self.retry
            .run("single-shot upload", &self.cancel, || {
                let (tap, acked) = unbounded_channel();
                self.spawn_progress(acked, file_size, Phase::Uploading, None);
                async move {
                    let uploaded = SingleShotUpload::new(
                        &descriptor.name,
                        &descriptor.transfer_id,
                        &descriptor.mime_type,
                        PartPayload::File {
                            path,
                            seek: 0,
                            chunk: file_size,
                        },
                        Some(tap),
                    )
                    .request(self.endpoint)
                    .await?;
                    Ok(uploaded.key)
                }
            })
            .await
    }

    /// Relay a URL source below the threshold: read the whole body, bounded
    /// by the threshold, then upload it. The inbound stream is never resumed
    /// by byte range; a failure restarts the download as well.
    ///
    /// # Errors
    ///
    /// Will return `Err` once the retry bound is exhausted
    pub async fn relay_remote(&self, url: &Url, total_size: u64) -> Result<String, TransferError> {
        let descriptor = self.descriptor;

        self.retry
            .run("single-shot import", &self.cancel, || async move {
                let response = FetchSource::new(url).request().await?;
                let mut stream = response.bytes_stream();
                let mut body = BytesMut::with_capacity(usize::try_from(total_size)?);

                while let Some(chunk) = stream.try_next().await? {
                    body.extend_from_slice(&chunk);
                    self.progress.report(
                        blend_progress(percent(body.len() as u64, total_size), 0.0),
                        Phase::Importing,
                    );
                }

                let (tap, acked) = unbounded_channel();
                self.spawn_progress(acked, total_size, Phase::Importing, Some(100.0));

                let uploaded = SingleShotUpload::new(
                    &descriptor.name,
                    &descriptor.transfer_id,
                    &descriptor.mime_type,
                    PartPayload::Bytes(body.freeze()),
                    Some(tap),
                )
                .request(self.endpoint)
                .await?;

                Ok(uploaded.key)
            })
            .await
    }

    // report bytes acknowledged by the transport as they tick in; the task
    // ends when the transmission drops its tap
    fn spawn_progress(
        &self,
        mut acked: UnboundedReceiver<usize>,
        total: u64,
        phase: Phase,
        download_pct: Option<f64>,
    ) {
        let progress = self.progress.clone();
        tokio::spawn(async move {
            let mut sent: u64 = 0;
            while let Some(bytes) = acked.recv().await {
                sent += bytes as u64;
                let pct = percent(sent, total);
                let pct = download_pct.map_or(pct, |download| blend_progress(download, pct));
                progress.report(pct, phase);
            }
        });
    }
}
