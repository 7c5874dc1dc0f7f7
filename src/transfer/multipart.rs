//! Multipart upload state machine
//!
//! Owns the lifecycle of one multipart transfer: initiation, per-part upload
//! (each independently retryable and resumable), completion, and best-effort
//! abort. All bookkeeping lives in the transfer registry, so a caller that
//! restarts with the same transfer id resumes instead of starting over.

use crate::{
    api::{
        Endpoint,
        actions::{
            AbortMultipartUpload, CompleteMultipartUpload, CreateMultipartUpload, PartPayload,
            PartUploadTarget, TransmitPart, UploadedPart,
        },
    },
    transfer::{
        descriptor::TransferDescriptor,
        error::TransferError,
        part::{CompletedPart, PartIterator},
        progress::{Phase, TransferProgress, percent},
        registry::TransferRegistry,
        retry::RetryPolicy,
    },
};
use anyhow::anyhow;
use bytes::Bytes;
use std::path::Path;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

pub struct MultipartUpload<'a> {
    endpoint: &'a Endpoint,
    registry: &'a TransferRegistry,
    retry: &'a RetryPolicy,
    progress: &'a TransferProgress,
    descriptor: &'a TransferDescriptor,
    cancel: CancellationToken,
}

impl<'a> MultipartUpload<'a> {
    #[must_use]
    pub const fn new(
        endpoint: &'a Endpoint,
        registry: &'a TransferRegistry,
        retry: &'a RetryPolicy,
        progress: &'a TransferProgress,
        descriptor: &'a TransferDescriptor,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            endpoint,
            registry,
            retry,
            progress,
            descriptor,
            cancel,
        }
    }

    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    #[must_use]
    pub const fn progress(&self) -> &TransferProgress {
        self.progress
    }

    #[must_use]
    pub fn bytes_committed(&self) -> u64 {
        self.registry
            .state(&self.descriptor.transfer_id)
            .map_or(0, |state| state.bytes_committed)
    }

    /// The part number a fresh or resumed sequence should upload next.
    #[must_use]
    pub fn next_part_number(&self) -> u16 {
        self.registry
            .state(&self.descriptor.transfer_id)
            .map_or(1, |state| state.next_part_number())
    }

    /// Request an upload session, unless a resumed state already has one.
    ///
    /// # Errors
    ///
    /// Will return `Err` once the retry bound is exhausted
    pub async fn initiate(&self) -> Result<(), TransferError> {
        let id = &self.descriptor.transfer_id;

        if self
            .registry
            .state(id)
            .is_some_and(|state| state.is_initiated())
        {
            log::debug!("{id}: resuming existing upload session");
            return Ok(());
        }

        let descriptor = self.descriptor;
        let created = self
            .retry
            .run("create multipart upload", &self.cancel, || async {
                CreateMultipartUpload::new(
                    &descriptor.mime_type,
                    &descriptor.name,
                    &descriptor.transfer_id,
                    descriptor.declared_size,
                )
                .request(self.endpoint)
                .await
            })
            .await?;

        log::debug!("{id}: upload id: {}", created.upload_id);

        self.registry
            .set_initiated(id, &created.upload_id, &created.key);

        Ok(())
    }

    /// Upload one part from memory. A part that is already committed is a
    /// no-op success, which is what makes resumed iteration harmless.
    ///
    /// # Errors
    ///
    /// Will return `Err` once the retry bound is exhausted
    pub async fn upload_part(
        &self,
        part_number: u16,
        payload: Bytes,
        tap: Option<UnboundedSender<usize>>,
    ) -> Result<(), TransferError> {
        self.upload(
            part_number,
            PartPayload::Bytes(payload),
            "application/octet-stream",
            tap,
        )
        .await
    }

    /// Upload one part sliced from a local file at `seek..seek + chunk`.
    ///
    /// # Errors
    ///
    /// Will return `Err` once the retry bound is exhausted
    pub async fn upload_file_part(
        &self,
        part_number: u16,
        path: &Path,
        seek: u64,
        chunk: u64,
    ) -> Result<(), TransferError> {
        self.upload(
            part_number,
            PartPayload::File { path, seek, chunk },
            &self.descriptor.mime_type,
            None,
        )
        .await
    }

    async fn upload(
        &self,
        part_number: u16,
        payload: PartPayload<'_>,
        content_type: &str,
        tap: Option<UnboundedSender<usize>>,
    ) -> Result<(), TransferError> {
        let id = &self.descriptor.transfer_id;

        if self.registry.is_part_completed(id, part_number) {
            log::debug!("{id}: part {part_number} already committed, skipping");
            return Ok(());
        }

        let (upload_id, key) = self.session()?;
        let content_length = payload.len();

        let result = self
            .retry
            .run("upload part", &self.cancel, || {
                let key = key.clone();
                let upload_id = upload_id.clone();
                let payload = payload.clone();
                let tap = tap.clone();
                async move {
                    let target =
                        PartUploadTarget::new(&key, &upload_id, part_number, content_length)
                            .request(self.endpoint)
                            .await?;
                    TransmitPart::new(&target.url, content_type, payload, tap)
                        .request()
                        .await
                }
            })
            .await;

        match result {
            Ok(etag) => {
                log::info!("{id}: uploaded part {part_number}, etag: {etag}");
                self.registry
                    .record_part(id, CompletedPart::new(part_number, etag, content_length));
                Ok(())
            }
            Err(err) => {
                self.registry.record_failed_part(id, part_number);
                Err(err)
            }
        }
    }

    /// Submit the committed parts, ascending, to assemble the object.
    ///
    /// # Errors
    ///
    /// Will return `Err` on an empty or non-contiguous part set, or once the
    /// retry bound is exhausted
    pub async fn complete(&self) -> Result<(), TransferError> {
        let id = &self.descriptor.transfer_id;
        let state = self
            .registry
            .state(id)
            .ok_or_else(|| anyhow!("unknown transfer: {id}"))?;

        if state.completed_parts.is_empty() {
            return Err(TransferError::Other(anyhow!("{id}: no parts to complete")));
        }

        if !state.is_contiguous() {
            return Err(TransferError::Precondition(format!(
                "{id}: committed parts are not contiguous"
            )));
        }

        let (upload_id, key) = self.session()?;
        let parts: Vec<UploadedPart> = state
            .parts_ascending()
            .into_iter()
            .map(|part| UploadedPart {
                part_number: part.part_number,
                e_tag: part.etag,
            })
            .collect();

        self.retry
            .run("complete multipart upload", &self.cancel, || {
                let key = key.clone();
                let upload_id = upload_id.clone();
                let parts = parts.clone();
                async move {
                    CompleteMultipartUpload::new(&key, &upload_id, id, parts)
                        .request(self.endpoint)
                        .await
                }
            })
            .await?;

        log::info!(
            "{id}: multipart upload completed, {} parts",
            state.completed_parts.len()
        );

        Ok(())
    }

    /// Best-effort abort: a failure here is reported but never raised, since
    /// abort is itself a cleanup step. The registry entry is removed
    /// unconditionally.
    pub async fn abort(&self) {
        let id = &self.descriptor.transfer_id;

        if let Some(state) = self.registry.state(id)
            && let (Some(upload_id), Some(key)) = (&state.upload_id, &state.key)
        {
            match AbortMultipartUpload::new(key, upload_id)
                .request(self.endpoint)
                .await
            {
                Ok(()) => log::info!("{id}: aborted multipart upload"),
                Err(err) => log::warn!("{id}: abort failed (ignored): {err:#}"),
            }
        }

        self.registry.remove(id);
    }

    /// Drive a whole local-file transfer: initiate, then parts in ascending
    /// order with committed ones skipped, then complete.
    ///
    /// # Errors
    ///
    /// Will return `Err` if any step exhausts its retry bound
    pub async fn run_local(
        &self,
        path: &Path,
        file_size: u64,
        chunk_size: u64,
    ) -> Result<(), TransferError> {
        self.initiate().await?;

        for (part_number, seek, chunk) in PartIterator::new(file_size, chunk_size) {
            self.upload_file_part(part_number, path, seek, chunk)
                .await?;
            self.progress
                .report(percent(self.bytes_committed(), file_size), Phase::Uploading);
        }

        self.complete().await
    }

    fn session(&self) -> Result<(String, String), TransferError> {
        let id = &self.descriptor.transfer_id;
        self.registry
            .state(id)
            .and_then(|state| state.upload_id.zip(state.key))
            .ok_or_else(|| TransferError::Other(anyhow!("{id}: transfer not initiated")))
    }
}
