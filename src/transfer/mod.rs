//! Transfer orchestration
//!
//! A caller submits named byte sources, local files or URLs. Each becomes
//! one transfer: classified single-shot or multipart by size, driven
//! sequentially through the storage protocol with bounded retries, and
//! reported independently. Distinct transfers run as independent pipelines
//! sharing nothing but the registry.

pub mod descriptor;
pub mod error;
pub mod limits;
pub mod multipart;
pub mod part;
pub mod progress;
pub mod registry;
pub mod relay;
pub mod retry;
pub mod single;
pub mod state;
pub mod strategy;

pub use self::{
    descriptor::{Source, TransferDescriptor},
    error::TransferError,
    limits::Limits,
    progress::{Phase, ProgressUpdate},
    registry::TransferRegistry,
    retry::RetryPolicy,
    strategy::Strategy,
};

use crate::api::{Endpoint, actions::ProbeSource};
use crate::transfer::{
    multipart::MultipartUpload,
    progress::{ProgressReporter, TransferProgress},
    single::SingleShot,
};
use futures::{StreamExt, stream};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use url::Url;

const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Terminal result of one transfer; `Ok` carries the storage key.
#[derive(Debug)]
pub struct TransferOutcome {
    pub transfer_id: String,
    pub name: String,
    pub result: Result<String, TransferError>,
}

/// Drives batches of transfers against one storage endpoint.
#[derive(Debug)]
pub struct Uploader {
    endpoint: Endpoint,
    registry: Arc<TransferRegistry>,
    retry: RetryPolicy,
    limits: Limits,
    max_concurrent: usize,
    reporter: ProgressReporter,
}

impl Uploader {
    /// Returns the uploader and the receiving end of its progress events.
    #[must_use]
    pub fn new(
        endpoint: Endpoint,
        retry: RetryPolicy,
        limits: Limits,
    ) -> (Self, UnboundedReceiver<ProgressUpdate>) {
        let (reporter, events) = ProgressReporter::channel();
        (
            Self {
                endpoint,
                registry: Arc::new(TransferRegistry::new()),
                retry,
                limits,
                max_concurrent: DEFAULT_MAX_CONCURRENT,
                reporter,
            },
            events,
        )
    }

    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Shared registry handle, e.g. to restore a preserved state or cancel
    /// from another task.
    #[must_use]
    pub fn registry(&self) -> Arc<TransferRegistry> {
        Arc::clone(&self.registry)
    }

    /// Cooperatively stop one transfer.
    pub fn cancel(&self, transfer_id: &str) -> bool {
        self.registry.cancel(transfer_id)
    }

    /// Probe a URL source and build its descriptor.
    ///
    /// # Errors
    ///
    /// [`TransferError::Precondition`] when the probe fails or reports no
    /// content type or length
    pub async fn describe_url(&self, url: Url) -> Result<TransferDescriptor, TransferError> {
        let probe = ProbeSource::new(&url)
            .request()
            .await
            .map_err(|err| TransferError::Precondition(format!("{url}: probe failed: {err:#}")))?;

        TransferDescriptor::from_url(url, probe.content_type, probe.content_length)
    }

    /// Run every descriptor to a terminal outcome. One transfer's failure
    /// never halts its siblings.
    pub async fn submit(&self, descriptors: Vec<TransferDescriptor>) -> Vec<TransferOutcome> {
        stream::iter(descriptors)
            .map(|descriptor| async move {
                let result = self.transfer_one(&descriptor).await;
                if let Err(err) = &result {
                    log::error!("{}: {err}", descriptor.name);
                }
                TransferOutcome {
                    transfer_id: descriptor.transfer_id,
                    name: descriptor.name,
                    result,
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await
    }

    async fn transfer_one(&self, descriptor: &TransferDescriptor) -> Result<String, TransferError> {
        let cancel = self.registry.register(&descriptor.transfer_id);
        let progress = self.reporter.for_transfer(
            &descriptor.transfer_id,
            &descriptor.name,
            descriptor.declared_size,
        );

        let machine = MultipartUpload::new(
            &self.endpoint,
            &self.registry,
            &self.retry,
            &progress,
            descriptor,
            cancel.clone(),
        );

        let result = self.drive(descriptor, &machine, &progress, &cancel).await;

        match &result {
            Ok(_) => {
                self.registry.remove(&descriptor.transfer_id);
                progress.report(100.0, Phase::Completed);
            }
            Err(err) => {
                // committed parts stay recorded until the abort actually runs
                machine.abort().await;
                progress.report(0.0, Phase::Failed);
                if err.is_cancelled() {
                    log::info!("{}: cancelled", descriptor.name);
                }
            }
        }

        result
    }

    async fn drive(
        &self,
        descriptor: &TransferDescriptor,
        machine: &MultipartUpload<'_>,
        progress: &TransferProgress,
        cancel: &CancellationToken,
    ) -> Result<String, TransferError> {
        let phase = if descriptor.is_remote() {
            Phase::Importing
        } else {
            Phase::Uploading
        };
        progress.report(0.0, phase);

        match strategy::select(descriptor.declared_size, self.limits.single_part_limit) {
            Strategy::SingleShot => {
                let single = SingleShot::new(
                    &self.endpoint,
                    &self.retry,
                    progress,
                    descriptor,
                    cancel.clone(),
                );
                let key = match &descriptor.source {
                    Source::Local(path) => {
                        single.upload_local(path, descriptor.declared_size).await?
                    }
                    Source::Remote(url) => {
                        single.relay_remote(url, descriptor.declared_size).await?
                    }
                };
                progress.report(99.0, Phase::Processing);
                Ok(key)
            }
            Strategy::Multipart => {
                let chunk_size = self.limits.adjusted_chunk_size(descriptor.declared_size);
                match &descriptor.source {
                    Source::Local(path) => {
                        machine
                            .run_local(path, descriptor.declared_size, chunk_size)
                            .await?;
                    }
                    Source::Remote(url) => {
                        relay::relay(machine, url, descriptor.declared_size, chunk_size).await?;
                    }
                }
                progress.report(99.0, Phase::Processing);

                let key = self
                    .registry
                    .state(&descriptor.transfer_id)
                    .and_then(|state| state.key)
                    .unwrap_or_default();
                Ok(key)
            }
        }
    }
}
