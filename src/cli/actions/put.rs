use crate::{
    api::Endpoint,
    cli::{actions::report, globals::GlobalArgs, progressbar},
    transfer::{RetryPolicy, TransferDescriptor, TransferError, Uploader},
};
use anyhow::Result;
use std::path::PathBuf;

/// # Errors
/// Will return an error if any transfer fails
pub async fn handle(endpoint: &Endpoint, files: Vec<PathBuf>, globals: GlobalArgs) -> Result<()> {
    let retry = RetryPolicy::new(globals.retries);
    let (uploader, events) = Uploader::new(endpoint.clone(), retry, globals.limits);
    let renderer = progressbar::spawn_renderer(events, globals.quiet);

    // validate everything first; a rejected file never sinks the batch
    let mut descriptors = Vec::new();
    let mut rejected: Vec<(String, TransferError)> = Vec::new();

    for file in &files {
        match TransferDescriptor::from_path(file) {
            Ok(descriptor) => {
                log::info!(
                    "{}: transfer id {}, size {}",
                    descriptor.name,
                    descriptor.transfer_id,
                    descriptor.declared_size
                );
                descriptors.push(descriptor);
            }
            Err(err) => rejected.push((file.display().to_string(), err)),
        }
    }

    let outcomes = uploader.submit(descriptors).await;

    // closing the event channel lets the renderer finish
    drop(uploader);
    renderer.await?;

    report(&outcomes, &rejected)
}
