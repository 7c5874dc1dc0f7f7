use crate::{
    api::Endpoint,
    cli::{actions::report, globals::GlobalArgs, progressbar},
    transfer::{RetryPolicy, TransferError, Uploader},
};
use anyhow::Result;
use url::Url;

/// # Errors
/// Will return an error if any transfer fails
pub async fn handle(endpoint: &Endpoint, urls: Vec<String>, globals: GlobalArgs) -> Result<()> {
    let retry = RetryPolicy::new(globals.retries);
    let (uploader, events) = Uploader::new(endpoint.clone(), retry, globals.limits);
    let renderer = progressbar::spawn_renderer(events, globals.quiet);

    // probe every link first; an invalid one never sinks the batch
    let mut descriptors = Vec::new();
    let mut rejected: Vec<(String, TransferError)> = Vec::new();

    for raw in &urls {
        match Url::parse(raw) {
            Ok(url) => match uploader.describe_url(url).await {
                Ok(descriptor) => {
                    log::info!(
                        "{}: transfer id {}, size {}",
                        descriptor.name,
                        descriptor.transfer_id,
                        descriptor.declared_size
                    );
                    descriptors.push(descriptor);
                }
                Err(err) => rejected.push((raw.clone(), err)),
            },
            Err(err) => rejected.push((
                raw.clone(),
                TransferError::Precondition(format!("invalid URL: {err}")),
            )),
        }
    }

    let outcomes = uploader.submit(descriptors).await;

    // closing the event channel lets the renderer finish
    drop(uploader);
    renderer.await?;

    report(&outcomes, &rejected)
}
