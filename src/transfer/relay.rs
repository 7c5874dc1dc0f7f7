//! Streaming relay ingestion
//!
//! URL sources above the single-part threshold are piped from the inbound
//! stream straight into outbound part uploads. Received chunks accumulate in
//! a buffer that is cut into a part whenever it reaches the chunk size, so
//! peak memory stays around one chunk no matter how large the object is.
//! The final part is usually smaller.
//!
//! There is no byte-range re-request on the inbound side: a failure reading
//! the stream or flushing a part aborts the whole relay.

use crate::transfer::{
    error::TransferError,
    limits::MAX_PARTS_PER_UPLOAD,
    multipart::MultipartUpload,
    progress::{Phase, blend_progress, percent},
    state::StreamingState,
};
use anyhow::anyhow;
use bytes::Bytes;
use futures::{Stream, TryStreamExt, pin_mut};
use tokio::sync::mpsc::unbounded_channel;
use url::Url;

/// Relay a remote source into a multipart upload.
///
/// # Errors
///
/// Will return `Err` if the stream cannot be read or any protocol step
/// exhausts its retry bound
pub async fn relay(
    machine: &MultipartUpload<'_>,
    url: &Url,
    total_size: u64,
    chunk_size: u64,
) -> Result<(), TransferError> {
    machine.initiate().await?;

    let fetch_source = crate::api::actions::FetchSource::new(url);
    let response = tokio::select! {
        () = machine.token().cancelled() => return Err(TransferError::Cancelled),
        response = fetch_source.request() => response?,
    };

    let stream = response.bytes_stream().map_err(anyhow::Error::from);
    ingest(machine, stream, total_size, chunk_size).await
}

/// Drive an inbound byte stream through the multipart machine.
///
/// # Errors
///
/// Will return `Err` if the stream yields an error or any protocol step
/// exhausts its retry bound
pub async fn ingest<S>(
    machine: &MultipartUpload<'_>,
    stream: S,
    total_size: u64,
    chunk_size: u64,
) -> Result<(), TransferError>
where
    S: Stream<Item = anyhow::Result<Bytes>>,
{
    machine.initiate().await?;

    let mut state = StreamingState::new(total_size, machine.next_part_number());
    pin_mut!(stream);

    loop {
        let next = tokio::select! {
            () = machine.token().cancelled() => return Err(TransferError::Cancelled),
            next = stream.try_next() => {
                next.map_err(|err| TransferError::Other(err.context("reading source stream")))?
            }
        };

        let Some(chunk) = next else { break };

        state.push_chunk(chunk);
        machine.progress().report(
            blend_progress(
                percent(state.bytes_received, total_size),
                percent(machine.bytes_committed(), total_size),
            ),
            Phase::Importing,
        );

        if state.buffered() as u64 >= chunk_size {
            flush_part(machine, &mut state).await?;
        }
    }

    // whatever is left is the final part, usually short
    if state.buffered() > 0 {
        flush_part(machine, &mut state).await?;
    }

    machine.complete().await
}

async fn flush_part(
    machine: &MultipartUpload<'_>,
    state: &mut StreamingState,
) -> Result<(), TransferError> {
    let part_number = state.next_part_number;

    if u64::from(part_number) > MAX_PARTS_PER_UPLOAD {
        return Err(TransferError::Other(anyhow!(
            "part {part_number} exceeds the {MAX_PARTS_PER_UPLOAD}-part limit"
        )));
    }

    let payload = state.take_buffer();

    // transient written-progress for this part, blended with the received
    // fraction so observers see one smooth number
    let (tap, mut acked) = unbounded_channel::<usize>();
    let progress = machine.progress().clone();
    let received_pct = percent(state.bytes_received, state.total_size);
    let committed = machine.bytes_committed();
    let total = state.total_size;

    tokio::spawn(async move {
        let mut sent: u64 = 0;
        while let Some(bytes) = acked.recv().await {
            sent += bytes as u64;
            progress.report(
                blend_progress(received_pct, percent(committed + sent, total)),
                Phase::Importing,
            );
        }
    });

    machine.upload_part(part_number, payload, Some(tap)).await?;

    state.next_part_number = state.next_part_number.saturating_add(1);

    Ok(())
}
