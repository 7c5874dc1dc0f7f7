//! HTTP plumbing for the service protocol and pre-signed part targets
//!
//! Part and single-shot bodies are streamed, never buffered whole, and tick
//! an optional byte-count tap as frames are handed to the transport so the
//! caller can report in-flight progress.

use anyhow::Result;
use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::{
    Body, Client, Response,
    header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE},
};
use serde::Serialize;
use std::{io::SeekFrom, path::Path};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt},
    sync::mpsc::UnboundedSender,
};
use tokio_util::codec::{BytesCodec, FramedRead};
use url::Url;

// frame size for streamed bodies
const FRAME_SIZE: usize = 1024 * 256;

fn client() -> Result<Client> {
    Ok(Client::builder().build()?)
}

/// # Errors
///
/// Will return `Err` if the request cannot be sent
pub async fn post_json<B: Serialize + Sync>(
    url: Url,
    authorization: &str,
    body: &B,
) -> Result<Response> {
    Ok(client()?
        .post(url)
        .header(AUTHORIZATION, authorization)
        .json(body)
        .send()
        .await?)
}

/// # Errors
///
/// Will return `Err` if the request cannot be sent
pub async fn delete_json<B: Serialize + Sync>(
    url: Url,
    authorization: &str,
    body: &B,
) -> Result<Response> {
    Ok(client()?
        .delete(url)
        .header(AUTHORIZATION, authorization)
        .json(body)
        .send()
        .await?)
}

/// # Errors
///
/// Will return `Err` if the request cannot be sent
pub async fn get(url: Url) -> Result<Response> {
    Ok(client()?.get(url).send().await?)
}

/// # Errors
///
/// Will return `Err` if the request cannot be sent
pub async fn head(url: Url) -> Result<Response> {
    Ok(client()?.head(url).send().await?)
}

/// PUT an in-memory payload.
///
/// # Errors
///
/// Will return `Err` if the request cannot be sent
pub async fn put_bytes(
    url: Url,
    authorization: Option<&str>,
    content_type: &str,
    payload: Bytes,
    tap: Option<UnboundedSender<usize>>,
) -> Result<Response> {
    let total = payload.len();

    // re-frame so the tap ticks while the transport drains the body
    let mut frames = Vec::with_capacity(total.div_ceil(FRAME_SIZE).max(1));
    let mut offset = 0;
    while offset < total {
        let end = (offset + FRAME_SIZE).min(total);
        frames.push(payload.slice(offset..end));
        offset = end;
    }

    let stream = futures::stream::iter(frames.into_iter().map(move |frame| {
        if let Some(tx) = &tap {
            let _ = tx.send(frame.len());
        }
        Ok::<Bytes, std::io::Error>(frame)
    }));

    let mut request = client()?
        .put(url)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, total)
        .body(Body::wrap_stream(stream));

    if let Some(authorization) = authorization {
        request = request.header(AUTHORIZATION, authorization);
    }

    Ok(request.send().await?)
}

/// PUT a byte-offset slice of a local file, streamed from disk.
///
/// # Errors
///
/// Will return `Err` if the file cannot be read or the request cannot be sent
pub async fn put_file_slice(
    url: Url,
    authorization: Option<&str>,
    content_type: &str,
    path: &Path,
    seek: u64,
    chunk: u64,
    tap: Option<UnboundedSender<usize>>,
) -> Result<Response> {
    let mut file = File::open(path).await?;
    file.seek(SeekFrom::Start(seek)).await?;
    let file = file.take(chunk);

    let stream =
        FramedRead::with_capacity(file, BytesCodec::new(), FRAME_SIZE).map_ok(move |frame| {
            if let Some(tx) = &tap {
                let _ = tx.send(frame.len());
            }
            frame.freeze()
        });

    let mut request = client()?
        .put(url)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, chunk)
        .body(Body::wrap_stream(stream));

    if let Some(authorization) = authorization {
        request = request.header(AUTHORIZATION, authorization);
    }

    Ok(request.send().await?)
}
