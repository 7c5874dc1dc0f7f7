#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

use blobup::{
    api::Endpoint,
    transfer::{
        Limits, RetryPolicy, Source, TransferDescriptor, TransferError, Uploader,
        multipart::MultipartUpload,
        progress::{Phase, ProgressReporter},
        registry::TransferRegistry,
        relay,
    },
};
use bytes::Bytes;
use futures::stream;
use mockito::{Matcher, Server, ServerGuard};
use secrecy::SecretString;
use serde_json::json;
use std::time::Duration;
use url::Url;

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
    }
}

fn endpoint_for(server: &ServerGuard) -> Endpoint {
    Endpoint::new(&server.url(), SecretString::new("token".into())).unwrap()
}

fn remote_descriptor(transfer_id: &str, url: &str, size: u64) -> TransferDescriptor {
    TransferDescriptor {
        transfer_id: transfer_id.to_string(),
        name: "stream.bin".to_string(),
        declared_size: size,
        mime_type: "application/octet-stream".to_string(),
        source: Source::Remote(Url::parse(url).unwrap()),
    }
}

#[tokio::test]
async fn test_ingest_cuts_parts_at_chunk_size() {
    let mut server = Server::new_async().await;
    let url = server.url();

    let create = server
        .mock("POST", "/v1/uploads/multipart")
        .with_body(r#"{"uploadId": "uid-1", "key": "media/stream.bin"}"#)
        .expect(1)
        .create_async()
        .await;

    // 2560 bytes in 256-byte reads with a 1024-byte chunk size: two full
    // parts and a short final one
    for (part_number, content_length) in [(1, 1024), (2, 1024), (3, 512)] {
        server
            .mock("POST", "/v1/uploads/multipart/part")
            .match_body(Matcher::PartialJson(json!({
                "partNumber": part_number,
                "contentLength": content_length,
            })))
            .with_body(format!(r#"{{"url": "{url}/presigned"}}"#))
            .expect(1)
            .create_async()
            .await;
    }

    let transmit = server
        .mock("PUT", "/presigned")
        .with_header("ETag", "\"etag\"")
        .expect(3)
        .create_async()
        .await;

    let complete = server
        .mock("POST", "/v1/uploads/multipart/complete")
        .match_body(Matcher::PartialJson(json!({
            "parts": [
                {"partNumber": 1, "eTag": "\"etag\""},
                {"partNumber": 2, "eTag": "\"etag\""},
                {"partNumber": 3, "eTag": "\"etag\""},
            ],
        })))
        .expect(1)
        .create_async()
        .await;

    let endpoint = endpoint_for(&server);
    let registry = TransferRegistry::new();
    let retry = fast_retry();
    let (reporter, _events) = ProgressReporter::channel();
    let progress = reporter.for_transfer("t-ingest", "stream.bin", 2560);

    let descriptor = remote_descriptor("t-ingest", "https://media.example.com/stream.bin", 2560);
    let cancel = registry.register("t-ingest");
    let machine =
        MultipartUpload::new(&endpoint, &registry, &retry, &progress, &descriptor, cancel);

    let chunks = stream::iter((0..10).map(|_| Ok(Bytes::from(vec![3_u8; 256]))));

    relay::ingest(&machine, chunks, 2560, 1024).await.unwrap();

    create.assert_async().await;
    transmit.assert_async().await;
    complete.assert_async().await;

    let state = registry.state("t-ingest").unwrap();
    assert_eq!(state.completed_parts.len(), 3);
    assert!(state.is_contiguous());
    assert_eq!(state.bytes_committed, 2560);
}

#[tokio::test]
async fn test_probe_rejects_zero_length() {
    let mut server = Server::new_async().await;

    let probe = server
        .mock("HEAD", "/samples/empty.mp3")
        .with_header("content-type", "audio/mpeg")
        .with_header("content-length", "0")
        .expect(1)
        .create_async()
        .await;

    let create = server
        .mock("POST", "/v1/uploads/multipart")
        .expect(0)
        .create_async()
        .await;

    let endpoint = endpoint_for(&server);
    let (uploader, _events) = Uploader::new(endpoint, fast_retry(), Limits::default());

    let url = Url::parse(&format!("{}/samples/empty.mp3", server.url())).unwrap();
    let result = uploader.describe_url(url).await;

    assert!(matches!(result, Err(TransferError::Precondition(_))));

    probe.assert_async().await;
    create.assert_async().await;
}

#[tokio::test]
async fn test_probe_rejects_missing_content_type() {
    let mut server = Server::new_async().await;

    let probe = server
        .mock("HEAD", "/samples/unknown")
        .with_header("content-length", "2048")
        .expect(1)
        .create_async()
        .await;

    let endpoint = endpoint_for(&server);
    let (uploader, _events) = Uploader::new(endpoint, fast_retry(), Limits::default());

    let url = Url::parse(&format!("{}/samples/unknown", server.url())).unwrap();
    let result = uploader.describe_url(url).await;

    assert!(matches!(result, Err(TransferError::Precondition(_))));

    probe.assert_async().await;
}

#[tokio::test]
async fn test_single_shot_relay_below_threshold() {
    let mut server = Server::new_async().await;

    let body = vec![9_u8; 1024];

    let probe = server
        .mock("HEAD", "/samples/sample.mp3")
        .with_header("content-type", "audio/mpeg")
        .with_header("content-length", "1024")
        .expect(1)
        .create_async()
        .await;

    let fetch = server
        .mock("GET", "/samples/sample.mp3")
        .with_header("content-type", "audio/mpeg")
        .with_body(body)
        .expect(1)
        .create_async()
        .await;

    let single = server
        .mock("PUT", "/v1/uploads/single")
        .match_query(Matcher::Any)
        .with_body(r#"{"key": "media/sample.mp3"}"#)
        .expect(1)
        .create_async()
        .await;

    let create = server
        .mock("POST", "/v1/uploads/multipart")
        .expect(0)
        .create_async()
        .await;

    let endpoint = endpoint_for(&server);
    let limits = Limits {
        single_part_limit: 10_000,
        chunk_size: 5_242_880,
    };
    let (uploader, mut events) = Uploader::new(endpoint, fast_retry(), limits);

    let url = Url::parse(&format!("{}/samples/sample.mp3", server.url())).unwrap();
    let descriptor = uploader.describe_url(url).await.unwrap();
    assert_eq!(descriptor.name, "sample.mp3");
    assert_eq!(descriptor.declared_size, 1024);
    assert_eq!(descriptor.mime_type, "audio/mpeg");

    let outcomes = uploader.submit(vec![descriptor]).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].result.as_deref().unwrap(), "media/sample.mp3");

    probe.assert_async().await;
    fetch.assert_async().await;
    single.assert_async().await;
    create.assert_async().await;

    drop(uploader);
    let mut last = None;
    while let Some(update) = events.recv().await {
        last = Some(update);
    }
    let last = last.unwrap();
    assert_eq!(last.phase, Phase::Completed);
    assert_eq!(last.percentage, 100);
}

#[tokio::test]
async fn test_relay_part_failure_triggers_abort() {
    let mut server = Server::new_async().await;
    let url = server.url();

    let fetch = server
        .mock("GET", "/source/big.bin")
        .with_body(vec![1_u8; 2560])
        .expect(1)
        .create_async()
        .await;

    let _create = server
        .mock("POST", "/v1/uploads/multipart")
        .with_body(r#"{"uploadId": "uid-1", "key": "media/big.bin"}"#)
        .expect(1)
        .create_async()
        .await;

    let _target = server
        .mock("POST", "/v1/uploads/multipart/part")
        .with_body(format!(r#"{{"url": "{url}/presigned"}}"#))
        .expect(3)
        .create_async()
        .await;

    let transmit = server
        .mock("PUT", "/presigned")
        .with_status(500)
        .expect(3)
        .create_async()
        .await;

    let abort = server
        .mock("DELETE", "/v1/uploads/multipart")
        .match_body(Matcher::PartialJson(json!({"uploadId": "uid-1"})))
        .expect(1)
        .create_async()
        .await;

    let endpoint = endpoint_for(&server);
    let limits = Limits {
        single_part_limit: 1000,
        chunk_size: 1024,
    };
    let (uploader, _events) = Uploader::new(endpoint, fast_retry(), limits);
    let registry = uploader.registry();

    let source = format!("{}/source/big.bin", server.url());
    let descriptor = remote_descriptor("t-relay-fail", &source, 2560);

    let outcomes = uploader.submit(vec![descriptor]).await;

    assert_eq!(outcomes.len(), 1);
    assert!(matches!(
        outcomes[0].result,
        Err(TransferError::RetryExhausted { op: "upload part", .. })
    ));

    fetch.assert_async().await;
    transmit.assert_async().await;
    abort.assert_async().await;
    assert!(registry.is_empty());
}
