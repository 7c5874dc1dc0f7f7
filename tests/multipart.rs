#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

use blobup::{
    api::Endpoint,
    transfer::{
        Limits, RetryPolicy, Source, TransferDescriptor, TransferError, Uploader,
        multipart::MultipartUpload,
        part::CompletedPart,
        progress::{Phase, ProgressReporter, TransferProgress},
        registry::TransferRegistry,
        state::MultipartState,
    },
};
use bytes::Bytes;
use mockito::{Matcher, Server, ServerGuard};
use secrecy::SecretString;
use serde_json::json;
use std::{io::Write, path::PathBuf, time::Duration};
use tempfile::NamedTempFile;

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

fn local_descriptor(transfer_id: &str, path: PathBuf, size: u64) -> TransferDescriptor {
    TransferDescriptor {
        transfer_id: transfer_id.to_string(),
        name: "test.bin".to_string(),
        declared_size: size,
        mime_type: "application/octet-stream".to_string(),
        source: Source::Local(path),
    }
}

fn progress_for(reporter: &ProgressReporter, transfer_id: &str, size: u64) -> TransferProgress {
    reporter.for_transfer(transfer_id, "test.bin", size)
}

fn file_of_size(size: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&vec![7_u8; size]).unwrap();
    file
}

#[tokio::test]
async fn test_local_multipart_ten_parts_in_order() {
    let mut server = Server::new_async().await;
    let url = server.url();

    let create = server
        .mock("POST", "/v1/uploads/multipart")
        .match_body(Matcher::PartialJson(json!({
            "originalName": "test.bin",
            "transferId": "t-ten",
            "size": 1000,
        })))
        .with_body(r#"{"uploadId": "uid-1", "key": "media/test.bin"}"#)
        .expect(1)
        .create_async()
        .await;

    let target = server
        .mock("POST", "/v1/uploads/multipart/part")
        .match_body(Matcher::PartialJson(json!({"uploadId": "uid-1", "contentLength": 100})))
        .with_body(format!(r#"{{"url": "{url}/presigned"}}"#))
        .expect(10)
        .create_async()
        .await;

    let transmit = server
        .mock("PUT", "/presigned")
        .with_header("ETag", "\"etag\"")
        .expect(10)
        .create_async()
        .await;

    let parts: Vec<_> = (1..=10)
        .map(|n| json!({"partNumber": n, "eTag": "\"etag\""}))
        .collect();
    let complete = server
        .mock("POST", "/v1/uploads/multipart/complete")
        .match_body(Matcher::PartialJson(json!({
            "uploadId": "uid-1",
            "key": "media/test.bin",
            "transferId": "t-ten",
            "parts": parts,
        })))
        .expect(1)
        .create_async()
        .await;

    let endpoint = endpoint_for(&server);
    let registry = TransferRegistry::new();
    let retry = fast_retry();
    let (reporter, _events) = ProgressReporter::channel();
    let progress = progress_for(&reporter, "t-ten", 1000);

    let file = file_of_size(1000);
    let descriptor = local_descriptor("t-ten", file.path().to_path_buf(), 1000);

    let cancel = registry.register("t-ten");
    let machine = MultipartUpload::new(&endpoint, &registry, &retry, &progress, &descriptor, cancel);

    machine.run_local(file.path(), 1000, 100).await.unwrap();

    create.assert_async().await;
    target.assert_async().await;
    transmit.assert_async().await;
    complete.assert_async().await;

    let state = registry.state("t-ten").unwrap();
    assert_eq!(state.completed_parts.len(), 10);
    assert!(state.is_contiguous());
    assert_eq!(state.bytes_committed, 1000);
}

#[tokio::test]
async fn test_upload_part_idempotent() {
    let mut server = Server::new_async().await;
    let url = server.url();

    let create = server
        .mock("POST", "/v1/uploads/multipart")
        .with_body(r#"{"uploadId": "uid-1", "key": "media/test.bin"}"#)
        .expect(1)
        .create_async()
        .await;

    // a committed part is never transmitted again
    let target = server
        .mock("POST", "/v1/uploads/multipart/part")
        .with_body(format!(r#"{{"url": "{url}/presigned"}}"#))
        .expect(1)
        .create_async()
        .await;

    let transmit = server
        .mock("PUT", "/presigned")
        .with_header("ETag", "\"etag-1\"")
        .expect(1)
        .create_async()
        .await;

    let endpoint = endpoint_for(&server);
    let registry = TransferRegistry::new();
    let retry = fast_retry();
    let (reporter, _events) = ProgressReporter::channel();
    let progress = progress_for(&reporter, "t-idem", 100);

    let descriptor = local_descriptor("t-idem", PathBuf::from("/unused"), 100);
    let cancel = registry.register("t-idem");
    let machine = MultipartUpload::new(&endpoint, &registry, &retry, &progress, &descriptor, cancel);

    machine.initiate().await.unwrap();
    machine
        .upload_part(1, Bytes::from_static(b"hello"), None)
        .await
        .unwrap();
    machine
        .upload_part(1, Bytes::from_static(b"hello"), None)
        .await
        .unwrap();

    create.assert_async().await;
    target.assert_async().await;
    transmit.assert_async().await;

    let state = registry.state("t-idem").unwrap();
    assert_eq!(state.completed_parts.len(), 1);
    assert_eq!(state.completed_parts.get(&1).unwrap().etag, "\"etag-1\"");
}

#[tokio::test]
async fn test_resume_skips_committed_parts() {
    let mut server = Server::new_async().await;
    let url = server.url();

    // a resumed transfer must not initiate again
    let create = server
        .mock("POST", "/v1/uploads/multipart")
        .expect(0)
        .create_async()
        .await;

    let target = server
        .mock("POST", "/v1/uploads/multipart/part")
        .with_body(format!(r#"{{"url": "{url}/presigned"}}"#))
        .expect(3)
        .create_async()
        .await;

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
                {"partNumber": 1, "eTag": "\"seed-1\""},
                {"partNumber": 2, "eTag": "\"seed-2\""},
                {"partNumber": 3, "eTag": "\"etag\""},
                {"partNumber": 4, "eTag": "\"etag\""},
                {"partNumber": 5, "eTag": "\"etag\""},
            ],
        })))
        .expect(1)
        .create_async()
        .await;

    let endpoint = endpoint_for(&server);
    let registry = TransferRegistry::new();

    // preserved state: parts 1 and 2 committed, part 3 failed last time
    let mut state = MultipartState {
        upload_id: Some("uid-1".to_string()),
        key: Some("media/test.bin".to_string()),
        last_failed_part: Some(3),
        ..MultipartState::default()
    };
    state.record_part(CompletedPart::new(1, "\"seed-1\"".to_string(), 100));
    state.record_part(CompletedPart::new(2, "\"seed-2\"".to_string(), 100));
    let cancel = registry.restore("t-resume", state);

    let retry = fast_retry();
    let (reporter, _events) = ProgressReporter::channel();
    let progress = progress_for(&reporter, "t-resume", 500);

    let file = file_of_size(500);
    let descriptor = local_descriptor("t-resume", file.path().to_path_buf(), 500);
    let machine =
        MultipartUpload::new(&endpoint, &registry, &retry, &progress, &descriptor, cancel);

    machine.run_local(file.path(), 500, 100).await.unwrap();

    create.assert_async().await;
    target.assert_async().await;
    transmit.assert_async().await;
    complete.assert_async().await;

    let state = registry.state("t-resume").unwrap();
    assert_eq!(state.completed_parts.len(), 5);
    assert_eq!(state.last_failed_part, None);
}

#[tokio::test]
async fn test_part_failure_preserves_progress_then_aborts() {
    let mut server = Server::new_async().await;
    let url = server.url();

    let _create = server
        .mock("POST", "/v1/uploads/multipart")
        .with_body(r#"{"uploadId": "uid-1", "key": "media/test.bin"}"#)
        .expect(1)
        .create_async()
        .await;

    for part_number in 1..=3 {
        server
            .mock("POST", "/v1/uploads/multipart/part")
            .match_body(Matcher::PartialJson(json!({"partNumber": part_number})))
            .with_body(format!(r#"{{"url": "{url}/presigned-ok"}}"#))
            .expect(1)
            .create_async()
            .await;
    }

    // part 4 keeps failing: one target + transmission per attempt
    let target_bad = server
        .mock("POST", "/v1/uploads/multipart/part")
        .match_body(Matcher::PartialJson(json!({"partNumber": 4})))
        .with_body(format!(r#"{{"url": "{url}/presigned-bad"}}"#))
        .expect(3)
        .create_async()
        .await;

    let transmit_ok = server
        .mock("PUT", "/presigned-ok")
        .with_header("ETag", "\"etag\"")
        .expect(3)
        .create_async()
        .await;

    let transmit_bad = server
        .mock("PUT", "/presigned-bad")
        .with_status(500)
        .expect(3)
        .create_async()
        .await;

    let complete = server
        .mock("POST", "/v1/uploads/multipart/complete")
        .expect(0)
        .create_async()
        .await;

    let abort = server
        .mock("DELETE", "/v1/uploads/multipart")
        .match_body(Matcher::PartialJson(json!({"uploadId": "uid-1"})))
        .expect(1)
        .create_async()
        .await;

    let endpoint = endpoint_for(&server);
    let registry = TransferRegistry::new();
    let retry = fast_retry();
    let (reporter, _events) = ProgressReporter::channel();
    let progress = progress_for(&reporter, "t-d", 1000);

    let file = file_of_size(1000);
    let descriptor = local_descriptor("t-d", file.path().to_path_buf(), 1000);
    let cancel = registry.register("t-d");
    let machine = MultipartUpload::new(&endpoint, &registry, &retry, &progress, &descriptor, cancel);

    let result = machine.run_local(file.path(), 1000, 100).await;

    match result {
        Err(TransferError::RetryExhausted { op, attempts, .. }) => {
            assert_eq!(op, "upload part");
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected result: {other:?}"),
    }

    // committed parts are preserved at the moment of failure
    let state = registry.state("t-d").unwrap();
    let numbers: Vec<u16> = state.completed_parts.keys().copied().collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(state.last_failed_part, Some(4));

    target_bad.assert_async().await;
    transmit_ok.assert_async().await;
    transmit_bad.assert_async().await;
    complete.assert_async().await;

    // abort releases the backend session and purges the entry
    machine.abort().await;
    abort.assert_async().await;
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_complete_failure_aborts_once_via_uploader() {
    let mut server = Server::new_async().await;
    let url = server.url();

    let _create = server
        .mock("POST", "/v1/uploads/multipart")
        .with_body(r#"{"uploadId": "uid-1", "key": "media/test.bin"}"#)
        .expect(1)
        .create_async()
        .await;

    let _target = server
        .mock("POST", "/v1/uploads/multipart/part")
        .with_body(format!(r#"{{"url": "{url}/presigned"}}"#))
        .expect(3)
        .create_async()
        .await;

    let _transmit = server
        .mock("PUT", "/presigned")
        .with_header("ETag", "\"etag\"")
        .expect(3)
        .create_async()
        .await;

    let complete = server
        .mock("POST", "/v1/uploads/multipart/complete")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let abort = server
        .mock("DELETE", "/v1/uploads/multipart")
        .expect(1)
        .create_async()
        .await;

    let endpoint = endpoint_for(&server);
    let limits = Limits {
        single_part_limit: 100,
        chunk_size: 100,
    };
    let (uploader, mut events) = Uploader::new(endpoint, fast_retry(), limits);
    let registry = uploader.registry();

    let file = file_of_size(300);
    let descriptor = local_descriptor("t-complete", file.path().to_path_buf(), 300);

    let outcomes = uploader.submit(vec![descriptor]).await;

    assert_eq!(outcomes.len(), 1);
    assert!(matches!(
        outcomes[0].result,
        Err(TransferError::RetryExhausted {
            op: "complete multipart upload",
            ..
        })
    ));

    complete.assert_async().await;
    abort.assert_async().await;
    assert!(registry.is_empty());

    drop(uploader);
    let mut last_phase = None;
    while let Some(update) = events.recv().await {
        last_phase = Some(update.phase);
    }
    assert_eq!(last_phase, Some(Phase::Failed));
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let mut server = Server::new_async().await;

    let create = server
        .mock("POST", "/v1/uploads/multipart")
        .expect(0)
        .create_async()
        .await;

    let endpoint = endpoint_for(&server);
    let registry = TransferRegistry::new();
    let retry = fast_retry();
    let (reporter, _events) = ProgressReporter::channel();
    let progress = progress_for(&reporter, "t-cancel", 1000);

    let file = file_of_size(1000);
    let descriptor = local_descriptor("t-cancel", file.path().to_path_buf(), 1000);
    let cancel = registry.register("t-cancel");
    cancel.cancel();

    let machine =
        MultipartUpload::new(&endpoint, &registry, &retry, &progress, &descriptor, cancel);

    let result = machine.run_local(file.path(), 1000, 100).await;
    assert!(matches!(result, Err(TransferError::Cancelled)));

    create.assert_async().await;
}
