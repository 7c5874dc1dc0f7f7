use crate::transfer::part::CompletedPart;
use bytes::{Bytes, BytesMut};
use std::collections::BTreeMap;

/// Mutable bookkeeping for one multipart transfer.
///
/// Committed parts are keyed by part number, which makes duplicates
/// unrepresentable and keeps iteration in ascending order. A part's etag is
/// never overwritten once recorded; a transfer that cannot proceed is aborted
/// instead.
#[derive(Debug, Clone, Default)]
pub struct MultipartState {
    /// Assigned by the storage service on initiation
    pub upload_id: Option<String>,
    /// Object name assigned by the storage service
    pub key: Option<String>,
    pub completed_parts: BTreeMap<u16, CompletedPart>,
    /// Where to resume after a transient failure, instead of part 1
    pub last_failed_part: Option<u16>,
    pub bytes_committed: u64,
}

impl MultipartState {
    #[must_use]
    pub const fn is_initiated(&self) -> bool {
        self.upload_id.is_some()
    }

    /// Record a committed part. The first etag for a part number wins.
    pub fn record_part(&mut self, part: CompletedPart) {
        if self.completed_parts.contains_key(&part.part_number) {
            return;
        }
        self.bytes_committed += part.size;
        if self.last_failed_part == Some(part.part_number) {
            self.last_failed_part = None;
        }
        self.completed_parts.insert(part.part_number, part);
    }

    /// Committed parts in ascending part-number order.
    #[must_use]
    pub fn parts_ascending(&self) -> Vec<CompletedPart> {
        self.completed_parts.values().cloned().collect()
    }

    /// `true` when the committed part numbers form the contiguous range
    /// `1..=n`. Completion with a gap is a protocol violation.
    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        self.completed_parts
            .keys()
            .zip(1..)
            .all(|(&number, expected)| number == expected)
    }

    /// The part number a fresh or resumed sequence should upload next.
    #[must_use]
    pub fn next_part_number(&self) -> u16 {
        self.completed_parts
            .keys()
            .next_back()
            .map_or(1, |&n| n.saturating_add(1))
    }
}

/// Relay-side bookkeeping, owned by the ingestion loop of one transfer.
///
/// Received chunks accumulate here until a part's worth is buffered; the
/// committed-part record stays in the transfer registry.
#[derive(Debug, Default)]
pub struct StreamingState {
    buffer: Vec<Bytes>,
    buffered: usize,
    pub next_part_number: u16,
    pub bytes_received: u64,
    pub total_size: u64,
}

impl StreamingState {
    #[must_use]
    pub const fn new(total_size: u64, next_part_number: u16) -> Self {
        Self {
            buffer: Vec::new(),
            buffered: 0,
            next_part_number,
            bytes_received: 0,
            total_size,
        }
    }

    pub fn push_chunk(&mut self, chunk: Bytes) {
        self.buffered += chunk.len();
        self.bytes_received += chunk.len() as u64;
        self.buffer.push(chunk);
    }

    #[must_use]
    pub const fn buffered(&self) -> usize {
        self.buffered
    }

    /// Concatenate and clear the buffer, yielding one part payload.
    pub fn take_buffer(&mut self) -> Bytes {
        let mut payload = BytesMut::with_capacity(self.buffered);
        for chunk in self.buffer.drain(..) {
            payload.extend_from_slice(&chunk);
        }
        self.buffered = 0;
        payload.freeze()
    }
}
