//! Service limits and transfer tunables
//!
//! The storage service accepts at most 10,000 parts per multipart upload and
//! rejects non-final parts below 5 MB, so the chunk size may need to grow for
//! very large objects.

/// Transfers at or below this size are sent in a single request (100 MB)
pub const DEFAULT_SINGLE_PART_LIMIT_BYTES: u64 = 104_857_600;

/// Default part size for multipart transfers (50 MB)
pub const DEFAULT_CHUNK_SIZE_BYTES: u64 = 52_428_800;

/// Minimum size of a non-final part (5 MB)
pub const MIN_PART_SIZE_BYTES: u64 = 5_242_880;

/// Maximum number of parts per multipart upload
pub const MAX_PARTS_PER_UPLOAD: u64 = 10_000;

/// Maximum size of a single object (10 GB)
pub const MAX_OBJECT_SIZE_BYTES: u64 = 10_737_418_240;

/// Tunable thresholds for one uploader instance.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Sizes `<=` this go through the single-shot path
    pub single_part_limit: u64,
    /// Target part size for multipart transfers
    pub chunk_size: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            single_part_limit: DEFAULT_SINGLE_PART_LIMIT_BYTES,
            chunk_size: DEFAULT_CHUNK_SIZE_BYTES,
        }
    }
}

impl Limits {
    /// Build limits, keeping the chunk size above the non-final part minimum.
    #[must_use]
    pub fn new(single_part_limit: u64, chunk_size: u64) -> Self {
        Self {
            single_part_limit,
            chunk_size: chunk_size.max(MIN_PART_SIZE_BYTES),
        }
    }

    /// Chunk size to use for a transfer of `total_size` bytes.
    ///
    /// Doubles the configured chunk until the part count fits under
    /// [`MAX_PARTS_PER_UPLOAD`].
    #[must_use]
    pub fn adjusted_chunk_size(&self, total_size: u64) -> u64 {
        let mut chunk = self.chunk_size.max(1);
        while total_size.div_ceil(chunk) > MAX_PARTS_PER_UPLOAD {
            chunk = chunk.saturating_mul(2);
        }
        chunk
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_are_sane() {
        const _: () = assert!(MAX_OBJECT_SIZE_BYTES > DEFAULT_CHUNK_SIZE_BYTES);
        const _: () = assert!(DEFAULT_CHUNK_SIZE_BYTES > MIN_PART_SIZE_BYTES);
        const _: () = assert!(DEFAULT_SINGLE_PART_LIMIT_BYTES > MIN_PART_SIZE_BYTES);

        // the default chunk covers the largest object within the part cap
        assert!(MAX_OBJECT_SIZE_BYTES.div_ceil(DEFAULT_CHUNK_SIZE_BYTES) <= MAX_PARTS_PER_UPLOAD);
    }

    #[test]
    fn test_default() {
        let limits = Limits::default();
        assert_eq!(limits.single_part_limit, DEFAULT_SINGLE_PART_LIMIT_BYTES);
        assert_eq!(limits.chunk_size, DEFAULT_CHUNK_SIZE_BYTES);
    }

    #[test]
    fn test_new_enforces_part_minimum() {
        let limits = Limits::new(1024, 1024);
        assert_eq!(limits.chunk_size, MIN_PART_SIZE_BYTES);
        assert_eq!(limits.single_part_limit, 1024);
    }

    #[test]
    fn test_adjusted_chunk_size_unchanged() {
        let limits = Limits::default();
        assert_eq!(
            limits.adjusted_chunk_size(MAX_OBJECT_SIZE_BYTES),
            DEFAULT_CHUNK_SIZE_BYTES
        );
    }

    #[test]
    fn test_adjusted_chunk_size_grows() {
        let limits = Limits::new(DEFAULT_SINGLE_PART_LIMIT_BYTES, MIN_PART_SIZE_BYTES);
        // 100,000 minimum-size parts would exceed the cap, chunk must double
        let total = MIN_PART_SIZE_BYTES * 100_000;
        let chunk = limits.adjusted_chunk_size(total);
        assert!(total.div_ceil(chunk) <= MAX_PARTS_PER_UPLOAD);
        assert!(chunk > MIN_PART_SIZE_BYTES);
    }
}
