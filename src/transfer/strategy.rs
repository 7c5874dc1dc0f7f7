/// How a transfer is delivered to the storage service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One request carrying the whole payload, restarted wholesale on failure
    SingleShot,
    /// Initiate, upload numbered parts, complete
    Multipart,
}

/// Classify a transfer by its declared size against the single-part threshold.
///
/// Applied identically to local files and URL sources (a URL source's size
/// comes from the metadata probe).
#[must_use]
pub const fn select(size_bytes: u64, single_part_limit: u64) -> Strategy {
    if size_bytes <= single_part_limit {
        Strategy::SingleShot
    } else {
        Strategy::Multipart
    }
}
