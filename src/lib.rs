//! blobup - resumable multipart uploads of media files, from local disk or
//! remote URLs, against a blob-storage service.

pub mod api;
pub mod cli;
pub mod transfer;
