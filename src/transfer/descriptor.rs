use crate::transfer::{error::TransferError, limits::MAX_OBJECT_SIZE_BYTES};
use percent_encoding::percent_decode_str;
use std::{
    fs,
    path::{Path, PathBuf},
};
use url::Url;

const FALLBACK_NAME: &str = "imported-file";
const FALLBACK_MIME: &str = "application/octet-stream";

/// Where a transfer's bytes come from.
#[derive(Debug, Clone)]
pub enum Source {
    Local(PathBuf),
    Remote(Url),
}

/// Identity of one logical file being moved. Immutable once created.
#[derive(Debug, Clone)]
pub struct TransferDescriptor {
    /// Client-generated, unique per transfer
    pub transfer_id: String,
    pub name: String,
    pub declared_size: u64,
    pub mime_type: String,
    pub source: Source,
}

impl TransferDescriptor {
    /// Describe a local file.
    ///
    /// # Errors
    /// [`TransferError::Precondition`] when the path is not a regular file or
    /// exceeds the object size ceiling; [`TransferError::Io`] when it cannot
    /// be read.
    pub fn from_path(path: &Path) -> Result<Self, TransferError> {
        let meta = fs::metadata(path)?;

        if !meta.is_file() {
            return Err(TransferError::Precondition(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let declared_size = meta.len();
        check_size(declared_size)?;

        let name = path
            .file_name()
            .map_or_else(|| FALLBACK_NAME.to_string(), |n| n.to_string_lossy().into_owned());

        Ok(Self {
            transfer_id: generate_transfer_id(),
            mime_type: mime_type_for(path).to_string(),
            name,
            declared_size,
            source: Source::Local(path.to_path_buf()),
        })
    }

    /// Describe a remote source from its metadata probe.
    ///
    /// A probe missing either field, or reporting a zero length, rejects the
    /// source before any upload is attempted.
    ///
    /// # Errors
    /// [`TransferError::Precondition`] on a missing content type, a
    /// missing/zero content length, or an oversized source.
    pub fn from_url(
        url: Url,
        content_type: Option<String>,
        content_length: Option<u64>,
    ) -> Result<Self, TransferError> {
        let mime_type = content_type
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TransferError::Precondition(format!("{url}: missing content type")))?;

        let declared_size = content_length
            .filter(|&len| len > 0)
            .ok_or_else(|| TransferError::Precondition(format!("{url}: missing content length")))?;

        check_size(declared_size)?;

        Ok(Self {
            transfer_id: generate_transfer_id(),
            name: file_name_from_url(&url),
            declared_size,
            mime_type,
            source: Source::Remote(url),
        })
    }

    #[must_use]
    pub const fn source_url(&self) -> Option<&Url> {
        match &self.source {
            Source::Remote(url) => Some(url),
            Source::Local(_) => None,
        }
    }

    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self.source, Source::Remote(_))
    }
}

fn check_size(size: u64) -> Result<(), TransferError> {
    if size > MAX_OBJECT_SIZE_BYTES {
        return Err(TransferError::Precondition(format!(
            "size {} exceeds the {} limit",
            bytesize::ByteSize(size),
            bytesize::ByteSize(MAX_OBJECT_SIZE_BYTES)
        )));
    }
    Ok(())
}

/// Client-assigned transfer identity, unique per transfer.
#[must_use]
pub fn generate_transfer_id() -> String {
    format!(
        "{:016x}{:08x}",
        rand::random::<u64>(),
        rand::random::<u32>()
    )
}

/// File name from the last path segment of a URL, percent-decoded.
#[must_use]
pub fn file_name_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map_or_else(
            || FALLBACK_NAME.to_string(),
            |segment| {
                percent_decode_str(segment)
                    .decode_utf8()
                    .map_or_else(|_| segment.to_string(), |decoded| decoded.into_owned())
            },
        )
}

/// Media MIME type by file extension, `application/octet-stream` otherwise.
fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "ogg" | "oga" => "audio/ogg",
        "mp4" => "video/mp4",
        "m4v" => "video/x-m4v",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "wmv" => "video/x-ms-wmv",
        _ => FALLBACK_MIME,
    }
}
