//! Progress events emitted by the transfer core
//!
//! The core never touches a terminal; it sends [`ProgressUpdate`] values over
//! a channel and the presentation layer decides how to render them.

use std::fmt;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Weight of the source-acquisition phase in the blended percentage
pub const DOWNLOAD_WEIGHT: f64 = 0.3;

/// Weight of the destination-write phase in the blended percentage
pub const UPLOAD_WEIGHT: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Validating,
    Uploading,
    Importing,
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            Self::Validating => "validating",
            Self::Uploading => "uploading",
            Self::Importing => "importing",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{phase}")
    }
}

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub transfer_id: String,
    pub name: String,
    pub total_bytes: u64,
    /// 0-100, held below 100 until the transfer completes
    pub percentage: u8,
    pub phase: Phase,
}

/// Sender half shared by every transfer of one uploader.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: UnboundedSender<ProgressUpdate>,
}

impl ProgressReporter {
    #[must_use]
    pub fn channel() -> (Self, UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }

    /// Bind the reporter to one transfer.
    #[must_use]
    pub fn for_transfer(&self, transfer_id: &str, name: &str, total_bytes: u64) -> TransferProgress {
        TransferProgress {
            tx: self.tx.clone(),
            transfer_id: transfer_id.to_string(),
            name: name.to_string(),
            total_bytes,
        }
    }
}

/// Per-transfer progress handle.
#[derive(Debug, Clone)]
pub struct TransferProgress {
    tx: UnboundedSender<ProgressUpdate>,
    transfer_id: String,
    name: String,
    total_bytes: u64,
}

impl TransferProgress {
    /// Emit one update; 100% is only ever reported with [`Phase::Completed`].
    pub fn report(&self, percentage: f64, phase: Phase) {
        let cap = if phase == Phase::Completed { 100 } else { 99 };
        // observers may have gone away, which is not this transfer's problem
        let _ = self.tx.send(ProgressUpdate {
            transfer_id: self.transfer_id.clone(),
            name: self.name.clone(),
            total_bytes: self.total_bytes,
            percentage: quantize(percentage, cap),
            phase,
        });
    }

    #[must_use]
    pub fn transfer_id(&self) -> &str {
        &self.transfer_id
    }

    #[must_use]
    pub const fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}

/// Combine the source-acquisition and destination-write percentages of a
/// streaming relay into one overall percentage.
#[must_use]
pub fn blend_progress(download_pct: f64, upload_pct: f64) -> f64 {
    download_pct.mul_add(DOWNLOAD_WEIGHT, upload_pct * UPLOAD_WEIGHT)
}

/// Percentage of `done` over `total`, 0 when the total is unknown.
#[must_use]
pub fn percent(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let pct = (done as f64 / total as f64) * 100.0;
    pct
}

fn quantize(percentage: f64, cap: u8) -> u8 {
    let clamped = percentage.clamp(0.0, f64::from(cap));
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let whole = clamped.round() as u8;
    whole
}
