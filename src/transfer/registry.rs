//! In-flight transfer bookkeeping
//!
//! The registry is the only mutable state shared between transfers. Entries
//! are created on first use and removed unconditionally once a transfer
//! reaches a terminal outcome; nothing survives a process restart.

use crate::transfer::{part::CompletedPart, state::MultipartState};
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct Entry {
    state: MultipartState,
    cancel: CancellationToken,
}

/// Per-transfer mutable records keyed by the client-assigned transfer id.
#[derive(Debug, Default)]
pub struct TransferRegistry {
    entries: Mutex<HashMap<String, Entry>>,
}

impl TransferRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the entry for a transfer if missing and return its
    /// cancellation token.
    pub fn register(&self, transfer_id: &str) -> CancellationToken {
        let mut entries = self.lock();
        entries
            .entry(transfer_id.to_string())
            .or_insert_with(|| Entry {
                state: MultipartState::default(),
                cancel: CancellationToken::new(),
            })
            .cancel
            .clone()
    }

    /// Seed a preserved state, e.g. to resume an interrupted transfer from
    /// its last failed part instead of part 1.
    pub fn restore(&self, transfer_id: &str, state: MultipartState) -> CancellationToken {
        let mut entries = self.lock();
        let entry = entries
            .entry(transfer_id.to_string())
            .or_insert_with(|| Entry {
                state: MultipartState::default(),
                cancel: CancellationToken::new(),
            });
        entry.state = state;
        entry.cancel.clone()
    }

    pub fn set_initiated(&self, transfer_id: &str, upload_id: &str, key: &str) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(transfer_id) {
            entry.state.upload_id = Some(upload_id.to_string());
            entry.state.key = Some(key.to_string());
        }
    }

    #[must_use]
    pub fn is_part_completed(&self, transfer_id: &str, part_number: u16) -> bool {
        self.lock().get(transfer_id).is_some_and(|entry| {
            entry.state.completed_parts.contains_key(&part_number)
        })
    }

    pub fn record_part(&self, transfer_id: &str, part: CompletedPart) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(transfer_id) {
            entry.state.record_part(part);
        }
    }

    pub fn record_failed_part(&self, transfer_id: &str, part_number: u16) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(transfer_id) {
            entry.state.last_failed_part = Some(part_number);
        }
    }

    /// Snapshot of the transfer's current state.
    #[must_use]
    pub fn state(&self, transfer_id: &str) -> Option<MultipartState> {
        self.lock().get(transfer_id).map(|entry| entry.state.clone())
    }

    /// Committed parts in ascending part-number order.
    #[must_use]
    pub fn completed_parts(&self, transfer_id: &str) -> Vec<CompletedPart> {
        self.lock()
            .get(transfer_id)
            .map(|entry| entry.state.parts_ascending())
            .unwrap_or_default()
    }

    /// Fire the transfer's cancellation token. Cooperative: in-flight
    /// operations stop when they next observe the signal.
    pub fn cancel(&self, transfer_id: &str) -> bool {
        self.lock().get(transfer_id).is_some_and(|entry| {
            entry.cancel.cancel();
            true
        })
    }

    /// Drop the entry, releasing its cancellation token.
    pub fn remove(&self, transfer_id: &str) -> Option<MultipartState> {
        self.lock().remove(transfer_id).map(|entry| entry.state)
    }

    #[must_use]
    pub fn contains(&self, transfer_id: &str) -> bool {
        self.lock().contains_key(transfer_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
