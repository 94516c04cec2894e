//! Outbound action queue mirroring roster changes to the masterserver
//!
//! Roster reconciliation and expiry produce add/update/delete actions;
//! this queue accumulates them in arrival order and ships them as one
//! batched request per flush. Delivery is at-most-once per batch: a
//! failed batch is logged and dropped, and the next reconcile or
//! heartbeat cycle repairs whatever the masterserver missed.

use crate::listing_manager::ServerListing;
use crate::masterserver::MasterClient;
use log::error;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

/// What a directory action asks the masterserver to do with a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Add,
    Update,
    Delete,
}

/// One roster change destined for the masterserver
///
/// Carries a snapshot of the listing as it looked when the change
/// happened, so later roster mutations cannot rewrite an already queued
/// action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub server: ServerListing,
}

impl DirectoryAction {
    pub fn add(server: ServerListing) -> Self {
        Self {
            kind: ActionKind::Add,
            server,
        }
    }

    pub fn update(server: ServerListing) -> Self {
        Self {
            kind: ActionKind::Update,
            server,
        }
    }

    pub fn delete(server: ServerListing) -> Self {
        Self {
            kind: ActionKind::Delete,
            server,
        }
    }
}

/// Accumulates pending directory actions between flushes
///
/// Arrival order is preserved through the flush, so a `Delete` can never
/// overtake the `Add` or `Update` that logically preceded it in the same
/// batch.
#[derive(Debug, Default)]
pub struct SyncQueue {
    pending: Vec<DirectoryAction>,
}

impl SyncQueue {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Appends one action to the pending batch
    pub fn enqueue(&mut self, action: DirectoryAction) {
        self.pending.push(action);
    }

    /// Appends a sequence of actions, keeping their relative order
    pub fn extend(&mut self, actions: impl IntoIterator<Item = DirectoryAction>) {
        self.pending.extend(actions);
    }

    /// Sends the pending batch to the masterserver
    ///
    /// The pending list is snapshotted and cleared synchronously before
    /// the request task starts, so actions enqueued while a request is in
    /// flight land in a fresh batch instead of being lost or duplicated.
    /// The request itself runs on a spawned task; the caller keeps
    /// ticking while it is in flight. On failure the batch is dropped,
    /// not re-enqueued.
    ///
    /// Returns the task handle for callers that need to wait for the
    /// outcome (the bounded shutdown flush); steady-state callers drop it.
    pub fn flush(&mut self, master: &MasterClient) -> Option<JoinHandle<()>> {
        if self.pending.is_empty() {
            return None;
        }

        let batch = std::mem::take(&mut self.pending);
        let master = master.clone();

        Some(tokio::spawn(async move {
            if let Err(e) = master.push_listings(&batch).await {
                error!(
                    "PUT serverListings failed, dropping {} action(s): {}",
                    batch.len(),
                    e
                );
            }
        }))
    }

    /// Returns the number of actions waiting for the next flush
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if no actions are waiting
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
