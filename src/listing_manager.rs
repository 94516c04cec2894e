//! Server roster management for discovered LAN game servers
//!
//! This module owns the map of servers currently visible on the local
//! network and turns the noisy stream of repeated beacon replies into a
//! clean sequence of add/update/delete actions for the masterserver:
//! - First reply for a port registers the server (`Add`)
//! - A reply with changed fields replaces the listing (`Update`)
//! - An identical reply only refreshes the liveness counter (no action)
//! - Servers that stay silent for too many ticks are evicted (`Delete`)
//!
//! The manager is plain owned state. It is driven exclusively from the
//! coordinator loop, so it needs no locking; callers decide what to do
//! with the actions it emits.

use crate::sync_queue::DirectoryAction;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One discovered game server as reported by its beacon replies
///
/// The port doubles as the listing key: PAX servers are LAN-local, so the
/// advertised IP is ignored and a port can only ever host one server.
/// `players` is signed because servers with broken slot accounting can
/// report more open slots than total slots; the negative count is kept
/// as-is rather than papered over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerListing {
    pub name: String,
    pub players: i32,
    pub max_players: u32,
    pub port: u16,
    /// Consecutive tick cycles without a confirming reply
    pub silent_ticks: u32,
}

impl ServerListing {
    /// Creates a freshly seen listing with its liveness counter at zero
    pub fn new(name: impl Into<String>, players: i32, max_players: u32, port: u16) -> Self {
        Self {
            name: name.into(),
            players,
            max_players,
            port,
            silent_ticks: 0,
        }
    }

    /// Compares everything a beacon reply reports, ignoring the liveness
    /// counter (which only this process mutates)
    fn same_reported_state(&self, other: &ServerListing) -> bool {
        self.name == other.name
            && self.players == other.players
            && self.max_players == other.max_players
            && self.port == other.port
    }
}

/// Manages all currently discovered server listings
///
/// Emits at most one action per reconciled reply and one `Delete` per
/// evicted listing, so repeated identical replies never flood the
/// outbound queue.
#[derive(Debug, Default)]
pub struct ListingManager {
    /// Discovered servers indexed by their advertised port
    listings: HashMap<u16, ServerListing>,
}

impl ListingManager {
    pub fn new() -> Self {
        Self {
            listings: HashMap::new(),
        }
    }

    /// Applies one decoded beacon reply to the roster
    ///
    /// Returns the action the masterserver needs to hear about, if any.
    /// In every case the listing's `silent_ticks` ends up at zero; the
    /// reply just proved the server is alive.
    pub fn reconcile(&mut self, incoming: ServerListing) -> Option<DirectoryAction> {
        let mut fresh = incoming;
        fresh.silent_ticks = 0;

        if let Some(existing) = self.listings.get_mut(&fresh.port) {
            if existing.same_reported_state(&fresh) {
                existing.silent_ticks = 0;
                return None;
            }

            info!(
                "\"{}\" on port {} changed ({} / {} players)",
                fresh.name, fresh.port, fresh.players, fresh.max_players
            );
            *existing = fresh.clone();
            return Some(DirectoryAction::update(fresh));
        }

        info!(
            "Discovered \"{}\" on port {} ({} / {} players)",
            fresh.name, fresh.port, fresh.players, fresh.max_players
        );
        self.listings.insert(fresh.port, fresh.clone());
        Some(DirectoryAction::add(fresh))
    }

    /// Ages every listing by one tick cycle and evicts the silent ones
    ///
    /// Runs once per tick, after all of that cycle's reconciliations.
    /// Every listing is aged, including ones reconciled this cycle; their
    /// counter was just reset to zero, so a single cycle can never expire
    /// a freshly seen server. A listing is evicted once its counter
    /// exceeds `threshold`, yielding one `Delete` each.
    pub fn expire(&mut self, threshold: u32) -> Vec<DirectoryAction> {
        for listing in self.listings.values_mut() {
            listing.silent_ticks += 1;
        }

        let stale: Vec<u16> = self
            .listings
            .values()
            .filter(|listing| listing.silent_ticks > threshold)
            .map(|listing| listing.port)
            .collect();

        let mut expired = Vec::with_capacity(stale.len());
        for port in stale {
            if let Some(listing) = self.listings.remove(&port) {
                info!("\"{}\" on port {} went silent, delisting", listing.name, port);
                expired.push(DirectoryAction::delete(listing));
            }
        }
        expired
    }

    /// Returns copies of all current listings in port order
    ///
    /// The heartbeat uses this for its full re-announce; the order is
    /// stable within a call so the masterserver receives deterministic
    /// batches.
    pub fn snapshot(&self) -> Vec<ServerListing> {
        let mut listings: Vec<ServerListing> = self.listings.values().cloned().collect();
        listings.sort_by_key(|listing| listing.port);
        listings
    }

    /// Delists everything, emitting one `Delete` per listing
    ///
    /// Used during shutdown. Calling it again on an already empty roster
    /// returns nothing, so a double shutdown cannot produce duplicate
    /// deletes.
    pub fn clear(&mut self) -> Vec<DirectoryAction> {
        let mut drained: Vec<ServerListing> = self
            .listings
            .drain()
            .map(|(_, listing)| listing)
            .collect();
        drained.sort_by_key(|listing| listing.port);
        drained.into_iter().map(DirectoryAction::delete).collect()
    }

    /// Returns the number of currently listed servers
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    /// Returns true if no servers are currently listed
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}
