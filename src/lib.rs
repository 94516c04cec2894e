//! # PAX+ Server Reporting Client
//!
//! This library discovers PAX game servers on the local network and
//! mirrors the discovered roster to the PAX+ masterserver, giving LAN
//! servers wide-area visibility without any per-server registration.
//!
//! ## How discovery works
//!
//! Every tick the client broadcasts the fixed beacon query datagram to
//! the LAN. Running servers answer with a binary "SR" reply carrying
//! their port, slot counts and name. Replies are decoded and reconciled
//! into the roster the moment they arrive; the roster diffs each reply
//! against what it already knows and emits at most one add/update action
//! per change, so the chatty beacon traffic never floods the
//! masterserver. Servers that stop answering are aged once per tick and
//! delisted after a configurable number of silent cycles.
//!
//! ## How mirroring works
//!
//! Roster changes accumulate in an ordered outbound queue and are pushed
//! to the masterserver as one batched request per tick. Delivery is
//! at-most-once per batch: a failed push is dropped and the roster's own
//! churn, plus a periodic heartbeat that re-announces every known server,
//! brings the remote view back in sync. The heartbeat also refreshes the
//! masterserver-issued configuration and reschedules itself when the
//! issued cadence changes.
//!
//! ## Module Organization
//!
//! - [`beacon`]: binary codec for the beacon wire format and the
//!   constant query datagram
//! - [`listing_manager`]: the roster map with reconcile/expire/clear
//!   diffing
//! - [`sync_queue`]: ordered outbound action queue with atomic
//!   snapshot-and-clear flushing
//! - [`masterserver`]: HTTP client for the directory service endpoints
//! - [`network`]: the coordinator loop tying the cycles together
//! - [`config`]: local settings file handling
//! - [`display`]: roster status report formatting
//!
//! ## Architecture Notes
//!
//! All mutable state lives in a single coordinator loop; background
//! tasks (the socket receiver, config fetches, in-flight pushes) only
//! communicate with it over channels or own their data outright. That
//! keeps the roster free of locks while letting slow network calls
//! overlap freely with the timers.

pub mod beacon;
pub mod config;
pub mod display;
pub mod listing_manager;
pub mod masterserver;
pub mod network;
pub mod sync_queue;
