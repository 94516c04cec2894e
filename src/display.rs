//! Roster status report emitted once per tick cycle
//!
//! Pure formatting only; the coordinator decides when and at which log
//! level to emit it.

use crate::listing_manager::ServerListing;
use std::fmt::Write;

/// Renders the service announcement and the current roster as a
/// multi-line report
pub fn format_roster(service_message: &str, listings: &[ServerListing]) -> String {
    let mut report = format!("{} registered LAN server(s)", listings.len());

    if !service_message.is_empty() {
        let _ = write!(report, " | announcement: {}", service_message);
    }

    for listing in listings {
        let _ = write!(
            report,
            "\n  {} [{} / {}] port {} (silent for {} tick(s))",
            listing.name, listing.players, listing.max_players, listing.port, listing.silent_ticks
        );
    }

    report
}
