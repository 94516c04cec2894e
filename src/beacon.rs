//! Binary codec for the LAN beacon protocol shared by all PAX game servers
//!
//! The beacon socket carries two kinds of datagrams: the query we broadcast
//! ("SQ") and the replies servers answer with ("SR"). Both use the same fixed
//! byte layout, discriminated by a two-character ASCII marker. Queries and
//! unrelated traffic show up on the same socket constantly, so anything that
//! is not a well-formed reply decodes to `None` rather than an error.

use crate::listing_manager::ServerListing;
use std::net::Ipv4Addr;

/// Well-known UDP port the beacon protocol runs on
pub const BEACON_PORT: u16 = 14001;

/// The fixed query datagram broadcast every tick. Servers on the LAN answer
/// it with an "SR" reply; the payload itself carries no variable fields.
pub const QUERY_PACKET: [u8; 20] = [
    0x08, 0x01, 0x4d, 0x57, 0x07, 0xdb, 0x6b, 0x5f, 0xa5, 0xe5, 0x53, 0x51, 0x0d, 0x6f, 0xe2,
    0xb0, 0xd4, 0xd9, 0x0c, 0xb9,
];

// Reply layout, offsets from the start of the datagram
const TYPE_OFFSET: usize = 10; // 2-char ASCII marker ("SQ" / "SR")
const IP_OFFSET: usize = 20; // 4 IPv4 octets
const PORT_OFFSET: usize = 26; // big-endian u16
const OPEN_SLOTS_OFFSET: usize = 31; // u8
const MAX_SLOTS_OFFSET: usize = 39; // u8
const NAME_OFFSET: usize = 64; // NUL-padded UTF-8 until end of datagram

/// A decoded "SR" beacon reply
///
/// The source address is reported by the server itself inside the payload.
/// PAX servers are LAN-only and always announce their local IP, so callers
/// currently key everything off the port instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconReply {
    pub ip: Ipv4Addr,
    pub listing: ServerListing,
}

/// Decodes a beacon reply datagram into a server listing
///
/// Returns `None` for queries, truncated datagrams and any other traffic
/// that is not an "SR" reply. The player count is derived from the slot
/// fields (`max - open`) and may be negative when a server reports
/// inconsistent slot numbers; the value is passed through unclamped so the
/// masterserver sees exactly what the server announced.
pub fn decode_reply(buf: &[u8]) -> Option<BeaconReply> {
    if buf.len() < NAME_OFFSET {
        return None;
    }

    if &buf[TYPE_OFFSET..TYPE_OFFSET + 2] != b"SR" {
        return None;
    }

    let ip = Ipv4Addr::new(
        buf[IP_OFFSET],
        buf[IP_OFFSET + 1],
        buf[IP_OFFSET + 2],
        buf[IP_OFFSET + 3],
    );
    let port = u16::from_be_bytes([buf[PORT_OFFSET], buf[PORT_OFFSET + 1]]);
    let open_slots = buf[OPEN_SLOTS_OFFSET];
    let max_slots = buf[MAX_SLOTS_OFFSET];

    let name = String::from_utf8_lossy(&buf[NAME_OFFSET..])
        .trim_end_matches('\0')
        .to_string();

    let players = i32::from(max_slots) - i32::from(open_slots);

    Some(BeaconReply {
        ip,
        listing: ServerListing::new(name, players, u32::from(max_slots), port),
    })
}
