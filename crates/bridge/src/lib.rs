// SPDX-License-Identifier: MIT

//! The DevTools Wall bridge: WebSocket connection handling, dehydration
//! cleaning, inspect round-trips, and connection health (spec §4.4, §4.6).

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod bridge;
mod connection;
mod dehydration;
mod health;
mod inspection;
mod protocol;

pub use bridge::{BridgeState, FrameOutcome};
pub use connection::{serve, BridgeInbound, ConnectionId};
pub use dehydration::{clean_inspected_element, clean_value};
pub use health::{ConnectionEvent, ConnectionEventKind, ConnectionHealthTracker};
pub use inspection::InspectionRegistry;
pub use protocol::{parse_peer_event, Envelope, OutboundEvent, PeerEvent, HANDSHAKE_SEQUENCE};
