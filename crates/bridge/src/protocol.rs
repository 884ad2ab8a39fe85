// SPDX-License-Identifier: MIT

//! The Wall protocol envelope and event vocabulary (spec §4.4, §6.1).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};

/// `{event, payload}` — the only frame shape the Wall protocol carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default = "default_payload")]
    pub payload: Json,
}

fn default_payload() -> Json {
    Json::Null
}

impl Envelope {
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A decoded inbound Wall-protocol event (spec §4.4's peer → bridge table).
#[derive(Debug, Clone)]
pub enum PeerEvent {
    BackendInitialized,
    Renderer { payload: Json },
    Operations { ints: Vec<i64> },
    InspectedElement { payload: Json },
    ProfilingData { payload: Json },
    Shutdown,
    /// Recognized, no-op event.
    Accepted,
    /// Anything not named in §4.4.
    Ignored,
}

/// Parses a raw text frame. Returns `None` on invalid JSON — the caller
/// discards the frame silently per spec §7's `Transport` handling.
pub fn parse_peer_event(text: &str) -> Option<PeerEvent> {
    let envelope: Envelope = serde_json::from_str(text).ok()?;
    Some(match envelope.event.as_str() {
        "backendInitialized" => PeerEvent::BackendInitialized,
        "renderer" | "rendererAttached" => PeerEvent::Renderer { payload: envelope.payload },
        "operations" => {
            let ints = envelope.payload.as_array().map(|arr| arr.iter().filter_map(Json::as_i64).collect()).unwrap_or_default();
            PeerEvent::Operations { ints }
        }
        "inspectedElement" => PeerEvent::InspectedElement { payload: envelope.payload },
        "profilingData" => PeerEvent::ProfilingData { payload: envelope.payload },
        "shutdown" => PeerEvent::Shutdown,
        "bridgeProtocol" | "backendVersion" | "profilingStatus" | "overrideComponentFilters" | "hookSettings"
        | "isBackendStorageAPISupported" | "isReactNativeEnvironment" | "isReloadAndProfileSupportedByBackend"
        | "isSynchronousXHRSupported" | "syncSelectionFromNativeElementsPanel" | "unsupportedRendererVersion" => {
            PeerEvent::Accepted
        }
        _ => PeerEvent::Ignored,
    })
}

/// A Wall-protocol event the daemon sends to a peer.
#[derive(Debug, Clone)]
pub enum OutboundEvent {
    GetBridgeProtocol,
    GetBackendVersion,
    GetIfHasUnsupportedRendererVersion,
    GetHookSettings,
    GetProfilingStatus,
    InspectElement { id: u32, renderer_id: u32 },
    StartProfiling,
    StopProfiling,
}

/// The fixed handshake reply sequence (spec §4.4), one message each.
pub const HANDSHAKE_SEQUENCE: [OutboundEvent; 5] = [
    OutboundEvent::GetBridgeProtocol,
    OutboundEvent::GetBackendVersion,
    OutboundEvent::GetIfHasUnsupportedRendererVersion,
    OutboundEvent::GetHookSettings,
    OutboundEvent::GetProfilingStatus,
];

impl OutboundEvent {
    pub fn to_envelope(&self) -> Envelope {
        match self {
            OutboundEvent::GetBridgeProtocol => Envelope { event: "getBridgeProtocol".into(), payload: Json::Null },
            OutboundEvent::GetBackendVersion => Envelope { event: "getBackendVersion".into(), payload: Json::Null },
            OutboundEvent::GetIfHasUnsupportedRendererVersion => {
                Envelope { event: "getIfHasUnsupportedRendererVersion".into(), payload: Json::Null }
            }
            OutboundEvent::GetHookSettings => Envelope { event: "getHookSettings".into(), payload: Json::Null },
            OutboundEvent::GetProfilingStatus => Envelope { event: "getProfilingStatus".into(), payload: Json::Null },
            OutboundEvent::InspectElement { id, renderer_id } => Envelope {
                event: "inspectElement".into(),
                payload: json!({
                    "id": id,
                    "rendererID": renderer_id,
                    "forceFullData": true,
                    "requestID": id,
                    "path": Json::Null,
                }),
            },
            OutboundEvent::StartProfiling => Envelope { event: "startProfiling".into(), payload: Json::Null },
            OutboundEvent::StopProfiling => Envelope { event: "stopProfiling".into(), payload: Json::Null },
        }
    }
}
