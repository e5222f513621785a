use serde::{Deserialize, Serialize};

use crate::game::state::GameState;

/// Current wire schema version. Envelopes carrying a different version are
/// ignored at the receiving boundary.
pub const PROTOCOL_VERSION: u8 = 1;

/// Messages exchanged over a peer connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NetworkMessage {
    /// guest -> host: register a new player
    JoinRequest { name: String, color: String },
    /// guest -> host: update heading (radians)
    InputUpdate { angle: f32 },
    /// host -> guest: full authoritative snapshot
    StateUpdate { state: GameState },
    /// host -> guest: boss flavor commentary
    AiComment { text: String },
    /// Reserved; not produced by any current control flow
    ChatMessage { sender: String, text: String },
}

/// Versioned wrapper around every wire message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub version: u8,
    pub msg: NetworkMessage,
}

impl Envelope {
    pub fn new(msg: NetworkMessage) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            msg,
        }
    }
}

/// Encode a message using bincode
/// Uses legacy config for fixed-size integers
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, EncodeError> {
    bincode::serde::encode_to_vec(message, bincode::config::legacy())
        .map_err(|e| EncodeError(e.to_string()))
}

/// Decode a message using bincode
/// Uses legacy config for fixed-size integers
pub fn decode<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, DecodeError> {
    bincode::serde::decode_from_slice(data, bincode::config::legacy())
        .map(|(msg, _)| msg)
        .map_err(|e| DecodeError(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
#[error("Encode error: {0}")]
pub struct EncodeError(String);

#[derive(Debug, thiserror::Error)]
#[error("Decode error: {0}")]
pub struct DecodeError(String);
