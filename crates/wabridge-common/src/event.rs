use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Raw identifier fields of an inbound chat message, as delivered by the
/// chat-network engine. Individually unreliable; `jid::resolve_user_jid`
/// picks the first usable one in priority order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessageKeys {
    /// Preferred: the sender's physical number (LID mappings).
    #[serde(default)]
    pub sender_pn: Option<String>,
    #[serde(default)]
    pub sender_jid: Option<String>,
    /// Set when the message comes from a group.
    #[serde(default)]
    pub participant: Option<String>,
    /// Standard private chat id.
    #[serde(default)]
    pub remote_jid: Option<String>,
}

/// One inbound event from the chat network, webhook wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    #[serde(default)]
    pub keys: RawMessageKeys,
    /// Display name the sender advertises.
    #[serde(default)]
    pub push_name: String,
    pub event: EventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// First contact / free-text message.
    Welcome {
        #[serde(default)]
        body: String,
    },
    VoiceNote {
        media: MediaPayload,
    },
    /// Image or video.
    Media {
        media: MediaPayload,
        #[serde(default)]
        caption: Option<String>,
    },
    Document {
        media: MediaPayload,
        #[serde(default)]
        caption: Option<String>,
    },
    Location {
        #[serde(default)]
        latitude: Option<f64>,
        #[serde(default)]
        longitude: Option<f64>,
    },
}

/// Binary attachment payload, base64-encoded on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaPayload {
    pub data: String,
    /// File extension hint (no dot), e.g. "jpg", "oga".
    #[serde(default)]
    pub extension: Option<String>,
}

impl MediaPayload {
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| Error::Media(format!("invalid base64 media payload: {e}")))
    }
}
