//! Feed protocol message types
//!
//! JSON text frames exchanged with the hosted feed endpoint.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::RawChange;

/// Messages sent to the feed endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Subscribe to one list's changes
    #[serde(rename = "subscribe")]
    Subscribe {
        #[serde(rename = "listId")]
        list_id: Uuid,
    },
}

/// Messages received from the feed endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Subscription acknowledged; changes follow
    #[serde(rename = "ready")]
    Ready {
        #[serde(rename = "listId")]
        list_id: Uuid,
    },

    /// One change notification
    #[serde(rename = "change")]
    Change { change: RawChange },

    /// Error from the endpoint
    #[serde(rename = "error")]
    Error { message: String },
}

impl ClientMessage {
    /// Encode to a JSON text frame
    pub fn encode(&self) -> String {
        serde_json::to_string(self).expect("JSON encoding failed")
    }
}

impl ServerMessage {
    /// Decode from a JSON text frame
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
