use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RedirectMessage {
    pub content: String,
}

/// Messages pushed to browser clients over the websocket
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    #[serde(rename = "status")]
    Status(StatusMessage),
    #[serde(rename = "redirect")]
    Redirect(RedirectMessage),
}

impl OutboundMessage {
    /// Status update carrying the file content. Empty content yields `None`.
    pub fn status(content: impl Into<String>) -> Option<Self> {
        let content = content.into();
        if content.is_empty() {
            return None;
        }
        Some(OutboundMessage::Status(StatusMessage { content }))
    }

    pub fn redirect(target: impl Into<String>) -> Self {
        OutboundMessage::Redirect(RedirectMessage {
            content: target.into(),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
