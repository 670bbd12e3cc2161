//! The message model handed over by the transcript parser.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the two participants of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sender {
    A,
    B,
}

impl Sender {
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    Audio,
    Document,
    Sticker,
    Call,
    System,
}

impl MessageKind {
    /// Parse a kind name. Unknown names are treated as `System` so they never
    /// contribute to pattern detection or participation counts.
    pub fn parse_str(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "text" => Self::Text,
            "image" => Self::Image,
            "audio" => Self::Audio,
            "document" => Self::Document,
            "sticker" => Self::Sticker,
            "call" => Self::Call,
            _ => Self::System,
        }
    }

    pub fn is_text(self) -> bool {
        self == Self::Text
    }
}

/// An ingested, immutable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub sender: Sender,
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        sender: Sender,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            sender,
            text: text.into(),
            kind: MessageKind::Text,
        }
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    /// A text message with non-blank content.
    pub fn has_text(&self) -> bool {
        self.kind.is_text() && !self.text.trim().is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// A record as produced by the external parser, before sender tagging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: String,
    pub timestamp: String,
    pub sender: String,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}
