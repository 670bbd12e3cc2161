//! Per-message ingestion errors. Never fatal: the message is skipped and the run continues.

use super::error_code::{self, RapportErrorCode};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MessageError {
    #[error("Message {id}: unparseable timestamp '{value}'")]
    InvalidTimestamp { id: String, value: String },

    #[error("Message {id}: empty sender")]
    EmptySender { id: String },

    #[error("Message {id}: sender '{sender}' is not one of the two participants")]
    UnknownSender { id: String, sender: String },
}

impl MessageError {
    pub fn message_id(&self) -> &str {
        match self {
            Self::InvalidTimestamp { id, .. }
            | Self::EmptySender { id }
            | Self::UnknownSender { id, .. } => id,
        }
    }
}

impl RapportErrorCode for MessageError {
    fn error_code(&self) -> &'static str {
        error_code::MALFORMED_MESSAGE
    }
}
