//! The ordered, sender-tagged message stream.

use chrono::{DateTime, NaiveDateTime, Utc};

use super::message::{Message, MessageKind, RawMessage, Sender};
use super::window::ScoringWindow;
use crate::errors::{MessageError, RunResult};

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Chronological messages between exactly two participants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageStream {
    participants: [String; 2],
    messages: Vec<Message>,
}

impl MessageStream {
    /// Build a stream from already-tagged messages. Out-of-order input is
    /// stably re-sorted by timestamp.
    pub fn from_messages(mut messages: Vec<Message>) -> Self {
        sort_chronologically(&mut messages);
        Self {
            participants: ["A".to_string(), "B".to_string()],
            messages,
        }
    }

    /// Tag raw parser records with `Sender::A`/`Sender::B`.
    ///
    /// Participants are the given pair, or the first two distinct sender
    /// names in input order. Records with an unparseable timestamp, an empty
    /// sender, or a third sender are skipped and reported as non-fatal errors.
    pub fn ingest(raw: Vec<RawMessage>, participants: Option<(&str, &str)>) -> RunResult<Self> {
        let mut names: Vec<String> = match participants {
            Some((a, b)) => vec![a.trim().to_string(), b.trim().to_string()],
            None => Vec::with_capacity(2),
        };
        let mut messages = Vec::with_capacity(raw.len());
        let mut errors = Vec::new();

        for record in raw {
            let sender_name = record.sender.trim();
            if sender_name.is_empty() {
                errors.push(MessageError::EmptySender { id: record.id });
                continue;
            }
            let Some(timestamp) = parse_timestamp(&record.timestamp) else {
                errors.push(MessageError::InvalidTimestamp {
                    id: record.id,
                    value: record.timestamp,
                });
                continue;
            };
            let known = names.iter().position(|n| n == sender_name);
            let sender = match known {
                Some(0) => Sender::A,
                Some(_) => Sender::B,
                None if names.len() < 2 => {
                    names.push(sender_name.to_string());
                    if names.len() == 1 {
                        Sender::A
                    } else {
                        Sender::B
                    }
                }
                None => {
                    errors.push(MessageError::UnknownSender {
                        id: record.id,
                        sender: sender_name.to_string(),
                    });
                    continue;
                }
            };
            messages.push(Message {
                id: record.id,
                timestamp,
                sender,
                text: record.text,
                kind: record
                    .kind
                    .as_deref()
                    .map(MessageKind::parse_str)
                    .unwrap_or_default(),
            });
        }

        for error in &errors {
            tracing::warn!(message_id = error.message_id(), reason = %error, "skipping malformed message");
        }

        sort_chronologically(&mut messages);
        let mut participants = [String::new(), String::new()];
        for (slot, name) in participants.iter_mut().zip(names) {
            *slot = name;
        }

        let mut result = RunResult::new(Self {
            participants,
            messages,
        });
        for error in errors {
            result.add_error(error);
        }
        result
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn participant(&self, sender: Sender) -> &str {
        match sender {
            Sender::A => &self.participants[0],
            Sender::B => &self.participants[1],
        }
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.messages.first().map(|m| m.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.messages.last().map(|m| m.timestamp)
    }

    /// Index range of the messages inside `window`.
    pub fn window_range(&self, window: &ScoringWindow) -> std::ops::Range<usize> {
        let lo = self
            .messages
            .partition_point(|m| m.timestamp <= window.start);
        let hi = self.messages.partition_point(|m| m.timestamp <= window.end);
        lo..hi.max(lo)
    }

    /// The messages inside `window`.
    pub fn in_window(&self, window: &ScoringWindow) -> &[Message] {
        &self.messages[self.window_range(window)]
    }

    /// A new stream with the same participants holding only the messages
    /// `keep` accepts. Order is preserved.
    pub fn filtered(&self, mut keep: impl FnMut(&Message) -> bool) -> Self {
        Self {
            participants: self.participants.clone(),
            messages: self.messages.iter().filter(|m| keep(m)).cloned().collect(),
        }
    }
}

fn sort_chronologically(messages: &mut [Message]) {
    let out_of_order = messages
        .windows(2)
        .filter(|w| w[1].timestamp < w[0].timestamp)
        .count();
    if out_of_order > 0 {
        tracing::warn!(out_of_order, "message stream not chronological, re-sorting");
        messages.sort_by_key(|m| m.timestamp);
    }
}

/// Parse RFC 3339, or a naive `YYYY-MM-DD HH:MM[:SS]` timestamp taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, ts: &str, sender: &str, text: &str) -> RawMessage {
        RawMessage {
            id: id.to_string(),
            timestamp: ts.to_string(),
            sender: sender.to_string(),
            text: text.to_string(),
            kind: None,
        }
    }

    #[test]
    fn ingest_tags_first_two_senders() {
        let result = MessageStream::ingest(
            vec![
                raw("1", "2024-01-01 10:00:00", "Ana", "oi"),
                raw("2", "2024-01-01 10:01:00", "Bruno", "oi amor"),
                raw("3", "2024-01-01 10:02:00", "Ana", "tudo bem?"),
            ],
            None,
        );
        assert!(result.is_clean());
        let stream = result.data;
        assert_eq!(stream.participant(Sender::A), "Ana");
        assert_eq!(stream.participant(Sender::B), "Bruno");
        let senders: Vec<Sender> = stream.messages().iter().map(|m| m.sender).collect();
        assert_eq!(senders, vec![Sender::A, Sender::B, Sender::A]);
    }

    #[test]
    fn malformed_records_are_skipped_not_fatal() {
        let result = MessageStream::ingest(
            vec![
                raw("1", "2024-01-01 10:00:00", "Ana", "oi"),
                raw("2", "ontem", "Bruno", "oi"),
                raw("3", "2024-01-01 10:02:00", "", "??"),
                raw("4", "2024-01-01 10:03:00", "Bruno", "oi"),
                raw("5", "2024-01-01 10:04:00", "Carla", "oi gente"),
            ],
            None,
        );
        assert_eq!(result.error_count(), 3);
        assert_eq!(result.data.len(), 2);
    }

    #[test]
    fn out_of_order_input_is_sorted() {
        let result = MessageStream::ingest(
            vec![
                raw("2", "2024-01-01T10:05:00Z", "Ana", "depois"),
                raw("1", "2024-01-01T10:00:00Z", "Bruno", "antes"),
            ],
            Some(("Ana", "Bruno")),
        );
        let ids: Vec<&str> = result.data.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn unknown_kind_maps_to_system() {
        let mut record = raw("1", "2024-01-01 10:00:00", "Ana", "");
        record.kind = Some("poll".to_string());
        let result = MessageStream::ingest(vec![record], None);
        assert_eq!(result.data.messages()[0].kind, MessageKind::System);
    }
}
