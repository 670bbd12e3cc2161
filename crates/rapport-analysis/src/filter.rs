//! Drops messages that are not a direct exchange between the two partners:
//! forwards, pasted chat excerpts, and messages relaying or discussing a
//! third party.
//!
//! Fail-open: anything the filter cannot classify (non-text kinds, empty
//! text) is kept.

use serde::{Deserialize, Serialize};

use rapport_core::types::{Message, MessageStream};

use crate::catalog::PatternCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterReason {
    Forwarded,
    EmbeddedQuote,
    ThirdPartyAttribution,
    ThirdPartySubject,
}

/// Outcome of filtering one stream.
#[derive(Debug, Clone, Default)]
pub struct FilteredStream {
    pub stream: MessageStream,
    /// `(message id, reason)` for every dropped message, in stream order.
    pub dropped: Vec<(String, FilterReason)>,
}

pub struct MessageFilter<'c> {
    catalog: &'c PatternCatalog,
}

impl<'c> MessageFilter<'c> {
    pub fn new(catalog: &'c PatternCatalog) -> Self {
        Self { catalog }
    }

    /// Why `message` should be excluded, if it should.
    pub fn classify(&self, message: &Message) -> Option<FilterReason> {
        if !message.has_text() {
            return None;
        }
        let text = message.text.as_str();
        let rules = self.catalog.filter_rules();
        if rules.forwarded.iter().any(|r| r.is_match(text)) {
            return Some(FilterReason::Forwarded);
        }
        if rules.embedded_timestamp.iter().any(|r| r.is_match(text)) {
            return Some(FilterReason::EmbeddedQuote);
        }
        if rules.third_party_attribution.iter().any(|r| r.is_match(text)) {
            return Some(FilterReason::ThirdPartyAttribution);
        }
        if rules.third_party_subject.iter().any(|r| r.is_match(text)) {
            return Some(FilterReason::ThirdPartySubject);
        }
        None
    }

    /// Filter a whole stream, preserving order and participants.
    pub fn filter(&self, stream: &MessageStream) -> FilteredStream {
        let mut dropped = Vec::new();
        let kept = stream.filtered(|m| match self.classify(m) {
            Some(reason) => {
                dropped.push((m.id.clone(), reason));
                false
            }
            None => true,
        });
        if !dropped.is_empty() {
            tracing::debug!(
                dropped = dropped.len(),
                kept = kept.len(),
                "filtered non-dyadic messages"
            );
        }
        FilteredStream {
            stream: kept,
            dropped,
        }
    }
}
