//! Rule-based pattern detection.
//!
//! Categories are resolved in catalog order (contempt first). Within a
//! category the longest candidate span wins, ties going to the earliest
//! declared trigger. Every candidate span of a matched category is consumed,
//! so a phrase is never scored by two categories.

use rayon::prelude::*;
use smallvec::SmallVec;

use rapport_core::types::{
    MatchSource, Message, PatternCategory, PatternMatch, Span,
};

use crate::catalog::{PatternCatalog, TriggerContext};

/// Replies shorter than this (non-whitespace chars) after an emotional bid
/// count as minimal.
pub const MINIMAL_REPLY_CHARS: usize = 5;

/// Trigger id used for minimal replies that no stonewalling trigger caught.
pub const MINIMAL_RESPONSE_TRIGGER: &str = "stonewalling.minimal-response";

/// Everything the detector learned about one message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageDetection {
    pub matches: SmallVec<[PatternMatch; 4]>,
    /// This message is itself an emotional bid.
    pub emotional: bool,
    /// The previous message was an emotional bid from the partner.
    pub responds_to_emotional: bool,
    /// Dismissive reply to an emotional bid.
    pub dismissive: bool,
}

struct Candidate<'t> {
    span: Span,
    order: usize,
    trigger_id: &'t str,
}

pub struct PatternDetector<'c> {
    catalog: &'c PatternCatalog,
}

impl<'c> PatternDetector<'c> {
    pub fn new(catalog: &'c PatternCatalog) -> Self {
        Self { catalog }
    }

    /// Detect patterns in `message`. `previous` is the message immediately
    /// before it in the (filtered) stream.
    pub fn detect(&self, message: &Message, previous: Option<&Message>) -> MessageDetection {
        if !message.has_text() {
            return MessageDetection::default();
        }
        let text = message.text.as_str();
        let emoji_only = is_emoji_only(text);
        let responds_to_emotional = previous.is_some_and(|p| {
            p.sender != message.sender
                && p.has_text()
                && self.catalog.is_emotionally_salient(&p.text)
        });

        let mut consumed: SmallVec<[Span; 8]> = SmallVec::new();
        let mut matches: SmallVec<[PatternMatch; 4]> = SmallVec::new();

        for rule in self.catalog.rules() {
            let mut candidates: SmallVec<[Candidate<'_>; 4]> = SmallVec::new();
            for (order, trigger) in rule.triggers.iter().enumerate() {
                if emoji_only && !trigger.is_emoji() {
                    continue;
                }
                if trigger.context == TriggerContext::AfterEmotional && !responds_to_emotional {
                    continue;
                }
                for span in trigger.spans(text) {
                    if consumed.iter().any(|c| c.overlaps(&span)) {
                        continue;
                    }
                    candidates.push(Candidate {
                        span,
                        order,
                        trigger_id: &trigger.id,
                    });
                }
            }

            let Some(winner) = candidates.iter().min_by(|x, y| {
                y.span
                    .len()
                    .cmp(&x.span.len())
                    .then(x.order.cmp(&y.order))
                    .then(x.span.start.cmp(&y.span.start))
            }) else {
                continue;
            };

            matches.push(PatternMatch {
                message_id: message.id.clone(),
                sender: message.sender,
                timestamp: message.timestamp,
                category: rule.category,
                polarity: rule.category.polarity(),
                source: MatchSource::Rule,
                confidence: 1.0,
                score_impact: rule.score_impact,
                span: Some(winner.span),
                excerpt: text[winner.span.start..winner.span.end].to_string(),
                trigger_id: winner.trigger_id.to_string(),
            });
            consumed.extend(candidates.iter().map(|c| c.span));
        }

        let dismissive = responds_to_emotional && !emoji_only && self.is_minimal_reply(text);
        if dismissive
            && !matches
                .iter()
                .any(|m| m.category == PatternCategory::Stonewalling)
        {
            if let Some(rule) = self.catalog.rule(PatternCategory::Stonewalling) {
                matches.push(PatternMatch {
                    message_id: message.id.clone(),
                    sender: message.sender,
                    timestamp: message.timestamp,
                    category: PatternCategory::Stonewalling,
                    polarity: PatternCategory::Stonewalling.polarity(),
                    source: MatchSource::Rule,
                    confidence: 1.0,
                    score_impact: rule.score_impact,
                    span: None,
                    excerpt: text.trim().to_string(),
                    trigger_id: MINIMAL_RESPONSE_TRIGGER.to_string(),
                });
            }
        }

        MessageDetection {
            matches,
            emotional: self.catalog.is_emotionally_salient(text),
            responds_to_emotional,
            dismissive,
        }
    }

    /// Detect every message of `messages`, each against its predecessor.
    /// Output is index-aligned with the input.
    pub fn detect_all(&self, messages: &[Message], parallel: bool) -> Vec<MessageDetection> {
        let run = |i: usize| {
            let previous = i.checked_sub(1).map(|j| &messages[j]);
            self.detect(&messages[i], previous)
        };
        if parallel {
            (0..messages.len()).into_par_iter().map(run).collect()
        } else {
            (0..messages.len()).map(run).collect()
        }
    }

    fn is_minimal_reply(&self, text: &str) -> bool {
        self.catalog.is_dismissive_reply(text)
            || text.chars().filter(|c| !c.is_whitespace()).count() < MINIMAL_REPLY_CHARS
    }
}

/// No letters or digits, at least one non-ASCII symbol.
pub fn is_emoji_only(text: &str) -> bool {
    let mut saw_symbol = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            return false;
        }
        if !c.is_ascii() && !c.is_whitespace() {
            saw_symbol = true;
        }
    }
    saw_symbol
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rapport_core::types::{Polarity, Sender};

    use super::*;
    use crate::catalog::CatalogLoader;

    fn msg(id: &str, sender: Sender, minute: i64, text: &str) -> Message {
        let base = Utc.with_ymd_and_hms(2024, 5, 10, 20, 0, 0).unwrap();
        Message::new(id, base + Duration::minutes(minute), sender, text)
    }

    fn detect(text: &str) -> MessageDetection {
        let catalog = CatalogLoader::load_default().unwrap();
        PatternDetector::new(&catalog).detect(&msg("1", Sender::A, 0, text), None)
    }

    #[test]
    fn criticism_scores_minus_five() {
        let d = detect("Você nunca me ajuda!");
        assert_eq!(d.matches.len(), 1);
        let m = &d.matches[0];
        assert_eq!(m.category, PatternCategory::Criticism);
        assert_eq!(m.score_impact, -5);
        assert_eq!(m.polarity, Polarity::Negative);
        assert_eq!(m.excerpt, "Você nunca");
    }

    #[test]
    fn repair_scores_plus_five_once() {
        let d = detect("Desculpa, eu errei");
        assert_eq!(d.matches.len(), 1);
        assert_eq!(d.matches[0].category, PatternCategory::Repair);
        assert_eq!(d.matches[0].score_impact, 5);
        assert_eq!(d.matches[0].trigger_id, "repair.1");
    }

    #[test]
    fn shared_phrase_goes_to_highest_priority_category() {
        let d = detect("tanto faz");
        assert_eq!(d.matches.len(), 1);
        assert_eq!(d.matches[0].category, PatternCategory::Contempt);

        let d = detect("você tem razão");
        assert_eq!(d.matches.len(), 1);
        assert_eq!(d.matches[0].category, PatternCategory::Repair);
    }

    #[test]
    fn consumed_span_blocks_lower_categories() {
        // "juntos nisso" is assurance; "juntos" alone would be future planning.
        let d = detect("estamos juntos nisso");
        let categories: Vec<_> = d.matches.iter().map(|m| m.category).collect();
        assert_eq!(categories, vec![PatternCategory::Assurance]);
    }

    #[test]
    fn distinct_phrases_match_distinct_categories() {
        let d = detect("obrigado por tudo, te amo");
        let categories: Vec<_> = d.matches.iter().map(|m| m.category).collect();
        assert_eq!(
            categories,
            vec![PatternCategory::Gratitude, PatternCategory::Affection]
        );
    }

    #[test]
    fn emoji_only_message_checks_emoji_table() {
        let d = detect("❤️❤️");
        assert_eq!(d.matches.len(), 1);
        assert_eq!(d.matches[0].category, PatternCategory::Affection);
        assert_eq!(d.matches[0].excerpt, "❤️");

        let d = detect("🙄");
        assert_eq!(d.matches[0].category, PatternCategory::Contempt);
    }

    #[test]
    fn minimal_reply_to_emotional_bid_is_stonewalling() {
        let catalog = CatalogLoader::load_default().unwrap();
        let detector = PatternDetector::new(&catalog);
        let bid = msg("1", Sender::A, 0, "estou muito triste hoje");
        let reply = msg("2", Sender::B, 1, "ok");
        let d = detector.detect(&reply, Some(&bid));
        assert!(d.responds_to_emotional);
        assert!(d.dismissive);
        assert_eq!(d.matches.len(), 1);
        assert_eq!(d.matches[0].category, PatternCategory::Stonewalling);
        assert_eq!(d.matches[0].trigger_id, "stonewalling.9");

        let reply = msg("3", Sender::B, 1, "hm");
        let d = detector.detect(&reply, Some(&bid));
        assert_eq!(d.matches[0].trigger_id, MINIMAL_RESPONSE_TRIGGER);
        assert!(d.matches[0].span.is_none());
    }

    #[test]
    fn minimal_reply_without_bid_is_neutral() {
        let catalog = CatalogLoader::load_default().unwrap();
        let detector = PatternDetector::new(&catalog);
        let prev = msg("1", Sender::A, 0, "vou passar no mercado");
        let d = detector.detect(&msg("2", Sender::B, 1, "ok"), Some(&prev));
        assert!(!d.dismissive);
        assert!(d.matches.is_empty());
    }

    #[test]
    fn own_previous_message_is_not_a_bid() {
        let catalog = CatalogLoader::load_default().unwrap();
        let detector = PatternDetector::new(&catalog);
        let prev = msg("1", Sender::A, 0, "estou triste");
        let d = detector.detect(&msg("2", Sender::A, 1, "ok"), Some(&prev));
        assert!(!d.responds_to_emotional);
        assert!(d.matches.is_empty());
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let catalog = CatalogLoader::load_default().unwrap();
        let detector = PatternDetector::new(&catalog);
        let messages: Vec<Message> = (0..40)
            .map(|i| {
                let sender = if i % 2 == 0 { Sender::A } else { Sender::B };
                let text = match i % 4 {
                    0 => "estou preocupada com o trabalho",
                    1 => "ok",
                    2 => "você sempre esquece, mas te amo",
                    _ => "obrigado por ouvir",
                };
                msg(&i.to_string(), sender, i, text)
            })
            .collect();
        assert_eq!(
            detector.detect_all(&messages, true),
            detector.detect_all(&messages, false)
        );
    }

    #[test]
    fn emoji_only_detection() {
        assert!(is_emoji_only("😂😂"));
        assert!(is_emoji_only(" ❤️ "));
        assert!(!is_emoji_only("ok 👍"));
        assert!(!is_emoji_only("..."));
    }
}
