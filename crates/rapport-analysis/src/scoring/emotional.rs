//! Emotional Connection: responsiveness, vulnerability, attunement.

use rapport_core::types::{Component, Dimension, DimensionScore, PatternCategory};

use super::{assemble, rate, Part, ScoringInput, NEUTRAL_SCORE};

/// Replies to an emotional bid slower than this are penalized.
pub const SLOW_BID_REPLY_MINUTES: i64 = 30;
const SLOW_BID_PENALTY: f64 = 30.0;
const MINIMAL_DEPTH: f64 = 20.0;

/// Depth of a reply by word count: deep 100, moderate 70, short 40, minimal 20.
pub fn depth_score(words: usize) -> f64 {
    match words {
        15.. => 100.0,
        8..=14 => 70.0,
        3..=7 => 40.0,
        _ => MINIMAL_DEPTH,
    }
}

pub fn score(input: &ScoringInput<'_>) -> DimensionScore {
    let messages = input.messages;
    let text_messages = input.text_message_count();

    let mut responses = 0usize;
    let mut depth_total = 0.0;
    let mut dismissive = 0usize;
    let mut slow = 0usize;
    let mut bids = 0usize;
    let mut answered_bids = 0usize;

    for i in 1..messages.len() {
        let (prev, reply) = (&messages[i - 1], &messages[i]);
        if !(reply.has_text() && prev.has_text() && reply.sender != prev.sender) {
            continue;
        }
        responses += 1;
        let detection = &input.detections[i];
        let to_bid = input.detections[i - 1].emotional;

        let mut depth = depth_score(reply.word_count());
        if detection.dismissive {
            depth = MINIMAL_DEPTH;
            dismissive += 1;
        } else if to_bid
            && (reply.timestamp - prev.timestamp).num_minutes() > SLOW_BID_REPLY_MINUTES
        {
            depth = (depth - SLOW_BID_PENALTY).max(MINIMAL_DEPTH);
            slow += 1;
        }
        if to_bid {
            bids += 1;
            if !detection.dismissive {
                answered_bids += 1;
            }
        }
        depth_total += depth;
    }

    let responsiveness = if responses == 0 {
        NEUTRAL_SCORE
    } else {
        depth_total / responses as f64
    };

    let disclosures = input.count(PatternCategory::Disclosure);
    let disclosure_rate = rate(disclosures, text_messages);
    let vulnerability = (disclosure_rate / 0.05 * 70.0 + 30.0).min(100.0);

    let listening_count = input.count(PatternCategory::ActiveListening);
    let listening_rate = rate(listening_count, text_messages);
    let listening = (listening_rate / 0.03 * 70.0 + 30.0).min(100.0);
    let attunement = if bids > 0 {
        0.5 * listening + 0.5 * rate(answered_bids, bids) * 100.0
    } else {
        listening
    };

    let mut insights = Vec::new();
    if dismissive > 0 {
        insights.push(format!(
            "{dismissive} dismissive replies to emotional messages"
        ));
    }
    if slow > 0 {
        insights.push(format!(
            "{slow} replies to emotional messages came after more than {SLOW_BID_REPLY_MINUTES} minutes"
        ));
    }
    if bids > 0 {
        insights.push(format!("{answered_bids} of {bids} emotional bids were answered"));
    }
    if disclosures == 0 {
        insights.push("No emotional disclosure in this window".to_string());
    }

    assemble(
        Dimension::EmotionalConnection,
        vec![
            Part::new(Component::Responsiveness, responsiveness)
                .metric("responses", responses)
                .metric("dismissiveReplies", dismissive)
                .metric("slowBidReplies", slow),
            Part::new(Component::Vulnerability, vulnerability)
                .metric("disclosures", disclosures)
                .metric("disclosureRate", disclosure_rate),
            Part::new(Component::Attunement, attunement)
                .metric("activeListening", listening_count)
                .metric("emotionalBids", bids)
                .metric("answeredBids", answered_bids),
        ],
        insights,
        input,
    )
}
