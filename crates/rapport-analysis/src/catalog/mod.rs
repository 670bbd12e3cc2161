//! The compiled pattern catalog: per-category triggers in resolution order,
//! plus the auxiliary lexicons used by the filter, the detector's context
//! rules, and the balance calculator.
//!
//! Loaded once, validated at load time, read-only afterwards.

pub mod loader;

use aho_corasick::AhoCorasick;
use regex::Regex;

use rapport_core::types::{PatternCategory, Span};

pub use loader::{CatalogFile, CatalogLoader, DEFAULT_CATALOG};

/// When a trigger is allowed to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerContext {
    Any,
    /// Only right after an emotionally salient message from the partner.
    AfterEmotional,
}

#[derive(Debug, Clone)]
pub enum TriggerMatcher {
    Regex(Regex),
    /// Literal emoji sequence, matched verbatim.
    Emoji(String),
}

/// One compiled trigger. `id` is `<category>.<n>` in declaration order.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub id: String,
    pub source: String,
    pub context: TriggerContext,
    pub matcher: TriggerMatcher,
}

impl Trigger {
    pub fn is_emoji(&self) -> bool {
        matches!(self.matcher, TriggerMatcher::Emoji(_))
    }

    /// Every non-empty occurrence in `text`, left to right.
    pub fn spans(&self, text: &str) -> Vec<Span> {
        match &self.matcher {
            TriggerMatcher::Regex(regex) => regex
                .find_iter(text)
                .filter(|m| !m.as_str().is_empty())
                .map(|m| Span::new(m.start(), m.end()))
                .collect(),
            TriggerMatcher::Emoji(literal) => text
                .match_indices(literal.as_str())
                .map(|(start, s)| Span::new(start, start + s.len()))
                .collect(),
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        match &self.matcher {
            TriggerMatcher::Regex(regex) => regex.is_match(text),
            TriggerMatcher::Emoji(literal) => text.contains(literal.as_str()),
        }
    }
}

/// All triggers of one category.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub category: PatternCategory,
    pub score_impact: i32,
    pub antidote: Option<String>,
    pub triggers: Vec<Trigger>,
}

/// Heuristics that mark a message as not a direct exchange between the couple.
#[derive(Debug, Clone)]
pub struct FilterRules {
    pub forwarded: Vec<Regex>,
    pub embedded_timestamp: Vec<Regex>,
    pub third_party_attribution: Vec<Regex>,
    pub third_party_subject: Vec<Regex>,
}

/// Literal lexicons for task coordination. Patterns are lowercase; callers
/// search lowercased text.
#[derive(Debug, Clone)]
pub struct CoordinationRules {
    pub task_verbs: AhoCorasick,
    pub completion_markers: AhoCorasick,
}

#[derive(Debug, Clone)]
pub struct PatternCatalog {
    pub(crate) version: String,
    pub(crate) rules: Vec<CategoryRule>,
    pub(crate) filter: FilterRules,
    pub(crate) salience: Vec<Regex>,
    pub(crate) dismissive: Vec<Regex>,
    pub(crate) coordination: CoordinationRules,
}

impl PatternCatalog {
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Category rules in resolution order (contempt first).
    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn rule(&self, category: PatternCategory) -> Option<&CategoryRule> {
        self.rules.iter().find(|r| r.category == category)
    }

    pub fn antidote(&self, category: PatternCategory) -> Option<&str> {
        self.rule(category).and_then(|r| r.antidote.as_deref())
    }

    pub fn filter_rules(&self) -> &FilterRules {
        &self.filter
    }

    pub fn coordination(&self) -> &CoordinationRules {
        &self.coordination
    }

    pub fn trigger_count(&self) -> usize {
        self.rules.iter().map(|r| r.triggers.len()).sum()
    }

    /// Whether `text` carries an emotional bid: a salience marker or any
    /// unconditional disclosure trigger.
    pub fn is_emotionally_salient(&self, text: &str) -> bool {
        if self.salience.iter().any(|r| r.is_match(text)) {
            return true;
        }
        self.rule(PatternCategory::Disclosure).is_some_and(|rule| {
            rule.triggers
                .iter()
                .filter(|t| t.context == TriggerContext::Any)
                .any(|t| t.is_match(text))
        })
    }

    /// Whether the whole (trimmed) reply is a dismissive acknowledgement.
    pub fn is_dismissive_reply(&self, text: &str) -> bool {
        let trimmed = text.trim();
        self.dismissive.iter().any(|r| r.is_match(trimmed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PatternCatalog {
        CatalogLoader::load_default().unwrap()
    }

    #[test]
    fn salience_covers_markers_and_disclosure() {
        let c = catalog();
        assert!(c.is_emotionally_salient("hoje foi um dia difícil"));
        assert!(c.is_emotionally_salient("eu sinto que ninguém me escuta"));
        assert!(c.is_emotionally_salient("😢"));
        assert!(!c.is_emotionally_salient("vou passar no mercado"));
    }

    #[test]
    fn dismissive_replies_are_whole_message_matches() {
        let c = catalog();
        assert!(c.is_dismissive_reply("  ok "));
        assert!(c.is_dismissive_reply("Hmmm"));
        assert!(!c.is_dismissive_reply("ok, me conta mais"));
    }

    #[test]
    fn emoji_trigger_spans_are_byte_ranges() {
        let c = catalog();
        let affection = c.rule(PatternCategory::Affection).unwrap();
        let heart = affection
            .triggers
            .iter()
            .find(|t| t.source == "💕")
            .unwrap();
        let spans = heart.spans("oi 💕");
        assert_eq!(spans, vec![Span::new(3, 3 + "💕".len())]);
    }

    #[test]
    fn only_negative_categories_carry_antidotes() {
        let c = catalog();
        for rule in c.rules() {
            assert_eq!(rule.antidote.is_some(), rule.category.is_horseman(), "{}", rule.category);
        }
    }
}
