//! Pattern categories and matches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::dimension::{Component, Dimension};
use super::message::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    Rule,
    Llm,
}

/// The twelve linguistic pattern categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternCategory {
    Criticism,
    Contempt,
    Defensiveness,
    Stonewalling,
    Repair,
    Affection,
    Gratitude,
    Support,
    ActiveListening,
    FuturePlanning,
    Disclosure,
    Assurance,
}

impl PatternCategory {
    pub const ALL: [PatternCategory; 12] = [
        Self::Criticism,
        Self::Contempt,
        Self::Defensiveness,
        Self::Stonewalling,
        Self::Repair,
        Self::Affection,
        Self::Gratitude,
        Self::Support,
        Self::ActiveListening,
        Self::FuturePlanning,
        Self::Disclosure,
        Self::Assurance,
    ];

    /// Resolution order used by the detector. A span consumed by an earlier
    /// category is never considered by a later one.
    pub const PRIORITY: [PatternCategory; 12] = [
        Self::Contempt,
        Self::Criticism,
        Self::Defensiveness,
        Self::Stonewalling,
        Self::Repair,
        Self::Assurance,
        Self::Support,
        Self::Gratitude,
        Self::Affection,
        Self::ActiveListening,
        Self::FuturePlanning,
        Self::Disclosure,
    ];

    pub const HORSEMEN: [PatternCategory; 4] = [
        Self::Criticism,
        Self::Contempt,
        Self::Defensiveness,
        Self::Stonewalling,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Criticism => "criticism",
            Self::Contempt => "contempt",
            Self::Defensiveness => "defensiveness",
            Self::Stonewalling => "stonewalling",
            Self::Repair => "repair",
            Self::Affection => "affection",
            Self::Gratitude => "gratitude",
            Self::Support => "support",
            Self::ActiveListening => "activeListening",
            Self::FuturePlanning => "futurePlanning",
            Self::Disclosure => "disclosure",
            Self::Assurance => "assurance",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == s)
    }

    pub fn polarity(&self) -> Polarity {
        if self.is_horseman() {
            Polarity::Negative
        } else {
            Polarity::Positive
        }
    }

    pub fn is_horseman(&self) -> bool {
        Self::HORSEMEN.contains(self)
    }

    /// Position in the resolution order (0 = highest priority).
    pub fn priority_rank(&self) -> usize {
        Self::PRIORITY
            .iter()
            .position(|c| c == self)
            .unwrap_or(Self::PRIORITY.len())
    }

    /// The single component that owns this category's counts.
    pub fn owner(&self) -> Component {
        match self {
            Self::Contempt | Self::Stonewalling => Component::EmotionalSafety,
            Self::Criticism | Self::Defensiveness => Component::ConstructiveDialogue,
            Self::Repair => Component::ConflictRepair,
            Self::Support => Component::SupportiveResponses,
            Self::Assurance => Component::CommitmentSignals,
            Self::Affection => Component::ExpressedAffection,
            Self::Gratitude => Component::Appreciation,
            Self::Disclosure => Component::Vulnerability,
            Self::ActiveListening => Component::Attunement,
            Self::FuturePlanning => Component::SharedDecisions,
        }
    }

    pub fn owner_dimension(&self) -> Dimension {
        self.owner().dimension()
    }
}

impl std::fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Byte range of the matched trigger within the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A detected pattern occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternMatch {
    pub message_id: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub category: PatternCategory,
    pub polarity: Polarity,
    pub source: MatchSource,
    pub confidence: f64,
    pub score_impact: i32,
    /// `None` for matches that are not tied to a text span (minimal replies).
    pub span: Option<Span>,
    pub excerpt: String,
    pub trigger_id: String,
}

impl PatternMatch {
    pub fn is_negative(&self) -> bool {
        self.polarity == Polarity::Negative
    }

    pub fn is_positive(&self) -> bool {
        self.polarity == Polarity::Positive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_round_trips_through_its_name() {
        for c in PatternCategory::ALL {
            assert_eq!(PatternCategory::parse_str(c.name()), Some(c));
        }
        assert_eq!(PatternCategory::parse_str("understanding"), None);
    }

    #[test]
    fn priority_lists_every_category_once() {
        let mut seen = PatternCategory::PRIORITY.to_vec();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), PatternCategory::ALL.len());
        assert_eq!(PatternCategory::PRIORITY[0], PatternCategory::Contempt);
    }

    #[test]
    fn repair_is_owned_by_communication_health_only() {
        assert_eq!(
            PatternCategory::Repair.owner_dimension(),
            Dimension::CommunicationHealth
        );
        assert_eq!(PatternCategory::Repair.owner(), Component::ConflictRepair);
    }

    #[test]
    fn span_overlap_is_strict() {
        let a = Span::new(0, 5);
        assert!(a.overlaps(&Span::new(4, 8)));
        assert!(!a.overlaps(&Span::new(5, 8)));
    }
}
