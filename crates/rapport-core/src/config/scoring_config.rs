//! Scoring configuration.

use serde::{Deserialize, Serialize};

use crate::types::Dimension;

/// Per-dimension weights in the overall score. Must sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DimensionWeights {
    pub emotional_connection: Option<f64>,
    pub affection_commitment: Option<f64>,
    pub communication_health: Option<f64>,
    pub partnership_equity: Option<f64>,
}

impl DimensionWeights {
    fn slot(&self, dimension: Dimension) -> Option<f64> {
        match dimension {
            Dimension::EmotionalConnection => self.emotional_connection,
            Dimension::AffectionCommitment => self.affection_commitment,
            Dimension::CommunicationHealth => self.communication_health,
            Dimension::PartnershipEquity => self.partnership_equity,
        }
    }

    /// Returns the effective weight for `dimension`, defaulting to 0.30/0.25/0.25/0.20.
    pub fn effective(&self, dimension: Dimension) -> f64 {
        self.slot(dimension)
            .unwrap_or_else(|| dimension.default_weight())
    }

    pub fn effective_sum(&self) -> f64 {
        Dimension::ALL.iter().map(|d| self.effective(*d)).sum()
    }

    pub(crate) fn merge_from(&mut self, other: &DimensionWeights) {
        if other.emotional_connection.is_some() {
            self.emotional_connection = other.emotional_connection;
        }
        if other.affection_commitment.is_some() {
            self.affection_commitment = other.affection_commitment;
        }
        if other.communication_health.is_some() {
            self.communication_health = other.communication_health;
        }
        if other.partnership_equity.is_some() {
            self.partnership_equity = other.partnership_equity;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    /// Length of the trailing scoring window in days. Default: 30.
    pub scoring_window_days: Option<u32>,
    /// Expected affection expressions per week. Default: 7.0.
    pub affection_baseline_per_week: Option<f64>,
    /// Expected commitment assurances per week. Default: 3.0.
    pub commitment_baseline_per_week: Option<f64>,
    /// Expected gratitude expressions per week. Default: 3.0.
    pub appreciation_baseline_per_week: Option<f64>,
    /// Below this many messages in the window confidence is forced low. Default: 10.
    pub min_messages_for_pattern: Option<usize>,
    /// Confidence ceiling. Default: 0.95.
    pub max_confidence: Option<f64>,
    /// Points removed per criticism match. Default: 15.
    pub criticism_penalty: Option<f64>,
    /// Points removed per defensiveness match. Default: 10.
    pub defensiveness_penalty: Option<f64>,
    /// Weeks covered by the weekly pulse. Default: 12.
    pub pulse_weeks: Option<u32>,
    /// Minimum messages for a week to get a pulse score. Default: 10.
    pub pulse_min_messages: Option<usize>,
    pub dimension_weights: DimensionWeights,
}

impl ScoringConfig {
    pub fn effective_scoring_window_days(&self) -> u32 {
        self.scoring_window_days.unwrap_or(30)
    }

    pub fn effective_affection_baseline_per_week(&self) -> f64 {
        self.affection_baseline_per_week.unwrap_or(7.0)
    }

    pub fn effective_commitment_baseline_per_week(&self) -> f64 {
        self.commitment_baseline_per_week.unwrap_or(3.0)
    }

    pub fn effective_appreciation_baseline_per_week(&self) -> f64 {
        self.appreciation_baseline_per_week.unwrap_or(3.0)
    }

    pub fn effective_min_messages_for_pattern(&self) -> usize {
        self.min_messages_for_pattern.unwrap_or(10)
    }

    pub fn effective_max_confidence(&self) -> f64 {
        self.max_confidence.unwrap_or(0.95)
    }

    pub fn effective_criticism_penalty(&self) -> f64 {
        self.criticism_penalty.unwrap_or(15.0)
    }

    pub fn effective_defensiveness_penalty(&self) -> f64 {
        self.defensiveness_penalty.unwrap_or(10.0)
    }

    pub fn effective_pulse_weeks(&self) -> u32 {
        self.pulse_weeks.unwrap_or(12)
    }

    pub fn effective_pulse_min_messages(&self) -> usize {
        self.pulse_min_messages.unwrap_or(10)
    }
}
