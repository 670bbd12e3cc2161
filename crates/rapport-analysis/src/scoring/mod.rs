//! Dimension scorers.
//!
//! Each scorer is a pure function of one window's messages, detections,
//! accepted matches, and balance metrics. Component scores are clamped to
//! `[0, 100]`; a dimension score is the weighted sum of its components.
//! Every category is counted by exactly one component (its catalog owner).

pub mod affection;
pub mod communication;
pub mod emotional;
pub mod partnership;
pub mod positivity;

use std::collections::BTreeMap;

use serde_json::Value;

use rapport_core::config::RapportConfig;
use rapport_core::types::{
    BalanceMetrics, Component, ComponentScore, Dimension, DimensionScore, Message,
    PatternCategory, PatternMatch,
};

use crate::detector::MessageDetection;
use crate::validation::ValidationStatus;

/// Score every dimension is given when its window holds no text messages.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Everything a dimension scorer may look at for one window.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput<'a> {
    /// Filtered messages of the window, chronological.
    pub messages: &'a [Message],
    /// Index-aligned with `messages`.
    pub detections: &'a [MessageDetection],
    /// Matches that survived oracle validation.
    pub matches: &'a [PatternMatch],
    pub balance: &'a BalanceMetrics,
    pub validation: &'a ValidationStatus,
    pub config: &'a RapportConfig,
}

impl<'a> ScoringInput<'a> {
    pub fn text_message_count(&self) -> usize {
        self.messages.iter().filter(|m| m.has_text()).count()
    }

    pub fn count(&self, category: PatternCategory) -> usize {
        self.matches.iter().filter(|m| m.category == category).count()
    }

    pub fn positive_count(&self) -> usize {
        self.matches.iter().filter(|m| m.is_positive()).count()
    }

    pub fn negative_count(&self) -> usize {
        self.matches.iter().filter(|m| m.is_negative()).count()
    }
}

/// Score all four dimensions in `Dimension::ALL` order.
pub fn score_dimensions(input: &ScoringInput<'_>) -> Vec<DimensionScore> {
    if input.text_message_count() == 0 {
        return Dimension::ALL
            .iter()
            .map(|&d| neutral_dimension(d, input.config))
            .collect();
    }
    vec![
        emotional::score(input),
        affection::score(input),
        communication::score(input),
        partnership::score(input),
    ]
}

/// `Σ dimension score × dimension weight`, clamped to `[0, 100]`.
pub fn weighted_overall(dimensions: &[DimensionScore]) -> f64 {
    dimensions
        .iter()
        .map(|d| d.score * d.weight)
        .sum::<f64>()
        .clamp(0.0, 100.0)
}

/// Round to one decimal place for output.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Ratio `part / whole`, 0 when `whole` is 0.
pub(crate) fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// One component score before assembly.
pub(crate) struct Part {
    pub component: Component,
    pub score: f64,
    pub raw: Vec<(&'static str, Value)>,
}

impl Part {
    pub fn new(component: Component, score: f64) -> Self {
        Self {
            component,
            score,
            raw: Vec::new(),
        }
    }

    pub fn metric(mut self, key: &'static str, value: impl Into<Value>) -> Self {
        self.raw.push((key, value.into()));
        self
    }
}

pub(crate) fn assemble(
    dimension: Dimension,
    parts: Vec<Part>,
    insights: Vec<String>,
    input: &ScoringInput<'_>,
) -> DimensionScore {
    let mut components = BTreeMap::new();
    let mut total = 0.0;
    for part in parts {
        let score = if part.score.is_nan() {
            NEUTRAL_SCORE
        } else {
            part.score.clamp(0.0, 100.0)
        };
        let weight = part.component.weight();
        total += score * weight;
        components.insert(
            part.component.name().to_string(),
            ComponentScore {
                score: round1(score),
                weight,
                llm_validated: input.validation.is_validated(part.component),
                raw_metrics: part
                    .raw
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            },
        );
    }
    DimensionScore {
        dimension_id: dimension,
        score: round1(total.clamp(0.0, 100.0)),
        weight: input.config.scoring.dimension_weights.effective(dimension),
        components,
        insights,
    }
}

fn neutral_dimension(dimension: Dimension, config: &RapportConfig) -> DimensionScore {
    let components = dimension
        .components()
        .iter()
        .map(|c| {
            let mut raw_metrics = BTreeMap::new();
            raw_metrics.insert("neutral".to_string(), Value::Bool(true));
            (
                c.name().to_string(),
                ComponentScore {
                    score: NEUTRAL_SCORE,
                    weight: c.weight(),
                    llm_validated: false,
                    raw_metrics,
                },
            )
        })
        .collect();
    DimensionScore {
        dimension_id: dimension,
        score: NEUTRAL_SCORE,
        weight: config.scoring.dimension_weights.effective(dimension),
        components,
        insights: vec!["No text messages in this window; neutral baseline".to_string()],
    }
}


#[cfg(test)]
mod tests {
    use rapport_core::types::Sender;

    use super::test_support::Fixture;
    use super::*;

    #[test]
    fn empty_window_is_neutral_everywhere() {
        let fixture = Fixture::from_messages(Vec::new());
        let dims = score_dimensions(&fixture.input());
        assert_eq!(dims.len(), 4);
        for d in &dims {
            assert_eq!(d.score, NEUTRAL_SCORE);
            assert!(d.components.values().all(|c| c.score == NEUTRAL_SCORE));
        }
        assert!((weighted_overall(&dims) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn dimension_score_is_weighted_component_sum() {
        let fixture = Fixture::conversation(
            &[
                (Sender::A, "como foi seu dia? me conta tudo"),
                (Sender::B, "foi cansativo mas estou feliz que acabou, obrigado por perguntar"),
                (Sender::A, "te amo"),
            ],
            5,
        );
        for d in score_dimensions(&fixture.input()) {
            let sum: f64 = d.components.values().map(|c| c.score * c.weight).sum();
            assert!((d.score - sum).abs() <= 0.1 + 1e-9, "{}: {} vs {}", d.dimension_id, d.score, sum);
            assert!((0.0..=100.0).contains(&d.score));
        }
    }

    #[test]
    fn round1_rounds_half_away_from_zero() {
        assert_eq!(round1(72.25), 72.3);
        assert_eq!(round1(80.0), 80.0);
    }
}
