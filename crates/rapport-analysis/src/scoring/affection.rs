//! Affection & Commitment: per-week frequency of affection, assurance, and
//! gratitude against configurable baselines, plus the positivity ratio.

use rapport_core::types::{Component, Dimension, DimensionScore, PatternCategory};

use super::positivity::{positivity_ratio, positivity_score};
use super::{assemble, Part, ScoringInput};

/// Weeks covered by the window's messages, never less than one.
pub fn weeks_spanned(input: &ScoringInput<'_>) -> f64 {
    let (Some(first), Some(last)) = (input.messages.first(), input.messages.last()) else {
        return 1.0;
    };
    let days = (last.timestamp - first.timestamp).num_seconds() as f64 / 86_400.0;
    (days / 7.0).max(1.0)
}

/// `min(100, perWeek / baseline × 100)`.
pub fn frequency_score(per_week: f64, baseline: f64) -> f64 {
    (per_week / baseline * 100.0).min(100.0)
}

pub fn score(input: &ScoringInput<'_>) -> DimensionScore {
    let scoring = &input.config.scoring;
    let weeks = weeks_spanned(input);

    let frequency = |component: Component, category: PatternCategory, baseline: f64| {
        let count = input.count(category);
        let per_week = count as f64 / weeks;
        Part::new(component, frequency_score(per_week, baseline))
            .metric("count", count)
            .metric("perWeek", per_week)
            .metric("baselinePerWeek", baseline)
    };

    let positive = input.positive_count();
    let negative = input.negative_count();
    let ratio = positivity_ratio(positive, negative);

    let mut insights = Vec::new();
    if negative > 0 {
        insights.push(format!(
            "Positive-to-negative ratio {ratio:.1}:1 (target 5:1)"
        ));
    } else if positive > 0 {
        insights.push(format!("{positive} positive patterns and no negative ones"));
    }
    if input.count(PatternCategory::Affection) == 0 {
        insights.push("No expressed affection in this window".to_string());
    }

    assemble(
        Dimension::AffectionCommitment,
        vec![
            frequency(
                Component::ExpressedAffection,
                PatternCategory::Affection,
                scoring.effective_affection_baseline_per_week(),
            ),
            frequency(
                Component::CommitmentSignals,
                PatternCategory::Assurance,
                scoring.effective_commitment_baseline_per_week(),
            ),
            frequency(
                Component::Appreciation,
                PatternCategory::Gratitude,
                scoring.effective_appreciation_baseline_per_week(),
            ),
            Part::new(Component::Positivity, positivity_score(ratio))
                .metric("positive", positive)
                .metric("negative", negative)
                .metric("ratio", ratio),
        ],
        insights,
        input,
    )
}
