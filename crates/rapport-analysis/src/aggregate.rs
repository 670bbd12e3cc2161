//! Overall aggregation: weighted score, label, confidence, trend, insights,
//! and alerts. Deterministic: the same inputs always serialize identically.

use std::collections::BTreeMap;

use rapport_core::config::ScoringConfig;
use rapport_core::types::{
    Alert, AlertSeverity, DimensionScore, HealthLabel, HealthScoreResult, Insight, Insights,
    PatternCategory, PatternMatch, ScoringWindow,
};

use crate::catalog::PatternCatalog;
use crate::scoring::positivity::positivity_ratio;
use crate::scoring::{round1, weighted_overall};

pub const STRENGTH_THRESHOLD: f64 = 70.0;
pub const OPPORTUNITY_THRESHOLD: f64 = 55.0;
pub const INSUFFICIENT_TREND: &str = "insufficient data for trend";

const CONTEMPT_CRITICAL_AT: usize = 2;
const HORSEMAN_ALERT_AT: usize = 3;
const HORSEMAN_HIGH_AT: usize = 5;
const LOW_RATIO: f64 = 3.0;
const RATIO_ANTIDOTE: &str =
    "Raise the positive-to-negative ratio: aim for five positive interactions for every negative one.";

/// Confidence from message volume. Monotonic in `messages`, capped at
/// `max_confidence`. Returns `(confidence, low_confidence)`.
pub fn confidence(messages: usize, config: &ScoringConfig) -> (f64, bool) {
    let min = config.effective_min_messages_for_pattern();
    let cap = config.effective_max_confidence();
    if messages == 0 {
        return (0.0, true);
    }
    if messages < min {
        return ((0.4 * messages as f64 / min as f64).min(cap), true);
    }
    let tier: f64 = match messages {
        1000.. => 0.95,
        500..=999 => 0.85,
        200..=499 => 0.75,
        50..=199 => 0.60,
        _ => 0.40,
    };
    (tier.min(cap), false)
}

/// `("+N vs previous window", Some(delta))`, or the insufficient-data marker
/// when the previous window could not be scored.
pub fn trend(current: f64, previous: Option<f64>) -> (String, Option<f64>) {
    match previous {
        None => (INSUFFICIENT_TREND.to_string(), None),
        Some(previous) => {
            let delta = round1(current - previous);
            (
                format!("{:+} vs previous window", delta.round() as i64),
                Some(delta),
            )
        }
    }
}

/// Strengths (dimension ≥ 70) and opportunities (dimension < 55).
pub fn insights(dimensions: &[DimensionScore]) -> Insights {
    let mut out = Insights::default();
    for d in dimensions {
        let name = d.dimension_id.display_name();
        let by_score = |best: bool| {
            d.components
                .iter()
                .filter(|(_, c)| c.weight > 0.0)
                .max_by(|(_, x), (_, y)| {
                    let ord = x.score.total_cmp(&y.score);
                    if best {
                        ord
                    } else {
                        ord.reverse()
                    }
                })
                .map(|(name, c)| format!("{name} at {:.1}", c.score))
                .unwrap_or_default()
        };
        if d.score >= STRENGTH_THRESHOLD {
            out.strengths.push(Insight {
                dimension: d.dimension_id,
                finding: format!("{name} is a strength ({:.1})", d.score),
                detail: format!("strongest component: {}", by_score(true)),
            });
        } else if d.score < OPPORTUNITY_THRESHOLD {
            out.opportunities.push(Insight {
                dimension: d.dimension_id,
                finding: format!("{name} needs attention ({:.1})", d.score),
                detail: format!("weakest component: {}", by_score(false)),
            });
        }
    }
    out
}

/// Alerts for recurring negative patterns and a low positivity ratio.
pub fn alerts(matches: &[PatternMatch], catalog: &PatternCatalog, window_days: u32) -> Vec<Alert> {
    let mut counts: BTreeMap<usize, (PatternCategory, usize)> = BTreeMap::new();
    for m in matches.iter().filter(|m| m.category.is_horseman()) {
        counts
            .entry(m.category.priority_rank())
            .or_insert((m.category, 0))
            .1 += 1;
    }

    let mut alerts = Vec::new();
    for &(category, count) in counts.values() {
        let severity = match category {
            PatternCategory::Contempt if count >= CONTEMPT_CRITICAL_AT => AlertSeverity::Critical,
            PatternCategory::Contempt => continue,
            _ if count >= HORSEMAN_HIGH_AT => AlertSeverity::High,
            _ if count >= HORSEMAN_ALERT_AT => AlertSeverity::Medium,
            _ => continue,
        };
        alerts.push(Alert {
            pattern: category.name().to_string(),
            severity,
            frequency: count,
            context: format!("{category} detected {count} times in the last {window_days} days"),
            antidote: catalog.antidote(category).unwrap_or_default().to_string(),
        });
    }

    let positive = matches.iter().filter(|m| m.is_positive()).count();
    let negative = matches.iter().filter(|m| m.is_negative()).count();
    let ratio = positivity_ratio(positive, negative);
    if negative > 0 && ratio < LOW_RATIO {
        alerts.push(Alert {
            pattern: "positivityRatio".to_string(),
            severity: AlertSeverity::High,
            frequency: negative,
            context: format!("positive-to-negative ratio {ratio:.1}:1, below {LOW_RATIO:.0}:1"),
            antidote: RATIO_ANTIDOTE.to_string(),
        });
    }
    alerts
}

/// Inputs to the final result.
pub struct ResultParts<'a> {
    pub dimensions: Vec<DimensionScore>,
    pub matches: &'a [PatternMatch],
    pub catalog: &'a PatternCatalog,
    pub config: &'a ScoringConfig,
    pub window: ScoringWindow,
    pub message_count: usize,
    pub previous_overall: Option<f64>,
}

/// Assemble the `HealthScoreResult`.
pub fn build_result(parts: ResultParts<'_>) -> HealthScoreResult {
    let overall = round1(weighted_overall(&parts.dimensions));
    let label = HealthLabel::from_score(overall);
    let (confidence, low_confidence) = confidence(parts.message_count, parts.config);
    let (trend, trend_delta) = trend(overall, parts.previous_overall);
    let insights = insights(&parts.dimensions);
    let alerts = alerts(
        parts.matches,
        parts.catalog,
        parts.config.effective_scoring_window_days(),
    );
    let dimensions = parts
        .dimensions
        .into_iter()
        .map(|d| (d.dimension_id.id().to_string(), d))
        .collect();

    HealthScoreResult {
        overall,
        label: label.pt().to_string(),
        label_en: label.en().to_string(),
        confidence,
        low_confidence,
        trend,
        trend_delta,
        window: parts.window,
        message_count: parts.message_count,
        dimensions,
        insights,
        alerts,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rapport_core::types::{MatchSource, Sender};

    use super::*;
    use crate::catalog::CatalogLoader;

    fn m(category: PatternCategory) -> PatternMatch {
        PatternMatch {
            message_id: "1".to_string(),
            sender: Sender::A,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            category,
            polarity: category.polarity(),
            source: MatchSource::Rule,
            confidence: 1.0,
            score_impact: 0,
            span: None,
            excerpt: String::new(),
            trigger_id: String::new(),
        }
    }

    #[test]
    fn confidence_is_monotonic_and_capped() {
        let config = ScoringConfig::default();
        let mut last = -1.0;
        for n in [0, 1, 5, 9, 10, 49, 50, 199, 200, 500, 1000, 5000] {
            let (c, _) = confidence(n, &config);
            assert!(c >= last, "confidence dropped at {n}");
            assert!(c <= 0.95);
            last = c;
        }
        assert_eq!(confidence(0, &config), (0.0, true));
        assert!(confidence(9, &config).1);
        assert!(!confidence(10, &config).1);

        let capped = ScoringConfig {
            max_confidence: Some(0.5),
            ..ScoringConfig::default()
        };
        assert_eq!(confidence(1000, &capped).0, 0.5);
    }

    #[test]
    fn trend_formats_signed_delta() {
        assert_eq!(trend(72.0, Some(68.6)), ("+3 vs previous window".to_string(), Some(3.4)));
        assert_eq!(trend(60.0, Some(65.0)).0, "-5 vs previous window");
        assert_eq!(trend(60.0, None), (INSUFFICIENT_TREND.to_string(), None));
    }

    #[test]
    fn contempt_twice_is_critical() {
        let catalog = CatalogLoader::load_default().unwrap();
        let matches = vec![
            m(PatternCategory::Contempt),
            m(PatternCategory::Contempt),
            m(PatternCategory::Repair),
            m(PatternCategory::Repair),
            m(PatternCategory::Repair),
            m(PatternCategory::Repair),
            m(PatternCategory::Repair),
            m(PatternCategory::Repair),
            m(PatternCategory::Repair),
            m(PatternCategory::Repair),
            m(PatternCategory::Repair),
            m(PatternCategory::Repair),
        ];
        let alerts = alerts(&matches, &catalog, 30);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].pattern, "contempt");
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
        assert!(!alerts[0].antidote.is_empty());
    }

    #[test]
    fn horseman_alert_severity_by_frequency() {
        let catalog = CatalogLoader::load_default().unwrap();
        let mut matches = vec![m(PatternCategory::Criticism); 3];
        matches.extend(vec![m(PatternCategory::Stonewalling); 5]);
        matches.extend(vec![m(PatternCategory::Affection); 40]);
        let alerts = alerts(&matches, &catalog, 30);
        let summary: Vec<(&str, AlertSeverity)> =
            alerts.iter().map(|a| (a.pattern.as_str(), a.severity)).collect();
        assert_eq!(
            summary,
            vec![
                ("criticism", AlertSeverity::Medium),
                ("stonewalling", AlertSeverity::High)
            ]
        );
    }

    #[test]
    fn low_ratio_alert_needs_a_negative() {
        let catalog = CatalogLoader::load_default().unwrap();
        assert!(alerts(&[], &catalog, 30).is_empty());
        let alerts = alerts(
            &[m(PatternCategory::Criticism), m(PatternCategory::Affection)],
            &catalog,
            30,
        );
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].pattern, "positivityRatio");
        assert_eq!(alerts[0].severity, AlertSeverity::High);
    }
}
