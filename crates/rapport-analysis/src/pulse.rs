//! Weekly pulse: overall score per ISO week (Monday start) over the weeks
//! leading up to the window end.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use rapport_core::config::{RapportConfig, MAX_PULSE_WEEKS};
use rapport_core::types::{Message, PatternMatch};

use crate::balance::compute_balance;
use crate::catalog::PatternCatalog;
use crate::detector::MessageDetection;
use crate::scoring::{round1, score_dimensions, weighted_overall, ScoringInput};
use crate::validation::ValidationStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPulse {
    /// ISO week, e.g. `2024-W07`.
    pub week_key: String,
    pub week_start: NaiveDate,
    pub score: f64,
    pub messages: usize,
    pub positive: usize,
    pub negative: usize,
}

/// Score each of the last `pulse_weeks` ISO weeks ending at `end` that has
/// at least `pulse_min_messages` messages. Oldest week first.
///
/// Uses rule matches: the pulse never calls the oracle.
pub fn weekly_pulse(
    messages: &[Message],
    detections: &[MessageDetection],
    end: DateTime<Utc>,
    catalog: &PatternCatalog,
    config: &RapportConfig,
) -> Vec<WeeklyPulse> {
    let weeks = config.scoring.effective_pulse_weeks().min(MAX_PULSE_WEEKS);
    let min_messages = config.scoring.effective_pulse_min_messages().max(1);
    let end_date = end.date_naive();
    let Some(this_monday) = end_date
        .checked_sub_signed(Duration::days(i64::from(end_date.weekday().num_days_from_monday())))
    else {
        return Vec::new();
    };
    let upper = messages.partition_point(|m| m.timestamp <= end);
    let validation = ValidationStatus::default();

    let mut pulse = Vec::new();
    for back in (0..weeks).rev() {
        let Some(week_start) = this_monday.checked_sub_signed(Duration::weeks(i64::from(back)))
        else {
            continue;
        };
        let from = week_start.and_time(NaiveTime::MIN).and_utc();
        let Some(to) = from.checked_add_signed(Duration::weeks(1)) else {
            continue;
        };
        let lo = messages.partition_point(|m| m.timestamp < from);
        let hi = messages.partition_point(|m| m.timestamp < to).min(upper);
        if hi <= lo || hi - lo < min_messages {
            continue;
        }

        let week_messages = &messages[lo..hi];
        let week_detections = &detections[lo..hi];
        let matches: Vec<PatternMatch> = week_detections
            .iter()
            .flat_map(|d| d.matches.iter().cloned())
            .collect();
        let balance = compute_balance(week_messages, catalog, &config.detection);
        let input = ScoringInput {
            messages: week_messages,
            detections: week_detections,
            matches: &matches,
            balance: &balance,
            validation: &validation,
            config,
        };
        let score = round1(weighted_overall(&score_dimensions(&input)));
        let iso = week_start.iso_week();
        pulse.push(WeeklyPulse {
            week_key: format!("{}-W{:02}", iso.year(), iso.week()),
            week_start,
            score,
            messages: week_messages.len(),
            positive: matches.iter().filter(|m| m.is_positive()).count(),
            negative: matches.iter().filter(|m| m.is_negative()).count(),
        });
    }
    pulse
}
