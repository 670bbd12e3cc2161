//! Participation symmetry: who writes, who starts conversations, who
//! coordinates tasks, and how fast each partner replies.

use rapport_core::config::DetectionConfig;
use rapport_core::types::{BalanceMetrics, Message, MessageKind, PerSender, Split};

use crate::catalog::PatternCatalog;

/// `100 - |share - 50| * 2`, clamped to `[0, 100]`. 50/50 scores 100.
pub fn balance_score(share: f64) -> f64 {
    (100.0 - (share - 50.0).abs() * 2.0).clamp(0.0, 100.0)
}

/// Balance score of a split, from either side (the formula is symmetric).
pub fn split_score(split: Option<Split>) -> Option<f64> {
    split.map(|s| balance_score(s.a))
}

/// Compute balance metrics over the messages of one window.
pub fn compute_balance(
    messages: &[Message],
    catalog: &PatternCatalog,
    config: &DetectionConfig,
) -> BalanceMetrics {
    let gap_seconds = config.effective_initiation_gap_hours() * 3600.0;
    let max_response_minutes = config.effective_max_response_minutes();
    let coordination = catalog.coordination();

    let mut metrics = BalanceMetrics::default();
    let mut response_totals: PerSender<(f64, usize)> = PerSender::default();
    let mut previous: Option<&Message> = None;

    for message in messages.iter().filter(|m| m.kind != MessageKind::System) {
        *metrics.message_counts.get_mut(message.sender) += 1;

        match previous {
            None => *metrics.initiations.get_mut(message.sender) += 1,
            Some(prev) => {
                let gap = (message.timestamp - prev.timestamp).num_seconds() as f64;
                if gap >= gap_seconds {
                    *metrics.initiations.get_mut(message.sender) += 1;
                }
                if prev.sender != message.sender {
                    let minutes = gap / 60.0;
                    if (0.0..=max_response_minutes).contains(&minutes) {
                        let slot = response_totals.get_mut(message.sender);
                        slot.0 += minutes;
                        slot.1 += 1;
                    }
                }
            }
        }
        previous = Some(message);

        if message.has_text() {
            let lowered = message.text.to_lowercase();
            let task = coordination.task_verbs.is_match(&lowered);
            let done = coordination.completion_markers.is_match(&lowered);
            if task {
                metrics.tasks_mentioned += 1;
            }
            if done {
                metrics.tasks_completed += 1;
            }
            if task || done {
                *metrics.task_mentions.get_mut(message.sender) += 1;
            }
        }
    }

    let mean = |(total, n): (f64, usize)| (n > 0).then(|| total / n as f64);
    metrics.mean_response_minutes = PerSender {
        a: mean(response_totals.a),
        b: mean(response_totals.b),
    };

    metrics.message_volume_split = Split::from_counts(
        metrics.message_counts.a as f64,
        metrics.message_counts.b as f64,
    );
    metrics.initiation_split =
        Split::from_counts(metrics.initiations.a as f64, metrics.initiations.b as f64);
    metrics.task_completion_split = Split::from_counts(
        metrics.task_mentions.a as f64,
        metrics.task_mentions.b as f64,
    );
    metrics.response_time_by_sender = match (
        metrics.mean_response_minutes.a,
        metrics.mean_response_minutes.b,
    ) {
        (Some(a), Some(b)) => Split::from_counts(a, b),
        _ => None,
    };
    metrics
}
